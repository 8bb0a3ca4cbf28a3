//! Burst status shared between interrupt and main context.
//!
//! The sequencer (interrupt context) is the only writer of the `Active`,
//! `Completed` and `Error` transitions; the main loop only clears. The cell is
//! a single `AtomicU8` so it can live in a `static` and be read without
//! taking the critical section that guards the session.

use core::sync::atomic::{AtomicU8, Ordering};

#[cfg(feature = "async")]
use embassy_futures::yield_now;
#[cfg(feature = "async")]
use embassy_time::{with_timeout, Duration};
use platform::Timebase;

use crate::error::{LinkError, LinkErrors};

const IDLE: u8 = 0;
const ACTIVE: u8 = 1;
const COMPLETED: u8 = 2;
const ERROR: u8 = 0x80;

/// Published state of the burst in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkStatus {
    /// Nothing in flight
    Idle,
    /// A burst is in flight
    Active,
    /// The last burst finished cleanly; its buffers belong to the main loop
    Completed,
    /// The last burst was aborted
    Error(LinkErrors),
}

impl LinkStatus {
    const fn decode(raw: u8) -> Self {
        if raw & ERROR != 0 {
            Self::Error(LinkErrors::from_bits(raw))
        } else {
            match raw {
                ACTIVE => Self::Active,
                COMPLETED => Self::Completed,
                _ => Self::Idle,
            }
        }
    }
}

/// Single-writer atomic holding a [`LinkStatus`].
#[derive(Debug)]
pub struct StatusCell(AtomicU8);

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusCell {
    /// Idle cell, usable in a `static`.
    pub const fn new() -> Self {
        Self(AtomicU8::new(IDLE))
    }

    /// Current status.
    pub fn load(&self) -> LinkStatus {
        LinkStatus::decode(self.0.load(Ordering::Acquire))
    }

    // ── Sequencer side ───────────────────────────────────────────────────────

    /// Idle or Completed → Active.
    pub(crate) fn begin(&self) -> Result<(), LinkError> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| match raw {
                IDLE | COMPLETED => Some(ACTIVE),
                _ => None,
            })
            .map(|_| ())
            .map_err(|raw| {
                if raw & ERROR != 0 {
                    LinkError::ErrorPending
                } else {
                    LinkError::BurstInFlight
                }
            })
    }

    /// Active → Completed. Returns false if the burst was not active.
    pub(crate) fn complete(&self) -> bool {
        self.0
            .compare_exchange(ACTIVE, COMPLETED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Latch `errors`, OR-ing into an error already pending. Supersedes
    /// Completed.
    pub(crate) fn fail(&self, errors: LinkErrors) {
        let bits = errors.bits();
        let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
            if raw & ERROR != 0 {
                Some(raw | bits)
            } else {
                Some(ERROR | bits)
            }
        });
    }

    /// Unconditional return to Idle (configure, reset).
    pub(crate) fn reset(&self) {
        self.0.store(IDLE, Ordering::Release);
    }

    // ── Main loop side ───────────────────────────────────────────────────────

    /// Clear a latched error, returning its kinds.
    pub fn clear_error(&self) -> Option<LinkErrors> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| (raw & ERROR != 0).then_some(IDLE))
            .ok()
            .map(LinkErrors::from_bits)
    }

    /// Non-blocking completion check.
    ///
    /// `None` while a burst is in flight. A Completed status is consumed
    /// (back to Idle), so once observed later calls keep returning `Ok`. A
    /// latched error is reported but left in place for [`clear_error`].
    ///
    /// [`clear_error`]: StatusCell::clear_error
    pub fn poll(&self) -> Option<Result<(), LinkError>> {
        let _ = self
            .0
            .compare_exchange(COMPLETED, IDLE, Ordering::AcqRel, Ordering::Acquire);
        match self.load() {
            LinkStatus::Active => None,
            LinkStatus::Idle | LinkStatus::Completed => Some(Ok(())),
            LinkStatus::Error(e) => Some(Err(LinkError::from_errors(e).unwrap_or(LinkError::ErrorPending))),
        }
    }

    /// Spin until the burst completes or fails.
    pub fn wait_done(&self) -> Result<(), LinkError> {
        loop {
            if let Some(result) = self.poll() {
                return result;
            }
            core::hint::spin_loop();
        }
    }

    /// [`wait_done`] bounded by a cycle budget.
    ///
    /// [`wait_done`]: StatusCell::wait_done
    pub fn wait_done_within<T: Timebase>(&self, timebase: &T, budget_cycles: u64) -> Result<(), LinkError> {
        let start = timebase.now_cycles();
        loop {
            if let Some(result) = self.poll() {
                return result;
            }
            if timebase.elapsed_cycles(start) >= budget_cycles {
                return Err(LinkError::WaitTimeout);
            }
        }
    }

    /// Cooperative wait: yields to the executor between polls.
    #[cfg(feature = "async")]
    pub async fn wait_done_async(&self, timeout: Duration) -> Result<(), LinkError> {
        let wait = async {
            loop {
                if let Some(result) = self.poll() {
                    return result;
                }
                yield_now().await;
            }
        };
        with_timeout(timeout, wait).await.map_err(|_| LinkError::WaitTimeout)?
    }
}
