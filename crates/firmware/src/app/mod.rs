//! Demo application steps
//!
//! Each step is one iteration of a main-loop branch (host burst, device
//! receive, SerDes transmit, SerDes report). Steps never own the link
//! session: they reach it through [`Shared`], which on hardware is the
//! interrupt-shared mutex and in tests is a simulation harness.

pub mod hspi;
pub mod serdes;

use link::{LinkError, StatusCell};
use platform::{BusFault, Timebase};

/// Upper bound for one main-loop wait on the link, in microseconds.
pub const LINK_WAIT_BUDGET_US: u64 = 1_000_000;

/// Error of an application step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppError {
    /// Link transport error
    Link(LinkError),
    /// RAMX access outside the mapped window
    Bus(BusFault),
}

impl From<LinkError> for AppError {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

impl From<BusFault> for AppError {
    fn from(e: BusFault) -> Self {
        Self::Bus(e)
    }
}

impl core::fmt::Display for AppError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Bus(e) => write!(f, "memory: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AppError {}

/// A link session shared with its interrupt handler.
pub trait Shared {
    /// Session type behind the lock.
    type Session;

    /// Run `f` on the session with its interrupt held off.
    ///
    /// `None` if the session was not installed yet.
    fn lock<R, F: FnOnce(&mut Self::Session) -> R>(&self, f: F) -> Option<R>;

    /// Called between polls while the main loop waits on the interrupt.
    fn idle(&self) {
        core::hint::spin_loop();
    }
}

/// [`Shared::lock`], with a missing session reported as `NotConfigured`.
pub(crate) fn with_session<S, R, F>(shared: &S, f: F) -> Result<R, LinkError>
where
    S: Shared,
    F: FnOnce(&mut S::Session) -> R,
{
    shared.lock(f).ok_or(LinkError::NotConfigured)
}

/// Wait until `status` reports the end of the burst, idling through
/// `shared` between polls. Gives up after [`LINK_WAIT_BUDGET_US`].
pub fn wait_link<S, T>(shared: &S, status: &StatusCell, timebase: &T) -> Result<(), LinkError>
where
    S: Shared,
    T: Timebase,
{
    let budget = LINK_WAIT_BUDGET_US.saturating_mul(u64::from(timebase.cycles_per_us()));
    let start = timebase.now_cycles();
    loop {
        if let Some(result) = status.poll() {
            return result;
        }
        if timebase.elapsed_cycles(start) >= budget {
            return Err(LinkError::WaitTimeout);
        }
        shared.idle();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};
    use platform::mocks::ManualTimebase;

    struct Slot {
        value: RefCell<Option<u32>>,
        idles: Cell<u32>,
    }

    impl Shared for Slot {
        type Session = u32;

        fn lock<R, F: FnOnce(&mut u32) -> R>(&self, f: F) -> Option<R> {
            self.value.borrow_mut().as_mut().map(f)
        }

        fn idle(&self) {
            self.idles.set(self.idles.get() + 1);
        }
    }

    #[test]
    fn missing_session_is_not_configured() {
        let slot = Slot {
            value: RefCell::new(None),
            idles: Cell::new(0),
        };
        assert_eq!(with_session(&slot, |v| *v), Err(LinkError::NotConfigured));
    }

    #[test]
    fn idle_status_returns_without_idling() {
        let slot = Slot {
            value: RefCell::new(Some(1)),
            idles: Cell::new(0),
        };
        let status = StatusCell::new();
        // Idle status reads as done.
        assert_eq!(wait_link(&slot, &status, &ManualTimebase::new(120)), Ok(()));
        assert_eq!(slot.idles.get(), 0);
    }

    #[test]
    fn app_error_wraps_both_sources() {
        assert_eq!(AppError::from(LinkError::Crc), AppError::Link(LinkError::Crc));
        let fault = BusFault { addr: 4, len: 4 };
        assert_eq!(AppError::from(fault), AppError::Bus(fault));
    }
}
