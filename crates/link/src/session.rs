//! HSPI link session: port, sequencer and status in one object.
//!
//! On hardware the session lives in a blocking mutex shared with
//! the HSPI interrupt handler, while the [`StatusCell`] it publishes to is a
//! plain `static` the main loop can wait on without locking.

#[cfg(feature = "async")]
use embassy_time::Duration;
use platform::{HspiPort, LinkBufferPair, Timebase};

use crate::burst::PacketBurst;
use crate::config::HspiConfig;
use crate::error::{LinkError, LinkErrors};
use crate::sequencer::{Direction, IrqReport, LinkSequencer};
use crate::state::LinkState;
use crate::status::{LinkStatus, StatusCell};

/// One board's side of the HSPI link.
pub struct HspiLink<'a, P: HspiPort> {
    port: P,
    seq: LinkSequencer,
    status: &'a StatusCell,
    config: HspiConfig,
    last: Option<(Direction, LinkBufferPair)>,
}

impl<'a, P: HspiPort> HspiLink<'a, P> {
    /// Unconfigured session publishing to `status`.
    pub fn new(port: P, status: &'a StatusCell, config: HspiConfig) -> Self {
        Self {
            port,
            seq: LinkSequencer::new(),
            status,
            config,
            last: None,
        }
    }

    fn configure(&mut self, direction: Direction, pair: LinkBufferPair, burst: PacketBurst) -> Result<(), LinkError> {
        let cfg = self.config.with_burst(burst);
        self.seq
            .configure(&mut self.port, self.status, direction, &cfg, pair)?;
        self.config = cfg;
        self.last = Some((direction, pair));
        Ok(())
    }

    /// Host side: register `pair` and `burst` with the hardware.
    ///
    /// Resets the hardware toggle and sequence counters and the status.
    pub fn configure_transmit(&mut self, pair: LinkBufferPair, burst: PacketBurst) -> Result<(), LinkError> {
        self.configure(Direction::Transmit, pair, burst)
    }

    /// Send one burst. Non-blocking: only the first packet is triggered here,
    /// the interrupt handler sends the rest.
    pub fn send(&mut self) -> Result<(), LinkError> {
        if self.seq.direction() != Some(Direction::Transmit) {
            return Err(LinkError::NotConfigured);
        }
        self.seq.start(&mut self.port, self.status)
    }

    /// Device side: register `pair` and `burst` and start receiving.
    pub fn configure_receive(&mut self, pair: LinkBufferPair, burst: PacketBurst) -> Result<(), LinkError> {
        self.configure(Direction::Receive, pair, burst)
    }

    /// Re-arm reception at the burst start after a completed or failed burst.
    ///
    /// A latched error must be cleared first (`ErrorPending` otherwise).
    pub fn reinit_receive(&mut self) -> Result<(), LinkError> {
        if self.seq.direction() != Some(Direction::Receive) {
            return Err(LinkError::NotConfigured);
        }
        self.seq.start(&mut self.port, self.status)
    }

    /// Full reinit: interface disabled, status cleared, last configuration
    /// programmed again. Cancels any burst in flight.
    ///
    /// The packet sequence counter keeps running, so only one board needs
    /// to reset while its peer stays configured.
    pub fn reset(&mut self) -> Result<(), LinkError> {
        self.seq.unconfigure(self.status);
        warn!("hspi link reset");
        match self.last {
            Some((direction, pair)) => self.configure(direction, pair, self.config.burst),
            None => Ok(()),
        }
    }

    /// Interrupt handler body.
    pub fn on_interrupt(&mut self) -> IrqReport {
        self.seq.on_interrupt(&mut self.port, self.status)
    }

    // ── Completion ───────────────────────────────────────────────────────────

    /// Published status.
    pub fn status(&self) -> LinkStatus {
        self.status.load()
    }

    /// See [`StatusCell::poll`].
    pub fn poll(&self) -> Option<Result<(), LinkError>> {
        self.status.poll()
    }

    /// See [`StatusCell::wait_done`]. Only usable when the interrupt can
    /// preempt the caller.
    pub fn wait_done(&self) -> Result<(), LinkError> {
        self.status.wait_done()
    }

    /// See [`StatusCell::wait_done_within`].
    pub fn wait_done_within<T: Timebase>(&self, timebase: &T, budget_cycles: u64) -> Result<(), LinkError> {
        self.status.wait_done_within(timebase, budget_cycles)
    }

    /// See [`StatusCell::wait_done_async`].
    #[cfg(feature = "async")]
    pub async fn wait_done_async(&self, timeout: Duration) -> Result<(), LinkError> {
        self.status.wait_done_async(timeout).await
    }

    /// Clear a latched error; see [`StatusCell::clear_error`].
    pub fn clear_error(&self) -> Option<LinkErrors> {
        self.status.clear_error()
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    /// Sequencer state.
    pub fn state(&self) -> LinkState {
        self.seq.state()
    }

    /// Active configuration.
    pub fn config(&self) -> &HspiConfig {
        &self.config
    }

    /// FIFO overflows counted since the last configure.
    pub fn overflow_count(&self) -> u32 {
        self.seq.overflow_count()
    }

    /// Packets seen outside an active burst since the last configure.
    pub fn ignored_count(&self) -> u32 {
        self.seq.ignored_count()
    }

    /// Underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Underlying port, mutably.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }
}
