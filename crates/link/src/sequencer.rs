//! Link interrupt sequencer.
//!
//! Runs in HSPI interrupt context. Each call reads the interrupt flags once,
//! acknowledges exactly the bits it saw, feeds every completed packet through
//! the pure [`LinkState`] machine and carries out the resulting [`Step`] on
//! the address registers. Burst outcomes are published through a
//! [`StatusCell`]; nothing else is shared with the main loop.

use platform::hspi::{INT_FIFO_OV, INT_LINK_MASK, INT_R_DONE, INT_T_DONE, REG_INT_FLAG};
use platform::{HspiPort, LinkBufferPair};

use crate::burst::PacketBurst;
use crate::config::{HspiConfig, OverflowPolicy};
use crate::error::{LinkError, LinkErrors};
use crate::rx::RxEngine;
use crate::state::{LinkState, PacketVerdict, Step};
use crate::status::StatusCell;
use crate::tx::TxEngine;

/// Direction an HSPI side was configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Host: sends bursts
    Transmit,
    /// Device: receives bursts
    Receive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Engine {
    Tx(TxEngine),
    Rx(RxEngine),
}

/// What one interrupt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IrqReport {
    /// Flags observed and acknowledged
    pub flags: u8,
    /// Outcome of the packet-done flag, if one was set
    pub packet: Option<Step>,
    /// A FIFO overflow was counted
    pub overflow: bool,
}

/// Interrupt-side owner of one HSPI direction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LinkSequencer {
    engine: Option<Engine>,
    state: LinkState,
    policy: OverflowPolicy,
    overflows: u32,
    ignored: u32,
}

impl LinkSequencer {
    /// Unconfigured sequencer.
    pub const fn new() -> Self {
        Self {
            engine: None,
            state: LinkState::Idle,
            policy: OverflowPolicy::CountOnly,
            overflows: 0,
            ignored: 0,
        }
    }

    /// Configured direction.
    pub fn direction(&self) -> Option<Direction> {
        self.engine.map(|e| match e {
            Engine::Tx(_) => Direction::Transmit,
            Engine::Rx(_) => Direction::Receive,
        })
    }

    /// Current state.
    pub const fn state(&self) -> LinkState {
        self.state
    }

    /// FIFO overflows counted since the last configure.
    pub const fn overflow_count(&self) -> u32 {
        self.overflows
    }

    /// Packet-done interrupts seen outside an active burst.
    pub const fn ignored_count(&self) -> u32 {
        self.ignored
    }

    /// Buffer pair and burst of the configured direction.
    pub fn layout(&self) -> Option<(LinkBufferPair, PacketBurst)> {
        self.engine.map(|e| match e {
            Engine::Tx(tx) => (tx.pair(), tx.burst()),
            Engine::Rx(rx) => (rx.pair(), rx.burst()),
        })
    }

    // ── Main-loop entry points ───────────────────────────────────────────────

    /// Program `direction` from scratch: full HSPI init, counters zeroed,
    /// status Idle. A receiver is armed immediately (status Active).
    pub fn configure<P: HspiPort>(
        &mut self,
        port: &mut P,
        status: &StatusCell,
        direction: Direction,
        cfg: &HspiConfig,
        pair: LinkBufferPair,
    ) -> Result<(), LinkError> {
        cfg.validate()?;
        let engine = match direction {
            Direction::Transmit => {
                let mut tx = TxEngine::new(pair, cfg.burst)?;
                tx.configure(port, cfg);
                Engine::Tx(tx)
            }
            Direction::Receive => {
                let mut rx = RxEngine::new(pair, cfg.burst)?;
                rx.configure(port, cfg);
                Engine::Rx(rx)
            }
        };
        self.engine = Some(engine);
        self.policy = cfg.overflow;
        self.overflows = 0;
        self.ignored = 0;
        self.state = self.state.on_reset();
        status.reset();
        info!(
            "hspi configured: {} x {} bytes",
            cfg.burst.packets(),
            cfg.burst.packet_len()
        );
        if direction == Direction::Receive {
            self.start(port, status)?;
        }
        Ok(())
    }

    /// Begin a burst: send the first packet (transmit) or arm the receive
    /// pair (receive).
    ///
    /// Refused with `ErrorPending` until the main loop cleared a latched
    /// error, and with `BurstInFlight` while a burst is active.
    pub fn start<P: HspiPort>(&mut self, port: &mut P, status: &StatusCell) -> Result<(), LinkError> {
        let mut engine = self.engine.ok_or(LinkError::NotConfigured)?;
        let from = match self.state {
            LinkState::Error(_) => LinkState::Idle,
            s => s,
        };
        let next = from.on_start()?;
        status.begin()?;
        self.state = next;
        match &mut engine {
            Engine::Tx(tx) => {
                tx.rearm(port);
                tx.trigger(port);
                debug!("tx burst started");
            }
            Engine::Rx(rx) => {
                rx.reinit(port);
                debug!("rx armed");
            }
        }
        self.engine = Some(engine);
        Ok(())
    }

    /// Forget the configured direction.
    pub fn unconfigure(&mut self, status: &StatusCell) {
        self.engine = None;
        self.state = self.state.on_reset();
        status.reset();
    }

    // ── Interrupt entry point ────────────────────────────────────────────────

    /// Handle every pending link flag in one pass.
    pub fn on_interrupt<P: HspiPort>(&mut self, port: &mut P, status: &StatusCell) -> IrqReport {
        let flags = port.read8(REG_INT_FLAG) & INT_LINK_MASK;
        if flags != 0 {
            port.write8(REG_INT_FLAG, flags);
        }
        let mut report = IrqReport {
            flags,
            ..IrqReport::default()
        };
        let Some(mut engine) = self.engine else {
            return report;
        };

        match &mut engine {
            Engine::Tx(tx) if flags & INT_T_DONE != 0 => {
                report.packet = Some(self.on_transmitted(port, status, tx));
            }
            Engine::Rx(rx) if flags & INT_R_DONE != 0 => {
                report.packet = Some(self.on_received(port, status, rx));
            }
            _ => {}
        }
        if flags & INT_FIFO_OV != 0 {
            report.overflow = true;
            self.on_overflow(port, status, &mut engine);
        }
        self.engine = Some(engine);
        report
    }

    fn on_transmitted<P: HspiPort>(&mut self, port: &mut P, status: &StatusCell, tx: &mut TxEngine) -> Step {
        let verdict = match self.state {
            LinkState::Active(p) if tx.hardware_toggle(port) != tx.physical(p.selector.toggled()) => {
                PacketVerdict::Faulty(LinkErrors::SEQ)
            }
            _ => PacketVerdict::Clean,
        };
        let (state, step) = self.state.on_packet(&tx.burst(), verdict);
        self.state = state;
        match step {
            Step::Continue { used, .. } => {
                tx.advance(port, used);
                tx.trigger(port);
            }
            Step::Finished { .. } => {
                tx.rearm(port);
                status.complete();
                info!("tx burst done");
            }
            Step::Aborted(errors) => {
                tx.rearm(port);
                status.fail(errors);
                warn!("tx burst aborted: {}", errors);
            }
            Step::Ignored => self.ignored = self.ignored.saturating_add(1),
        }
        step
    }

    fn on_received<P: HspiPort>(&mut self, port: &mut P, status: &StatusCell, rx: &mut RxEngine) -> Step {
        let mut errors = rx.packet_errors(port);
        if let LinkState::Active(p) = self.state {
            if errors.is_empty() && rx.hardware_toggle(port) != rx.physical(p.selector.toggled()) {
                errors |= LinkErrors::SEQ;
            }
        }
        let verdict = if errors.is_empty() {
            PacketVerdict::Clean
        } else {
            PacketVerdict::Faulty(errors)
        };
        let (state, step) = self.state.on_packet(&rx.burst(), verdict);
        self.state = state;
        match step {
            Step::Continue { used, .. } => rx.advance(port, used),
            Step::Finished { .. } => {
                rx.reinit(port);
                status.complete();
                info!("rx burst done");
            }
            Step::Aborted(errors) => {
                rx.reinit(port);
                status.fail(errors);
                warn!("rx burst aborted: {}", errors);
            }
            Step::Ignored => self.ignored = self.ignored.saturating_add(1),
        }
        step
    }

    fn on_overflow<P: HspiPort>(&mut self, port: &mut P, status: &StatusCell, engine: &mut Engine) {
        self.overflows = self.overflows.saturating_add(1);
        if self.policy == OverflowPolicy::CountOnly {
            warn!("fifo overflow #{}", self.overflows);
            return;
        }
        let (state, step) = self.state.on_fault(LinkErrors::FIFO);
        self.state = state;
        if let Step::Aborted(errors) = step {
            match engine {
                Engine::Tx(tx) => tx.rearm(port),
                Engine::Rx(rx) => rx.reinit(port),
            }
            status.fail(errors);
            warn!("burst aborted on fifo overflow");
        } else if let LinkState::Error(errors) = self.state {
            status.fail(errors);
        }
    }
}
