//! Simulation harnesses standing in for the interrupt-shared link sessions.
//!
//! The demo steps only see a [`Shared`] session. Here `lock` borrows a
//! `RefCell`, and `idle` plays the interrupt controller: it moves packets
//! across the simulated wire and services whichever side raised a flag.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use firmware::{DiagLog, Shared};
use link::{HspiConfig, HspiLink, SerdesConfig, SerdesLink, StatusCell};
use platform::config::CYCLES_PER_US;
use platform::mocks::{ManualTimebase, SimHspi, SimMemory, SimSerdes};
use platform::{BusFault, BusMemory, BusyDelay};

/// Log whose lines land in a `String`; every clock read moves time 10 us.
pub type TestLog = DiagLog<String, ManualTimebase>;

pub fn test_log() -> TestLog {
    DiagLog::new(String::new(), ManualTimebase::ticking(CYCLES_PER_US, 10 * u64::from(CYCLES_PER_US)))
}

/// One board's RAMX, borrowed per access so the simulated DMA can reach it
/// between two CPU accesses.
pub struct Ram(pub Rc<RefCell<SimMemory>>);

impl BusMemory for Ram {
    fn read(&self, addr: u32, out: &mut [u8]) -> Result<(), BusFault> {
        self.0.borrow().read(addr, out)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), BusFault> {
        self.0.borrow_mut().write(addr, data)
    }
}

// ── HSPI ─────────────────────────────────────────────────────────────────────

/// Two HSPI boards wired back-to-back.
pub struct HspiBench<'a> {
    host: RefCell<HspiLink<'a, SimHspi>>,
    dev: RefCell<HspiLink<'a, SimHspi>>,
    host_port: SimHspi,
    dev_port: SimHspi,
    /// Interrupts held off on both boards while set.
    pub stalled: Cell<bool>,
}

impl<'a> HspiBench<'a> {
    pub fn new(host_status: &'a StatusCell, dev_status: &'a StatusCell) -> Self {
        let (h, d) = SimHspi::pair();
        Self {
            host: RefCell::new(HspiLink::new(h.clone(), host_status, HspiConfig::default())),
            dev: RefCell::new(HspiLink::new(d.clone(), dev_status, HspiConfig::default())),
            host_port: h,
            dev_port: d,
            stalled: Cell::new(false),
        }
    }

    pub fn host(&self) -> Side<'_, 'a> {
        Side { bench: self, host: true }
    }

    pub fn dev(&self) -> Side<'_, 'a> {
        Side { bench: self, host: false }
    }

    pub fn host_ram(&self) -> Ram {
        Ram(self.host_port.memory())
    }

    pub fn dev_ram(&self) -> Ram {
        Ram(self.dev_port.memory())
    }

    pub fn host_port(&self) -> &SimHspi {
        &self.host_port
    }

    /// Service interrupts and deliver packets until the wire is quiet.
    pub fn run(&self) {
        if self.stalled.get() {
            return;
        }
        loop {
            while self.host_port.irq_pending() {
                self.host.borrow_mut().on_interrupt();
            }
            if !self.dev_port.pump() {
                break;
            }
            while self.dev_port.irq_pending() {
                self.dev.borrow_mut().on_interrupt();
            }
        }
        let wire = self.host_port.wire();
        let faults = wire.borrow();
        assert!(faults.bus_faults().is_empty(), "DMA bus faults: {:?}", faults.bus_faults());
    }
}

/// One board's view of an [`HspiBench`].
pub struct Side<'b, 'a> {
    bench: &'b HspiBench<'a>,
    host: bool,
}

impl<'a> Shared for Side<'_, 'a> {
    type Session = HspiLink<'a, SimHspi>;

    fn lock<R, F: FnOnce(&mut Self::Session) -> R>(&self, f: F) -> Option<R> {
        let cell = if self.host { &self.bench.host } else { &self.bench.dev };
        let mut link = cell.try_borrow_mut().ok()?;
        Some(f(&mut link))
    }

    fn idle(&self) {
        self.bench.run();
    }
}

// ── SerDes ───────────────────────────────────────────────────────────────────

pub type TestSerdes = SerdesLink<SimSerdes, BusyDelay<ManualTimebase>>;

pub fn serdes_delay() -> BusyDelay<ManualTimebase> {
    BusyDelay::new(ManualTimebase::ticking(CYCLES_PER_US, 30))
}

/// Transmitter and receiver sessions, both powered down, the receiver
/// behind its interrupt harness.
pub fn serdes_pair() -> (TestSerdes, SerdesReceiver) {
    let (a, b) = SimSerdes::pair();
    let rx_port = b.clone();
    let tx = SerdesLink::new(a, serdes_delay(), SerdesConfig::default());
    let rx = SerdesLink::new(b, serdes_delay(), SerdesConfig::default());
    let harness = SerdesReceiver {
        link: RefCell::new(rx),
        rx_port,
        timebase: ManualTimebase::ticking(CYCLES_PER_US, 1_000),
    };
    (tx, harness)
}

/// SerDes receiver whose idle delivers every queued packet.
pub struct SerdesReceiver {
    link: RefCell<TestSerdes>,
    rx_port: SimSerdes,
    timebase: ManualTimebase,
}

impl SerdesReceiver {
    pub fn ram(&self) -> Ram {
        Ram(self.rx_port.memory())
    }

    pub fn analog_configured(&self) -> bool {
        self.rx_port.analog_configured()
    }
}

impl Shared for SerdesReceiver {
    type Session = TestSerdes;

    fn lock<R, F: FnOnce(&mut TestSerdes) -> R>(&self, f: F) -> Option<R> {
        let mut link = self.link.try_borrow_mut().ok()?;
        Some(f(&mut link))
    }

    fn idle(&self) {
        while self.rx_port.pump() {
            while self.rx_port.irq_pending() {
                self.link.borrow_mut().on_interrupt(&self.timebase);
            }
        }
        let wire = self.rx_port.wire();
        let faults = wire.borrow();
        assert!(faults.bus_faults().is_empty(), "DMA bus faults: {:?}", faults.bus_faults());
    }
}
