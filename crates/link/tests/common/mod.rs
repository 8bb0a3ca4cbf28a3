//! Two simulated boards wired back-to-back, plus the loop that plays the
//! role of both interrupt controllers.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::cast_possible_truncation)]

use link::{HspiConfig, HspiLink, PacketBurst, StatusCell};
use platform::dma_safety::RAMX_BASE;
use platform::mocks::SimHspi;
use platform::{BusMemory, LinkBufferPair};

/// Transmit window on the host board.
pub const TX_BASE: u32 = RAMX_BASE;
/// Receive window on the device board.
pub const RX_BASE: u32 = RAMX_BASE + 0x8000;

pub struct Boards<'a> {
    pub host: HspiLink<'a, SimHspi>,
    pub dev: HspiLink<'a, SimHspi>,
}

impl<'a> Boards<'a> {
    /// Host configured for transmit and device armed for receive, both with
    /// an interleaved pair over their window.
    pub fn linked(host_status: &'a StatusCell, dev_status: &'a StatusCell, cfg: HspiConfig) -> Self {
        let (h, d) = SimHspi::pair();
        let mut host = HspiLink::new(h, host_status, cfg);
        let mut dev = HspiLink::new(d, dev_status, cfg);
        let len = cfg.burst.packet_len();
        host.configure_transmit(LinkBufferPair::interleaved(TX_BASE, len), cfg.burst)
            .unwrap();
        dev.configure_receive(LinkBufferPair::interleaved(RX_BASE, len), cfg.burst)
            .unwrap();
        Self { host, dev }
    }

    /// Fill the host window with `pattern(i)` for byte `i` of the burst.
    pub fn load(&self, burst: PacketBurst, pattern: impl Fn(usize) -> u8) {
        let bytes: Vec<u8> = (0..burst.total_bytes() as usize).map(pattern).collect();
        self.host
            .port()
            .memory()
            .borrow_mut()
            .write(TX_BASE, &bytes)
            .unwrap();
    }

    /// What the device has in its receive window.
    pub fn received(&self, burst: PacketBurst) -> Vec<u8> {
        let mut out = vec![0; burst.total_bytes() as usize];
        self.dev.port().memory().borrow().read(RX_BASE, &mut out).unwrap();
        out
    }

    /// Service interrupts on both boards and move packets across the wire
    /// until nothing is left to do. Fails on any DMA access outside RAMX.
    pub fn run(&mut self) {
        while self.step() {}
        let wire = self.host.port().wire();
        let faults = wire.borrow();
        assert!(faults.bus_faults().is_empty(), "DMA bus faults: {:?}", faults.bus_faults());
    }

    /// One round: drain host interrupts, deliver one packet and service the
    /// device interrupt. False when neither side had work.
    pub fn step(&mut self) -> bool {
        let mut progressed = false;
        while self.host.port().irq_pending() {
            self.host.on_interrupt();
            progressed = true;
        }
        if self.dev.port().pump() {
            progressed = true;
            while self.dev.port().irq_pending() {
                self.dev.on_interrupt();
            }
        }
        progressed
    }
}

/// Byte pattern that differs between neighbouring packets.
pub fn ramp(i: usize) -> u8 {
    (i % 251) as u8
}
