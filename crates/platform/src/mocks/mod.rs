//! Mock implementations for testing
//!
//! This module provides host implementations of the platform collaborators
//! (pins, timebase, bus memory) plus wire-level simulations of the HSPI and
//! SerDes peripherals, for use in unit and integration tests.

#![cfg(any(test, feature = "std"))]
#![allow(clippy::arithmetic_side_effects)] // simulation bookkeeping
#![allow(clippy::indexing_slicing)] // bounds checked by BusMemory before slicing

mod hspi;
mod serdes;

pub use hspi::{SimFrame, SimHspi, SimWire};
pub use serdes::{SimSerdes, SimSerdesWire};

use crate::dma::{BusFault, BusMemory};
use crate::dma_safety::{RAMX_BASE, RAMX_SIZE_BYTES};
use crate::gpio::{FlexPin, PinMode};
use crate::timebase::Timebase;

use core::cell::Cell;
use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::vec::Vec;

// ── Pins ─────────────────────────────────────────────────────────────────────

/// Error raised by a [`MockPin`] configured to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPinError;

impl embedded_hal::digital::Error for MockPinError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Mock GPIO attached to a shared line.
///
/// Two pins created with [`MockPin::wired_pair`] see each other's output,
/// which is how two boards are connected back-to-back in tests. A line that
/// nobody drives reads low (pull-down).
pub struct MockPin {
    line: Arc<AtomicBool>,
    mode: PinMode,
    history: Vec<PinMode>,
    reads: u32,
    high_after: Option<u32>,
    fail_reads: bool,
}

impl MockPin {
    fn on_line(line: Arc<AtomicBool>) -> Self {
        Self {
            line,
            mode: PinMode::FloatingInput,
            history: Vec::new(),
            reads: 0,
            high_after: None,
            fail_reads: false,
        }
    }

    /// Unconnected pin; reads low unless it drives itself.
    pub fn new() -> Self {
        Self::on_line(Arc::new(AtomicBool::new(false)))
    }

    /// Two pins sharing one line.
    pub fn wired_pair() -> (Self, Self) {
        let line = Arc::new(AtomicBool::new(false));
        (Self::on_line(line.clone()), Self::on_line(line))
    }

    /// Role strap with the pull-up fitted: a jumper pulls the line low.
    pub fn strap(jumper_fitted: bool) -> Self {
        let pin = Self::new();
        pin.line.store(!jumper_fitted, Ordering::SeqCst);
        pin
    }

    /// Pin whose reads fail (floating strap, broken trace).
    pub fn unreadable() -> Self {
        Self {
            fail_reads: true,
            ..Self::new()
        }
    }

    /// Simulated peer that raises the line on read number `polls`.
    #[must_use]
    pub fn with_peer_ready_after(mut self, polls: u32) -> Self {
        self.high_after = Some(polls);
        self
    }

    /// Current electrical mode.
    pub fn mode(&self) -> PinMode {
        self.mode
    }

    /// Every mode applied, oldest first.
    pub fn history(&self) -> &[PinMode] {
        &self.history
    }

    /// Number of reads performed.
    pub fn reads(&self) -> u32 {
        self.reads
    }

    /// Raw line level.
    pub fn line_level(&self) -> bool {
        self.line.load(Ordering::SeqCst)
    }
}

impl Default for MockPin {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorType for MockPin {
    type Error = MockPinError;
}

impl InputPin for MockPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if self.fail_reads {
            return Err(MockPinError);
        }
        self.reads = self.reads.saturating_add(1);
        if self.high_after.is_some_and(|n| self.reads >= n) {
            self.line.store(true, Ordering::SeqCst);
        }
        Ok(self.line.load(Ordering::SeqCst))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|v| !v)
    }
}

impl OutputPin for MockPin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.mode.is_output() {
            self.line.store(true, Ordering::SeqCst);
        }
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.mode.is_output() {
            self.line.store(false, Ordering::SeqCst);
        }
        Ok(())
    }
}

impl FlexPin for MockPin {
    fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error> {
        // Leaving output mode releases the line.
        if self.mode.is_output() && !mode.is_output() {
            self.line.store(false, Ordering::SeqCst);
        }
        self.mode = mode;
        self.history.push(mode);
        Ok(())
    }
}

// ── Timebase ─────────────────────────────────────────────────────────────────

/// Manually driven cycle counter.
///
/// With a non-zero step every [`Timebase::now_cycles`] call advances the
/// counter, so busy loops under test make progress.
pub struct ManualTimebase {
    now: Cell<u64>,
    step: u64,
    cycles_per_us: u32,
}

impl ManualTimebase {
    /// Frozen counter at zero.
    pub fn new(cycles_per_us: u32) -> Self {
        Self::ticking(cycles_per_us, 0)
    }

    /// Counter that advances by `step` cycles on each read.
    pub fn ticking(cycles_per_us: u32, step: u64) -> Self {
        Self {
            now: Cell::new(0),
            step,
            cycles_per_us,
        }
    }

    /// Advance the counter.
    pub fn advance(&self, cycles: u64) {
        self.now.set(self.now.get().wrapping_add(cycles));
    }

    /// Counter value without advancing it.
    pub fn peek(&self) -> u64 {
        self.now.get()
    }
}

impl Timebase for ManualTimebase {
    fn now_cycles(&self) -> u64 {
        let v = self.now.get();
        self.now.set(v.wrapping_add(self.step));
        v
    }

    fn cycles_per_us(&self) -> u32 {
        self.cycles_per_us
    }
}

// ── Bus memory ───────────────────────────────────────────────────────────────

/// Host-backed memory window at a fixed bus address.
pub struct SimMemory {
    base: u32,
    bytes: Vec<u8>,
}

impl SimMemory {
    /// Zeroed window of `size` bytes at `base`.
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            bytes: std::vec![0; size],
        }
    }

    /// Zeroed window covering the whole of RAMX.
    pub fn ramx() -> Self {
        Self::new(RAMX_BASE, RAMX_SIZE_BYTES as usize)
    }

    /// First mapped address.
    pub fn base(&self) -> u32 {
        self.base
    }

    /// Raw contents.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn range(&self, addr: u32, len: usize) -> Result<core::ops::Range<usize>, BusFault> {
        let fault = BusFault { addr, len };
        let start = addr.checked_sub(self.base).ok_or(fault)? as usize;
        let end = start.checked_add(len).ok_or(fault)?;
        if end > self.bytes.len() {
            return Err(fault);
        }
        Ok(start..end)
    }
}

impl BusMemory for SimMemory {
    fn read(&self, addr: u32, out: &mut [u8]) -> Result<(), BusFault> {
        let range = self.range(addr, out.len())?;
        out.copy_from_slice(&self.bytes[range]);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), BusFault> {
        let range = self.range(addr, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wired_pins_see_each_other() {
        let (mut a, mut b) = MockPin::wired_pair();
        a.set_mode(PinMode::PushPullOutput).unwrap();
        b.set_mode(PinMode::PullDownInput).unwrap();
        assert!(!b.is_high().unwrap());
        a.set_high().unwrap();
        assert!(b.is_high().unwrap());
        a.set_mode(PinMode::FloatingInput).unwrap();
        assert!(!b.is_high().unwrap());
    }

    #[test]
    fn input_pin_cannot_drive() {
        let mut pin = MockPin::new();
        pin.set_mode(PinMode::PullDownInput).unwrap();
        pin.set_high().unwrap();
        assert!(!pin.line_level());
    }

    #[test]
    fn strap_reads_low_with_jumper() {
        assert!(MockPin::strap(true).is_low().unwrap());
        assert!(MockPin::strap(false).is_high().unwrap());
        assert!(MockPin::unreadable().is_high().is_err());
    }

    #[test]
    fn peer_ready_after_n_polls() {
        let mut pin = MockPin::new().with_peer_ready_after(3);
        assert!(!pin.is_high().unwrap());
        assert!(!pin.is_high().unwrap());
        assert!(pin.is_high().unwrap());
    }

    #[test]
    fn ticking_timebase_advances_per_read() {
        let tb = ManualTimebase::ticking(120, 10);
        assert_eq!(tb.now_cycles(), 0);
        assert_eq!(tb.now_cycles(), 10);
        assert_eq!(tb.peek(), 20);
    }

    #[test]
    fn sim_memory_rejects_out_of_window() {
        let mut mem = SimMemory::new(0x2002_0000, 16);
        assert!(mem.write_u32(0x2002_000C, 7).is_ok());
        assert_eq!(mem.read_u32(0x2002_000C).unwrap(), 7);
        assert!(mem.write_u32(0x2002_000E, 7).is_err());
        assert!(mem.read_u32(0x2001_FFFC).is_err());
    }
}
