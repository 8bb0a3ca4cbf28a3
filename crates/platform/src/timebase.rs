//! Free-running cycle counter and busy-wait delay
//!
//! There is no scheduler on the target, so every bounded wait in the link
//! transport is expressed as a cycle budget against a [`Timebase`].

use embedded_hal::delay::DelayNs;

/// A monotonic, free-running cycle counter.
pub trait Timebase {
    /// Current counter value in cycles.
    fn now_cycles(&self) -> u64;

    /// Counter rate in cycles per microsecond.
    fn cycles_per_us(&self) -> u32;

    /// Cycles elapsed since `since`.
    fn elapsed_cycles(&self, since: u64) -> u64 {
        self.now_cycles().wrapping_sub(since)
    }

    /// Microseconds elapsed since `since`.
    #[allow(clippy::arithmetic_side_effects)] // divisor clamped to >= 1
    fn elapsed_us(&self, since: u64) -> u64 {
        self.elapsed_cycles(since) / u64::from(self.cycles_per_us().max(1))
    }
}

impl<T: Timebase + ?Sized> Timebase for &T {
    fn now_cycles(&self) -> u64 {
        (**self).now_cycles()
    }

    fn cycles_per_us(&self) -> u32 {
        (**self).cycles_per_us()
    }
}

/// Busy-wait delay driven by a [`Timebase`].
pub struct BusyDelay<T> {
    timebase: T,
}

impl<T: Timebase> BusyDelay<T> {
    /// Wrap a timebase.
    pub const fn new(timebase: T) -> Self {
        Self { timebase }
    }

    /// Spin until `cycles` have elapsed.
    pub fn spin_cycles(&self, cycles: u64) {
        let start = self.timebase.now_cycles();
        while self.timebase.elapsed_cycles(start) < cycles {
            core::hint::spin_loop();
        }
    }
}

impl<T: Timebase> DelayNs for BusyDelay<T> {
    fn delay_ns(&mut self, ns: u32) {
        let cycles = u64::from(ns)
            .saturating_mul(u64::from(self.timebase.cycles_per_us()))
            .div_ceil(1000);
        self.spin_cycles(cycles);
    }

    fn delay_us(&mut self, us: u32) {
        self.spin_cycles(u64::from(us).saturating_mul(u64::from(self.timebase.cycles_per_us())));
    }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use crate::mocks::ManualTimebase;

    #[test]
    fn delay_us_consumes_requested_cycles() {
        let tb = ManualTimebase::ticking(120, 7);
        let mut delay = BusyDelay::new(&tb);
        delay.delay_us(100);
        assert!(tb.now_cycles() >= 100 * 120);
        assert!(tb.now_cycles() < 100 * 120 + 2 * 7);
    }

    #[test]
    fn elapsed_us_divides_by_rate() {
        let tb = ManualTimebase::new(120);
        tb.advance(1_200);
        assert_eq!(tb.elapsed_us(0), 10);
    }
}
