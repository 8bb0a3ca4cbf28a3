//! 64-bit SysTick as the free-running [`Timebase`].
//!
//! The counter is clocked from HCLK and counts down from `u64::MAX`, so
//! elapsed cycles are `u64::MAX - CNT`.

use platform::config::CYCLES_PER_US;
use platform::Timebase;

use super::mmio;

const CTLR: u32 = 0xE000_F000;
const CNT_LO: u32 = 0xE000_F004;
const CNT_HI: u32 = 0xE000_F008;
const CMP_LO: u32 = 0xE000_F00C;
const CMP_HI: u32 = 0xE000_F010;
const CNTFG: u32 = 0xE000_F014;

const CTLR_ENABLE: u32 = 1 << 0;
const CTLR_CLKSOURCE: u32 = 1 << 2;
const CTLR_RELOAD: u32 = 1 << 8;

/// The core SysTick counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysTick;

impl SysTick {
    /// Load the counter with its maximum and start it on HCLK.
    pub fn init() -> Self {
        mmio::write32(CNTFG, 0);
        mmio::write32(CMP_LO, u32::MAX);
        mmio::write32(CMP_HI, u32::MAX);
        mmio::write32(CNT_LO, u32::MAX);
        mmio::write32(CNT_HI, u32::MAX);
        mmio::write32(CTLR, CTLR_RELOAD | CTLR_CLKSOURCE | CTLR_ENABLE);
        Self
    }

    /// Raw counter, read as two halves without tearing.
    fn count() -> u64 {
        loop {
            let hi = mmio::read32(CNT_HI);
            let lo = mmio::read32(CNT_LO);
            if mmio::read32(CNT_HI) == hi {
                return (u64::from(hi) << 32) | u64::from(lo);
            }
        }
    }
}

impl Timebase for SysTick {
    fn now_cycles(&self) -> u64 {
        u64::MAX.wrapping_sub(Self::count())
    }

    fn cycles_per_us(&self) -> u32 {
        CYCLES_PER_US
    }
}
