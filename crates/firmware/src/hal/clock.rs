//! System clock and chip identification.

use platform::serdes::{SAFE_ACCESS_SIG, SAFE_ACCESS_SIG1, SAFE_ACCESS_SIG2};

use super::mmio;

const CHIP_ID: u32 = 0x4000_1001;
const CLK_PLL_DIV: u32 = 0x4000_1008;
const CLK_CFG_CTRL: u32 = 0x4000_100A;

const PLL_DIV_KEY: u8 = 0x40;
/// 480 MHz PLL / 4.
const PLL_DIV_120MHZ: u8 = 0x04;
const CFG_CTRL_KEY: u8 = 0x80;
const CFG_CTRL_SEL_PLL: u8 = 0x02;

/// Open the safe-access window for protected registers.
pub(crate) fn unlock_safe_access() {
    mmio::write8(SAFE_ACCESS_SIG, SAFE_ACCESS_SIG1);
    mmio::write8(SAFE_ACCESS_SIG, SAFE_ACCESS_SIG2);
}

/// Switch the system clock to the PLL at 120 MHz.
pub fn init_clock_120mhz() {
    unlock_safe_access();
    mmio::write8(CLK_PLL_DIV, PLL_DIV_KEY | PLL_DIV_120MHZ);
    mmio::write8(CLK_CFG_CTRL, CFG_CTRL_KEY | CFG_CTRL_SEL_PLL);
    mmio::write8(SAFE_ACCESS_SIG, 0);
}

/// Chip identifier (0x69 for CH569).
pub fn chip_id() -> u8 {
    mmio::read8(CHIP_ID)
}
