//! UART1 transmit-only console (PA8 TX) for the diagnostic log.

use core::fmt;

use super::{gpio, mmio};

const UART1_BASE: u32 = 0x4000_3400;
const IER: u32 = UART1_BASE.wrapping_add(0x01);
const FCR: u32 = UART1_BASE.wrapping_add(0x02);
const LCR: u32 = UART1_BASE.wrapping_add(0x03);
const LSR: u32 = UART1_BASE.wrapping_add(0x05);
const THR: u32 = UART1_BASE.wrapping_add(0x08);
const TFC: u32 = UART1_BASE.wrapping_add(0x0B);
const DL: u32 = UART1_BASE.wrapping_add(0x0C);
const DIV: u32 = UART1_BASE.wrapping_add(0x0E);

/// FIFO 8-byte trigger, TX and RX FIFO reset, FIFO enable.
const FCR_INIT: u8 = 0xC0 | 0x04 | 0x02 | 0x01;
/// 8 data bits, no parity, one stop bit.
const LCR_8N1: u8 = 0x03;
const IER_TXD_EN: u8 = 0x40;
const LSR_TX_ALL_EMP: u8 = 0x40;

const FIFO_SIZE: u8 = 8;

/// UART1 console.
#[derive(Debug, Clone, Copy)]
pub struct Uart1;

impl Uart1 {
    /// Configure pins, baud rate and framing.
    pub fn init(baud: u32, freq_sys: u32) -> Self {
        let x = u64::from(freq_sys)
            .saturating_mul(20)
            .checked_div(16u64.saturating_mul(u64::from(baud)))
            .unwrap_or(0);
        let divisor = x.saturating_add(5) / 10;

        gpio::uart1_pins();
        mmio::write8(DIV, 1);
        mmio::write16(DL, u16::try_from(divisor).unwrap_or(u16::MAX));
        mmio::write8(FCR, FCR_INIT);
        mmio::write8(LCR, LCR_8N1);
        mmio::write8(IER, IER_TXD_EN);
        Self
    }

    fn put(byte: u8) {
        while mmio::read8(TFC) >= FIFO_SIZE {
            core::hint::spin_loop();
        }
        mmio::write8(THR, byte);
    }

    /// Wait until the shift register is empty.
    pub fn flush(&self) {
        while mmio::read8(LSR) & LSR_TX_ALL_EMP == 0 {
            core::hint::spin_loop();
        }
    }
}

impl fmt::Write for Uart1 {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        s.bytes().for_each(Self::put);
        Ok(())
    }
}
