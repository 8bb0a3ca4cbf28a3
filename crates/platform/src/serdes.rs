//! CH569 SerDes register map.
//!
//! All SerDes registers are 32-bit. The interrupt enable and status
//! registers share one bit layout; status additionally carries the
//! read-only link state bits (`STATUS_SEQ_MATCH` and above).

/// Peripheral base address.
pub const SERDES_BASE: u32 = 0x4000_B000;

/// PFIC interrupt number of the SerDes.
pub const SERDES_IRQ: u8 = 33;

// ── Register offsets ─────────────────────────────────────────────────────────

/// Power, PLL, enables and resets.
pub const REG_CTRL: u8 = 0x00;
/// Interrupt enable.
pub const REG_INT_EN: u8 = 0x04;
/// Interrupt flags (write 1 to clear) and link state.
pub const REG_STATUS: u8 = 0x08;
/// Transmit length / start / link init / buffer mode.
pub const REG_RTX_CTRL: u8 = 0x0C;
/// Length received into buffer 0.
pub const REG_RX_LEN0: u8 = 0x10;
/// Custom number word 0 (TX: sent, RX: received into buffer 0).
pub const REG_DATA0: u8 = 0x14;
/// DMA address 0.
pub const REG_DMA0: u8 = 0x18;
/// Length received into buffer 1.
pub const REG_RX_LEN1: u8 = 0x1C;
/// Custom number word 1.
pub const REG_DATA1: u8 = 0x20;
/// DMA address 1.
pub const REG_DMA1: u8 = 0x24;

// ── CTRL bits ────────────────────────────────────────────────────────────────

/// SATA ALIGN primitive.
pub const CTRL_ALIGN_EN: u32 = 1 << 18;
/// SATA CONT primitive.
pub const CTRL_CONT_EN: u32 = 1 << 17;
/// Global power up.
pub const CTRL_POWR_UP: u32 = 1 << 16;
/// Transmitter power up.
pub const CTRL_TX_PU: u32 = 1 << 15;
/// Receiver power up.
pub const CTRL_RX_PU: u32 = 1 << 14;
/// PLL power up.
pub const CTRL_PLL_PU: u32 = 1 << 13;
/// PLL frequency field mask.
pub const CTRL_PLL_FREQ_MASK: u32 = 0x1F << 8;
/// DMA enable.
pub const CTRL_DMA_EN: u32 = 1 << 7;
/// Transmit enable.
pub const CTRL_TX_EN: u32 = 1 << 6;
/// Receive enable.
pub const CTRL_RX_EN: u32 = 1 << 5;
/// Receive polarity inversion.
pub const CTRL_RX_POLAR: u32 = 1 << 4;
/// Busy interrupt enable.
pub const CTRL_INT_BUSY_EN: u32 = 1 << 3;
/// PHY reset.
pub const CTRL_PHY_RESET: u32 = 1 << 2;
/// Link reset.
pub const CTRL_LINK_RESET: u32 = 1 << 1;
/// Clear FIFO and state.
pub const CTRL_ALL_CLR: u32 = 1 << 0;

/// Every power-up bit set together during init.
pub const CTRL_POWER_BITS: u32 = CTRL_POWR_UP | CTRL_TX_PU | CTRL_RX_PU | CTRL_PLL_PU;

// ── RTX_CTRL bits ────────────────────────────────────────────────────────────

/// Transmit length field mask.
pub const RTX_LEN_MASK: u32 = 0xFFFF;
/// Link initialization pulse.
pub const RTX_LINK_INIT: u32 = 1 << 16;
/// Start transmission.
pub const RTX_TX_START: u32 = 1 << 17;
/// Double DMA receive buffer mode.
pub const RTX_BUF_MODE: u32 = 1 << 18;

// ── INT_EN / STATUS flag bits ────────────────────────────────────────────────

/// PHY ready.
pub const INT_PHY_RDY: u32 = 1 << 0;
/// Transmit done (TX mode).
pub const INT_TX_DONE: u32 = 1 << 1;
/// Receive error (RX mode; shares the TX done bit).
pub const INT_RX_ERR: u32 = 1 << 1;
/// Packet received.
pub const INT_RX_DONE: u32 = 1 << 2;
/// FIFO overflow.
pub const INT_FIFO_OV: u32 = 1 << 3;
/// Comma detected.
pub const INT_COMMA: u32 = 1 << 5;
/// Every interrupt flag.
pub const INT_ALL: u32 = 0x2F;

// ── STATUS state bits ────────────────────────────────────────────────────────

/// Sequence number matched.
pub const STATUS_SEQ_MATCH: u32 = 1 << 17;
/// Received packet CRC correct.
pub const STATUS_RX_CRC_OK: u32 = 1 << 18;
/// PLL locked.
pub const STATUS_PLL_READY: u32 = 1 << 19;
/// Transmitter ready for a new packet.
pub const STATUS_TX_READY: u32 = 1 << 20;

// ── Analog configuration (system block, safe-access protected) ───────────────

/// Safe access signature register.
pub const SAFE_ACCESS_SIG: u32 = 0x4000_1000;
/// First safe access signature byte.
pub const SAFE_ACCESS_SIG1: u8 = 0x57;
/// Second safe access signature byte.
pub const SAFE_ACCESS_SIG2: u8 = 0xA8;
/// SerDes analog configuration 1 (16-bit).
pub const SERD_ANA_CFG1: u32 = 0x4000_1020;
/// SerDes analog configuration 2 (32-bit).
pub const SERD_ANA_CFG2: u32 = 0x4000_1024;
/// Vendor value for ANA_CFG1.
pub const SERD_ANA_CFG1_VALUE: u16 = 0x5A;
/// Vendor value for ANA_CFG2.
pub const SERD_ANA_CFG2_VALUE: u32 = 0x0042_3015;

/// Largest value carried by the custom number field (28 bits).
pub const CUSTOM_NUMBER_MAX: u32 = 0x0FFF_FFFF;

/// SerDes line rate: `60 MHz × (n + 2)` with `n` in the PLL field.
///
/// Rates above 1.38 Gbps fail on the CH569 and rates between 600 Mbps and
/// 900 Mbps do not lock, so they are not representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PllFreq {
    /// 180 Mbps (experimental)
    M180 = 1,
    /// 240 Mbps (experimental)
    M240 = 2,
    /// 300 Mbps
    M300 = 3,
    /// 360 Mbps
    M360 = 4,
    /// 420 Mbps
    M420 = 5,
    /// 480 Mbps
    M480 = 6,
    /// 540 Mbps
    M540 = 7,
    /// 600 Mbps
    M600 = 8,
    /// 900 Mbps
    M900 = 13,
    /// 960 Mbps
    M960 = 14,
    /// 1.02 Gbps
    G1_02 = 15,
    /// 1.08 Gbps
    G1_08 = 16,
    /// 1.14 Gbps
    G1_14 = 17,
    /// 1.20 Gbps (official rate)
    #[default]
    G1_20 = 18,
    /// 1.26 Gbps (experimental)
    G1_26 = 19,
    /// 1.32 Gbps (experimental)
    G1_32 = 20,
    /// 1.38 Gbps (experimental)
    G1_38 = 21,
}

impl PllFreq {
    /// CTRL register encoding.
    pub const fn ctrl_bits(self) -> u32 {
        (self as u32) << 8
    }

    /// Line rate in MHz.
    #[allow(clippy::arithmetic_side_effects)] // n <= 21: 60 * 23 fits easily
    pub const fn line_rate_mhz(self) -> u32 {
        60 * (self as u32 + 2)
    }

    /// True for rates outside the vendor-validated range.
    pub const fn is_experimental(self) -> bool {
        matches!(self, Self::M180 | Self::M240 | Self::G1_26 | Self::G1_32 | Self::G1_38)
    }
}

/// Register-level access to the SerDes block.
pub trait SerdesPort {
    /// Read a 32-bit register at `offset` from `SERDES_BASE`.
    fn read(&self, offset: u8) -> u32;
    /// Write a 32-bit register at `offset` from `SERDES_BASE`.
    fn write(&mut self, offset: u8, value: u32);

    /// Unlock safe access and program the analog front end.
    fn analog_setup(&mut self);

    /// Enable the SerDes line in the interrupt controller.
    fn enable_irq(&mut self) {}

    /// Read-modify-write: set `bits`.
    fn set_bits(&mut self, offset: u8, bits: u32) {
        let v = self.read(offset);
        self.write(offset, v | bits);
    }

    /// Read-modify-write: clear `bits`.
    fn clear_bits(&mut self, offset: u8, bits: u32) {
        let v = self.read(offset);
        self.write(offset, v & !bits);
    }
}

impl<P: SerdesPort + ?Sized> SerdesPort for &mut P {
    fn read(&self, offset: u8) -> u32 {
        (**self).read(offset)
    }
    fn write(&mut self, offset: u8, value: u32) {
        (**self).write(offset, value);
    }
    fn analog_setup(&mut self) {
        (**self).analog_setup();
    }
    fn enable_irq(&mut self) {
        (**self).enable_irq();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn official_rate_is_1_2_gbps() {
        assert_eq!(PllFreq::default().line_rate_mhz(), 1200);
        assert_eq!(PllFreq::G1_20.ctrl_bits(), 0x1200);
        assert!(!PllFreq::G1_20.is_experimental());
    }

    #[test]
    fn pll_field_fits_mask() {
        assert_eq!(PllFreq::G1_38.ctrl_bits() & !CTRL_PLL_FREQ_MASK, 0);
        assert_eq!(PllFreq::M180.line_rate_mhz(), 180);
    }
}
