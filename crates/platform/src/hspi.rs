//! CH569 HSPI (parallel high-speed interface) register map.
//!
//! Offsets are relative to `HSPI_BASE`. Widths follow the datasheet:
//! 8-bit control bytes, 32-bit addresses, 16-bit lengths.

/// Peripheral base address.
pub const HSPI_BASE: u32 = 0x4000_6000;

/// PFIC interrupt number of the HSPI.
pub const HSPI_IRQ: u8 = 28;

// ── Register offsets ─────────────────────────────────────────────────────────

/// Mode / data width / toggle enables (8-bit).
pub const REG_CFG: u8 = 0x00;
/// Enable, DMA enable, software trigger, resets (8-bit).
pub const REG_CTRL: u8 = 0x01;
/// Interrupt enable (8-bit).
pub const REG_INT_EN: u8 = 0x02;
/// Auxiliary clock / ack configuration (8-bit).
pub const REG_AUX: u8 = 0x03;
/// Transmit buffer 0 address (32-bit).
pub const REG_TX_ADDR0: u8 = 0x04;
/// Transmit buffer 1 address (32-bit).
pub const REG_TX_ADDR1: u8 = 0x08;
/// Receive buffer 0 address (32-bit).
pub const REG_RX_ADDR0: u8 = 0x0C;
/// Receive buffer 1 address (32-bit).
pub const REG_RX_ADDR1: u8 = 0x10;
/// Transmit length 0, bytes minus one (16-bit).
pub const REG_DMA_LEN0: u8 = 0x14;
/// Receive length limit 0, 0 = 4096 (16-bit).
pub const REG_RX_LEN0: u8 = 0x16;
/// Transmit length 1, bytes minus one (16-bit).
pub const REG_DMA_LEN1: u8 = 0x18;
/// Receive length limit 1 (16-bit).
pub const REG_RX_LEN1: u8 = 0x1A;
/// Burst configuration (16-bit).
pub const REG_BURST_CFG: u8 = 0x1C;
/// Burst counter (16-bit, read-only).
pub const REG_BURST_CNT: u8 = 0x1E;
/// User-defined header field 0 (32-bit, 26 bits used).
pub const REG_UDF0: u8 = 0x20;
/// User-defined header field 1 (32-bit, 26 bits used).
pub const REG_UDF1: u8 = 0x24;
/// Interrupt flags, write 1 to clear (8-bit).
pub const REG_INT_FLAG: u8 = 0x28;
/// Last packet status (8-bit, read-only).
pub const REG_RTX_STATUS: u8 = 0x29;
/// Transmit sequence number and toggle (8-bit).
pub const REG_TX_SC: u8 = 0x2A;
/// Receive sequence number and toggle (8-bit).
pub const REG_RX_SC: u8 = 0x2B;

// ── CFG bits ─────────────────────────────────────────────────────────────────

/// Host (transmitter) mode; clear for device (receiver) mode.
pub const CFG_MODE_HOST: u8 = 0x01;
/// Dual DMA address mode.
pub const CFG_DUALDMA: u8 = 0x02;
/// Data width field mask.
pub const CFG_DAT_MASK: u8 = 0x0C;
/// 8-bit data width.
pub const CFG_DAT8: u8 = 0x00;
/// 16-bit data width.
pub const CFG_DAT16: u8 = 0x04;
/// 32-bit data width.
pub const CFG_DAT32: u8 = 0x08;
/// Transmit address toggle enable.
pub const CFG_TX_TOG_EN: u8 = 0x20;
/// Receive address toggle enable.
pub const CFG_RX_TOG_EN: u8 = 0x40;
/// Hardware acknowledge enable.
pub const CFG_HW_ACK: u8 = 0x80;

// ── CTRL bits ────────────────────────────────────────────────────────────────

/// Interface enable.
pub const CTRL_ENABLE: u8 = 0x01;
/// DMA enable.
pub const CTRL_DMA_EN: u8 = 0x02;
/// Software trigger: send one packet.
pub const CTRL_SW_ACT: u8 = 0x04;
/// Clear FIFO and counters.
pub const CTRL_ALL_CLR: u8 = 0x08;
/// Transmit/receive logic reset.
pub const CTRL_TRX_RST: u8 = 0x10;

// ── INT_EN / INT_FLAG bits ───────────────────────────────────────────────────

/// Single packet transmitted.
pub const INT_T_DONE: u8 = 0x01;
/// Single packet received.
pub const INT_R_DONE: u8 = 0x02;
/// Receive FIFO overflow.
pub const INT_FIFO_OV: u8 = 0x04;
/// Burst done.
pub const INT_B_DONE: u8 = 0x08;
/// Every flag the link sequencer handles.
pub const INT_LINK_MASK: u8 = INT_T_DONE | INT_R_DONE | INT_FIFO_OV;

// ── AUX bits ─────────────────────────────────────────────────────────────────

/// Transmit clock mode.
pub const AUX_TCK_MOD: u8 = 0x01;
/// Receive clock mode.
pub const AUX_RCK_MOD: u8 = 0x02;
/// Acknowledge transmit mode.
pub const AUX_ACK_TX_MOD: u8 = 0x04;
/// Acknowledge count select field.
pub const AUX_ACK_CNT_SEL: u8 = 0x18;
/// Request fine timing.
pub const AUX_REQ_FT: u8 = 0x20;

// ── RTX_STATUS bits ──────────────────────────────────────────────────────────

/// Received packet failed the CRC check.
pub const STATUS_CRC_ERR: u8 = 0x02;
/// Received sequence number did not match.
pub const STATUS_NUM_MIS: u8 = 0x04;

// ── TX_SC / RX_SC bits ───────────────────────────────────────────────────────

/// Sequence number field.
pub const SC_NUM_MASK: u8 = 0x0F;
/// Current address toggle.
pub const SC_TOG: u8 = 0x10;

/// Bus data width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataWidth {
    /// 8 data lines
    Bits8,
    /// 16 data lines
    Bits16,
    /// 32 data lines
    #[default]
    Bits32,
}

impl DataWidth {
    /// CFG register encoding.
    pub const fn cfg_bits(self) -> u8 {
        match self {
            Self::Bits8 => CFG_DAT8,
            Self::Bits16 => CFG_DAT16,
            Self::Bits32 => CFG_DAT32,
        }
    }

    /// Bytes per bus word; packet lengths must be a multiple of this.
    pub const fn bytes(self) -> u16 {
        match self {
            Self::Bits8 => 1,
            Self::Bits16 => 2,
            Self::Bits32 => 4,
        }
    }
}

/// Register-level access to one HSPI instance.
///
/// Offsets are the `REG_*` constants of this module. Implementations must not
/// cache values: every read returns the live hardware state.
pub trait HspiPort {
    /// Read an 8-bit register.
    fn read8(&self, offset: u8) -> u8;
    /// Write an 8-bit register.
    fn write8(&mut self, offset: u8, value: u8);
    /// Read a 16-bit register.
    fn read16(&self, offset: u8) -> u16;
    /// Write a 16-bit register.
    fn write16(&mut self, offset: u8, value: u16);
    /// Read a 32-bit register.
    fn read32(&self, offset: u8) -> u32;
    /// Write a 32-bit register.
    fn write32(&mut self, offset: u8, value: u32);

    /// Read-modify-write: set `bits` in an 8-bit register.
    fn set_bits8(&mut self, offset: u8, bits: u8) {
        let v = self.read8(offset);
        self.write8(offset, v | bits);
    }

    /// Read-modify-write: clear `bits` in an 8-bit register.
    fn clear_bits8(&mut self, offset: u8, bits: u8) {
        let v = self.read8(offset);
        self.write8(offset, v & !bits);
    }

    /// Enable the HSPI line in the interrupt controller.
    fn enable_irq(&mut self) {}
}

impl<P: HspiPort + ?Sized> HspiPort for &mut P {
    fn read8(&self, offset: u8) -> u8 {
        (**self).read8(offset)
    }
    fn write8(&mut self, offset: u8, value: u8) {
        (**self).write8(offset, value);
    }
    fn read16(&self, offset: u8) -> u16 {
        (**self).read16(offset)
    }
    fn write16(&mut self, offset: u8, value: u16) {
        (**self).write16(offset, value);
    }
    fn read32(&self, offset: u8) -> u32 {
        (**self).read32(offset)
    }
    fn write32(&mut self, offset: u8, value: u32) {
        (**self).write32(offset, value);
    }
    fn enable_irq(&mut self) {
        (**self).enable_irq();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_width_encodings_fit_mask() {
        for w in [DataWidth::Bits8, DataWidth::Bits16, DataWidth::Bits32] {
            assert_eq!(w.cfg_bits() & !CFG_DAT_MASK, 0);
        }
        assert_eq!(DataWidth::default(), DataWidth::Bits32);
    }

    #[test]
    fn link_mask_excludes_burst_done() {
        assert_eq!(INT_LINK_MASK & INT_B_DONE, 0);
    }
}
