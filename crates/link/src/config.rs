//! Run-time link configuration
//!
//! Defaults reproduce the board constants in [`platform::config`]: 32-bit
//! bus, 64 × 512-byte bursts, the vendor UDF header words, and 1.2 Gbps
//! SerDes.

use platform::config::{HSPI_UDF0, HSPI_UDF1, PLL_READY_BUDGET, TX_READY_BUDGET};
use platform::{DataWidth, PllFreq};

use crate::burst::PacketBurst;
use crate::error::LinkError;

/// UDF header fields are 26 bits wide.
pub const UDF_MAX: u32 = 0x03FF_FFFF;

/// What the sequencer does with a receive FIFO overflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OverflowPolicy {
    /// Count it and carry on; the CRC of the affected packet decides.
    #[default]
    CountOnly,
    /// Count it and abort the burst with `FifoOverflow`.
    Abort,
}

/// HSPI link configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HspiConfig {
    /// Bus data width
    pub width: DataWidth,
    /// Packet size and count
    pub burst: PacketBurst,
    /// FIFO overflow handling
    pub overflow: OverflowPolicy,
    /// User-defined header field 0
    pub udf0: u32,
    /// User-defined header field 1
    pub udf1: u32,
}

impl Default for HspiConfig {
    fn default() -> Self {
        Self {
            width: DataWidth::Bits32,
            burst: PacketBurst::DEFAULT,
            overflow: OverflowPolicy::CountOnly,
            udf0: HSPI_UDF0,
            udf1: HSPI_UDF1,
        }
    }
}

impl HspiConfig {
    /// Same configuration with another burst shape.
    #[must_use]
    pub const fn with_burst(mut self, burst: PacketBurst) -> Self {
        self.burst = burst;
        self
    }

    /// Same configuration with another overflow policy.
    #[must_use]
    pub const fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Packet length must be a whole number of bus words, UDF fields 26 bits.
    #[allow(clippy::arithmetic_side_effects)] // bytes() >= 1
    pub const fn validate(&self) -> Result<(), LinkError> {
        if self.burst.packet_len() % self.width.bytes() != 0 {
            return Err(LinkError::InvalidPacketLength);
        }
        if self.udf0 > UDF_MAX || self.udf1 > UDF_MAX {
            return Err(LinkError::InvalidPacketLength);
        }
        Ok(())
    }
}

/// SerDes link configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SerdesConfig {
    /// Line rate
    pub freq: PllFreq,
    /// Status reads allowed for PLL lock
    pub pll_budget: u32,
    /// Status reads allowed for TX_READY / TX done
    pub tx_ready_budget: u32,
}

impl Default for SerdesConfig {
    fn default() -> Self {
        Self {
            freq: PllFreq::G1_20,
            pll_budget: PLL_READY_BUDGET,
            tx_ready_budget: TX_READY_BUDGET,
        }
    }
}

impl SerdesConfig {
    /// Budgets must allow at least one status read.
    pub const fn validate(&self) -> Result<(), LinkError> {
        if self.pll_budget == 0 {
            return Err(LinkError::PllTimeout);
        }
        if self.tx_ready_budget == 0 {
            return Err(LinkError::TxReadyTimeout);
        }
        Ok(())
    }
}
