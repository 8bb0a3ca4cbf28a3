//! Link error types.
//!
//! [`LinkErrors`] is the set of hardware-reported faults latched into the
//! link status. Its bit encoding (CRC = 1, sequence = 2, FIFO = 4) is the one
//! printed in the diagnostic log. [`LinkError`] is what fallible operations
//! return.

use core::ops::{BitOr, BitOrAssign};

/// OR-able set of hardware fault kinds observed during one burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkErrors(u8);

impl LinkErrors {
    /// No fault.
    pub const NONE: Self = Self(0);
    /// CRC mismatch on a received packet.
    pub const CRC: Self = Self(0x01);
    /// Sequence number mismatch, or the hardware toggle disagreed.
    pub const SEQ: Self = Self(0x02);
    /// Receive FIFO overflow.
    pub const FIFO: Self = Self(0x04);

    const MASK: u8 = 0x07;

    /// Decode raw bits; unknown bits are dropped.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::MASK)
    }

    /// Raw bit encoding.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// True if no kind is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every kind in `other` is also set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Both sets combined.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for LinkErrors {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl BitOrAssign for LinkErrors {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl core::fmt::Display for LinkErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.is_empty() {
            return write!(f, "none");
        }
        let mut sep = "";
        for (kind, name) in [(Self::CRC, "crc"), (Self::SEQ, "seq"), (Self::FIFO, "fifo")] {
            if self.contains(kind) {
                write!(f, "{sep}{name}")?;
                sep = "|";
            }
        }
        Ok(())
    }
}

/// Link transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// The peer board never answered the synchronization handshake
    HandshakeTimeout,
    /// A received packet failed the CRC check
    Crc,
    /// A sequence number or address toggle mismatch
    Sequence,
    /// The receive FIFO overflowed (Abort overflow policy)
    FifoOverflow,
    /// An error is latched in the status and was not cleared yet
    ErrorPending,
    /// A burst is already in flight in this direction
    BurstInFlight,
    /// No engine was configured for the requested direction
    NotConfigured,
    /// Packet length or count outside the DMA limits
    InvalidPacketLength,
    /// Buffer address misaligned or outside DMA-accessible memory
    InvalidBuffer,
    /// SerDes PLL did not lock within its budget
    PllTimeout,
    /// SerDes transmitter did not become ready within its budget
    TxReadyTimeout,
    /// SerDes custom number does not fit in 28 bits
    CustomNumberTooWide,
    /// A bounded wait ran out of budget
    WaitTimeout,
}

impl LinkError {
    /// Most significant error of a fault set: CRC, then sequence, then FIFO.
    pub const fn from_errors(errors: LinkErrors) -> Option<Self> {
        if errors.contains(LinkErrors::CRC) {
            Some(Self::Crc)
        } else if errors.contains(LinkErrors::SEQ) {
            Some(Self::Sequence)
        } else if errors.contains(LinkErrors::FIFO) {
            Some(Self::FifoOverflow)
        } else {
            None
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LinkError {}

impl core::fmt::Display for LinkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::HandshakeTimeout => write!(f, "Board synchronization timed out"),
            Self::Crc => write!(f, "CRC error on received packet"),
            Self::Sequence => write!(f, "Packet sequence mismatch"),
            Self::FifoOverflow => write!(f, "Receive FIFO overflow"),
            Self::ErrorPending => write!(f, "Link error not cleared"),
            Self::BurstInFlight => write!(f, "Burst already in flight"),
            Self::NotConfigured => write!(f, "Link direction not configured"),
            Self::InvalidPacketLength => write!(f, "Invalid packet length or count"),
            Self::InvalidBuffer => write!(f, "Buffer not DMA accessible"),
            Self::PllTimeout => write!(f, "SerDes PLL lock timeout"),
            Self::TxReadyTimeout => write!(f, "SerDes TX ready timeout"),
            Self::CustomNumberTooWide => write!(f, "Custom number wider than 28 bits"),
            Self::WaitTimeout => write!(f, "Wait for burst completion timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_or_combine() {
        let mut e = LinkErrors::CRC;
        e |= LinkErrors::SEQ;
        assert_eq!(e.bits(), 3);
        assert!(e.contains(LinkErrors::CRC));
        assert!(!e.contains(LinkErrors::FIFO));
        assert_eq!(LinkErrors::from_bits(0xFF).bits(), 7);
    }

    #[test]
    fn display_lists_every_kind() {
        assert_eq!(std::format!("{}", LinkErrors::CRC | LinkErrors::FIFO), "crc|fifo");
        assert_eq!(std::format!("{}", LinkErrors::NONE), "none");
    }

    #[test]
    fn crc_outranks_sequence() {
        assert_eq!(
            LinkError::from_errors(LinkErrors::SEQ | LinkErrors::CRC),
            Some(LinkError::Crc)
        );
        assert_eq!(LinkError::from_errors(LinkErrors::FIFO), Some(LinkError::FifoOverflow));
        assert_eq!(LinkError::from_errors(LinkErrors::NONE), None);
    }
}
