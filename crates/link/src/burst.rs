//! Packet bursts and their progress counters.

use platform::config::{HSPI_BURST_PACKETS, HSPI_PACKET_LEN};
use platform::dma_safety::MAX_DMA_LEN;
use platform::Selector;

use crate::error::LinkError;

/// `packets` packets of `packet_len` bytes moved as one unit.
///
/// Packets alternate between the two halves of a
/// [`LinkBufferPair`](platform::LinkBufferPair): packet `i` uses half `i % 2`
/// at offset `(i / 2) * stride()` from that half's burst-start address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PacketBurst {
    packet_len: u16,
    packets: u16,
}

impl PacketBurst {
    /// 64 × 512 bytes = 32 KiB.
    pub const DEFAULT: Self = Self {
        packet_len: HSPI_PACKET_LEN,
        packets: HSPI_BURST_PACKETS,
    };

    /// Validated burst: `1..=4096` bytes per packet, at least one packet.
    pub const fn new(packet_len: u16, packets: u16) -> Result<Self, LinkError> {
        if packet_len == 0 || packet_len > MAX_DMA_LEN || packets == 0 {
            return Err(LinkError::InvalidPacketLength);
        }
        Ok(Self { packet_len, packets })
    }

    /// A single packet.
    pub const fn single(packet_len: u16) -> Result<Self, LinkError> {
        Self::new(packet_len, 1)
    }

    /// Bytes per packet.
    pub const fn packet_len(&self) -> u16 {
        self.packet_len
    }

    /// Packets per burst.
    pub const fn packets(&self) -> u16 {
        self.packets
    }

    /// Bytes moved by the whole burst.
    #[allow(clippy::arithmetic_side_effects)] // u16 × u16 fits u32
    pub const fn total_bytes(&self) -> u32 {
        self.packet_len as u32 * self.packets as u32
    }

    /// Distance between two consecutive packets of the same half.
    #[allow(clippy::arithmetic_side_effects)] // <= 8192
    pub const fn stride(&self) -> u32 {
        2 * self.packet_len as u32
    }

    /// Packets that land in half `sel`.
    #[allow(clippy::arithmetic_side_effects)] // packets >= 1
    pub const fn packets_in(&self, sel: Selector) -> u16 {
        match sel {
            Selector::Zero => self.packets.div_ceil(2),
            Selector::One => self.packets / 2,
        }
    }

    /// Bytes spanned in half `sel`, from its burst-start address to the end
    /// of its last packet.
    #[allow(clippy::arithmetic_side_effects)] // bounded by 4096 × 65535 × 2
    pub const fn span_of(&self, sel: Selector) -> u32 {
        let n = self.packets_in(sel) as u32;
        if n == 0 {
            0
        } else {
            (n - 1) * self.stride() + self.packet_len as u32
        }
    }
}

impl Default for PacketBurst {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Progress through the current burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BurstProgress {
    /// Packets completed
    pub packets: u16,
    /// Address toggles performed
    pub toggles: u16,
    /// Half the next packet uses
    pub selector: Selector,
}

impl BurstProgress {
    /// Counters at the start of a burst.
    pub const fn start() -> Self {
        Self {
            packets: 0,
            toggles: 0,
            selector: Selector::Zero,
        }
    }

    /// One packet completed: count it and toggle.
    #[must_use]
    pub const fn advance(self) -> Self {
        Self {
            packets: self.packets.saturating_add(1),
            toggles: self.toggles.saturating_add(1),
            selector: self.selector.toggled(),
        }
    }
}
