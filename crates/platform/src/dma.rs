//! DMA buffer abstraction layer
//!
//! The link engines never own memory: buffers are caller-owned RAMX regions
//! identified by their bus address, and the hardware DMA reads or writes them
//! while a burst is in flight.

/// Which half of a [`LinkBufferPair`] the hardware uses next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Selector {
    /// Buffer 0 (ADDR0 / LEN0 registers)
    #[default]
    Zero,
    /// Buffer 1 (ADDR1 / LEN1 registers)
    One,
}

impl Selector {
    /// The other half of the pair.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Zero => Self::One,
            Self::One => Self::Zero,
        }
    }

    /// Array index of this half.
    pub const fn index(self) -> usize {
        match self {
            Self::Zero => 0,
            Self::One => 1,
        }
    }

    /// Decode a hardware toggle bit.
    pub const fn from_bit(bit: bool) -> Self {
        if bit {
            Self::One
        } else {
            Self::Zero
        }
    }

    /// Encode as a hardware toggle bit.
    pub const fn bit(self) -> bool {
        matches!(self, Self::One)
    }
}

/// Two bus addresses registered with the hardware for one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkBufferPair {
    base: [u32; 2],
}

impl LinkBufferPair {
    /// Pair from two explicit addresses.
    pub const fn new(buf0: u32, buf1: u32) -> Self {
        Self { base: [buf0, buf1] }
    }

    /// Interleaved pair over one contiguous region: buffer 1 starts one
    /// packet after buffer 0, so packet `i` of a burst lands at
    /// `base + i * packet_len`.
    pub const fn interleaved(base: u32, packet_len: u16) -> Self {
        Self {
            base: [base, base.wrapping_add(packet_len as u32)],
        }
    }

    /// Burst-start address of one half.
    pub const fn address(&self, sel: Selector) -> u32 {
        match sel {
            Selector::Zero => self.base[0],
            Selector::One => self.base[1],
        }
    }

    /// True if both addresses satisfy the 32-bit DMA alignment.
    pub const fn is_word_aligned(&self) -> bool {
        self.base[0] % 4 == 0 && self.base[1] % 4 == 0
    }
}

/// Error for a bus access outside the mapped memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusFault {
    /// First faulting address
    pub addr: u32,
    /// Length of the rejected access
    pub len: usize,
}

#[cfg(feature = "std")]
impl std::error::Error for BusFault {}

impl core::fmt::Display for BusFault {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "bus fault at 0x{:08X} ({} bytes)", self.addr, self.len)
    }
}

/// Byte-level access to memory at DMA bus addresses.
///
/// Implemented over raw RAMX on hardware and by `mocks::SimMemory` on host.
pub trait BusMemory {
    /// Copy `out.len()` bytes starting at `addr`.
    fn read(&self, addr: u32, out: &mut [u8]) -> Result<(), BusFault>;

    /// Copy `data` to memory starting at `addr`.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), BusFault>;

    /// Read one little-endian word.
    fn read_u32(&self, addr: u32) -> Result<u32, BusFault> {
        let mut word = [0u8; 4];
        self.read(addr, &mut word)?;
        Ok(u32::from_le_bytes(word))
    }

    /// Write one little-endian word.
    fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), BusFault> {
        self.write(addr, &value.to_le_bytes())
    }
}

impl<M: BusMemory + ?Sized> BusMemory for &mut M {
    fn read(&self, addr: u32, out: &mut [u8]) -> Result<(), BusFault> {
        (**self).read(addr, out)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), BusFault> {
        (**self).write(addr, data)
    }
}
