//! DMA safety marker traits and buffer sizing constants for CH569.
//!
//! ## DMA Accessibility on CH569
//!
//! | Memory Region | Base Address | Size   | HSPI | SerDes | USB3 | Use case |
//! |---------------|-------------|--------|------|--------|------|----------|
//! | RAMX          | 0x2002_0000 | 96 KB  | YES  | YES    | YES  | Link burst window |
//! | RAMS          | 0x2000_0000 | 32 KB  | NO   | NO     | NO   | CPU-only: stack, statics |
//!
//! ## Usage
//! ```rust
//! use platform::dma_safety::{RamxRegion, DmaAccessible, RAMX_BASE};
//!
//! fn place<R: DmaAccessible>(addr: u32) -> Option<u32> {
//!     R::contains(addr, 512).then_some(addr)
//! }
//! assert_eq!(place::<RamxRegion>(RAMX_BASE), Some(RAMX_BASE));
//! ```

// ── Memory region addresses ──────────────────────────────────────────────────

/// Base address of RAMX (high-speed peripheral DMA accessible).
pub const RAMX_BASE: u32 = 0x2002_0000;

/// Size of RAMX in bytes (96 KB).
pub const RAMX_SIZE_BYTES: u32 = 96 * 1024;

/// Base address of RAMS (CPU-only).
pub const RAMS_BASE: u32 = 0x2000_0000;

/// Size of RAMS in bytes (32 KB).
pub const RAMS_SIZE_BYTES: u32 = 32 * 1024;

/// True: RAMS is NOT reachable by the HSPI/SerDes DMA. Place no link buffers here.
pub const RAMS_NOT_DMA_ACCESSIBLE: bool = true;

// ── Link DMA constants ───────────────────────────────────────────────────────

/// Largest HSPI/SerDes DMA transfer in bytes (12-bit length field).
pub const MAX_DMA_LEN: u16 = 4096;

/// HSPI RX_LEN register value meaning "maximum length".
pub const RX_LEN_MAX_ENCODING: u16 = 0;

// ── Marker traits ────────────────────────────────────────────────────────────

/// Marker trait: memory region accessible by the HSPI and SerDes DMA.
///
/// # Safety
/// Only implement for zero-sized types representing memory regions that the
/// CH569 high-speed peripheral DMA can physically address. Implementing this
/// for RAMS makes the DMA silently read or write the wrong memory.
pub unsafe trait DmaAccessible: Sized {
    /// First byte of the region.
    const BASE: u32;
    /// Region size in bytes.
    const SIZE: u32;

    /// True if `[addr, addr + len)` lies inside the region.
    fn contains(addr: u32, len: u32) -> bool {
        let end = u64::from(Self::BASE).saturating_add(u64::from(Self::SIZE));
        addr >= Self::BASE && u64::from(addr).saturating_add(u64::from(len)) <= end
    }
}

// ── Region zero-sized types ──────────────────────────────────────────────────

/// Zero-sized type representing RAMX.
///
/// The HSPI double-buffer window and SerDes buffers live here.
#[derive(Debug, Clone, Copy)]
pub struct RamxRegion;

// SAFETY: RAMX at 0x2002_0000 is the shared memory of the high-speed
// peripherals (HSPI, SerDes, USB3) per the CH569 datasheet memory map.
unsafe impl DmaAccessible for RamxRegion {
    const BASE: u32 = RAMX_BASE;
    const SIZE: u32 = RAMX_SIZE_BYTES;
}

/// Zero-sized type representing RAMS (CPU-only, NOT DMA-accessible).
#[derive(Debug, Clone, Copy)]
pub struct RamsRegion;
// RamsRegion does NOT implement DmaAccessible.

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use super::*;

    #[test]
    fn ramx_contains_link_window() {
        assert!(RamxRegion::contains(RAMX_BASE, 32 * 1024));
        assert!(RamxRegion::contains(RAMX_BASE + RAMX_SIZE_BYTES - 4, 4));
    }

    #[test]
    fn ramx_rejects_outside_accesses() {
        assert!(!RamxRegion::contains(RAMS_BASE, 4));
        assert!(!RamxRegion::contains(RAMX_BASE + RAMX_SIZE_BYTES - 4, 8));
        assert!(!RamxRegion::contains(u32::MAX, 4));
    }
}
