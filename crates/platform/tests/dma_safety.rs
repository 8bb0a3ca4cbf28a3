//! Architecture tests: DMA region marker traits and link window placement.
//! These tests pin the compile-time guarantees about where the HSPI and
//! SerDes DMA may point.

// Test files legitimately use arithmetic for verification; allow at file level.
#![allow(clippy::arithmetic_side_effects)]
// Some assertions check documented compile-time constants for architectural correctness.
#![allow(clippy::assertions_on_constants)]

use platform::config::{HSPI_BURST_PACKETS, HSPI_PACKET_LEN, LINK_WINDOW_BASE, LINK_WINDOW_BYTES};
use platform::dma_safety::{
    DmaAccessible, RamsRegion, RamxRegion, MAX_DMA_LEN, RAMS_BASE, RAMS_NOT_DMA_ACCESSIBLE, RAMS_SIZE_BYTES,
    RAMX_BASE, RAMX_SIZE_BYTES, RX_LEN_MAX_ENCODING,
};
use platform::LinkBufferPair;

// Test 1: region markers are zero-sized
#[test]
fn region_markers_are_zero_sized() {
    assert_eq!(core::mem::size_of::<RamxRegion>(), 0);
    assert_eq!(core::mem::size_of::<RamsRegion>(), 0);
}

// Test 2: RamxRegion implements DmaAccessible
#[test]
fn ramx_region_implements_dma_accessible() {
    fn assert_dma_accessible<T: DmaAccessible>() {}
    assert_dma_accessible::<RamxRegion>();
    assert_eq!(RamxRegion::BASE, RAMX_BASE);
    assert_eq!(RamxRegion::SIZE, RAMX_SIZE_BYTES);
}

// Test 3: RAMS is documented as CPU-only and does not overlap RAMX
#[test]
fn rams_is_cpu_only_and_disjoint_from_ramx() {
    assert!(RAMS_NOT_DMA_ACCESSIBLE);
    assert!(RAMS_BASE + RAMS_SIZE_BYTES <= RAMX_BASE);
    assert!(!RamxRegion::contains(RAMS_BASE, 4));
}

// Test 4: the whole HSPI link window fits in RAMX
#[test]
fn link_window_lies_in_ramx() {
    assert!(RamxRegion::contains(LINK_WINDOW_BASE, LINK_WINDOW_BYTES));
    assert_eq!(
        LINK_WINDOW_BYTES,
        u32::from(HSPI_PACKET_LEN) * u32::from(HSPI_BURST_PACKETS),
        "one burst fills the window exactly"
    );
}

// Test 5: every packet of an interleaved burst stays in the window
#[test]
fn interleaved_burst_stays_in_window() {
    let pair = LinkBufferPair::interleaved(LINK_WINDOW_BASE, HSPI_PACKET_LEN);
    assert!(pair.is_word_aligned());
    let last = LINK_WINDOW_BASE + (u32::from(HSPI_BURST_PACKETS) - 1) * u32::from(HSPI_PACKET_LEN);
    assert!(RamxRegion::contains(last, u32::from(HSPI_PACKET_LEN)));
}

// Test 6: DMA length limits
#[test]
fn dma_length_limits() {
    assert_eq!(MAX_DMA_LEN, 4096);
    assert!(HSPI_PACKET_LEN <= MAX_DMA_LEN);
    // RX_LEN 0 selects the maximum
    assert_eq!(RX_LEN_MAX_ENCODING, 0);
}

// Test 7: the region check rejects straddling accesses
#[test]
fn straddling_access_is_rejected() {
    let end = RAMX_BASE + RAMX_SIZE_BYTES;
    assert!(RamxRegion::contains(end - 4, 4));
    assert!(!RamxRegion::contains(end - 2, 4));
    assert!(!RamxRegion::contains(RAMX_BASE - 1, 2));
    assert!(!RamxRegion::contains(u32::MAX - 1, 8), "no wrap-around");
}

mod props {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        // Test 8: an accepted access never leaves RAMX
        #[test]
        fn accepted_access_stays_in_ramx(addr in any::<u32>(), len in 0u32..=8192) {
            if RamxRegion::contains(addr, len) {
                prop_assert!(addr >= RAMX_BASE);
                prop_assert!(u64::from(addr) + u64::from(len) <= u64::from(RAMX_BASE) + u64::from(RAMX_SIZE_BYTES));
            }
        }

        // Test 9: packet `i` of an interleaved burst starts `i` packets in
        #[test]
        fn interleaved_halves_are_one_packet_apart(words in 1u16..=1024) {
            let len = words * 4;
            let pair = LinkBufferPair::interleaved(LINK_WINDOW_BASE, len);
            prop_assert!(pair.is_word_aligned());
            prop_assert_eq!(
                pair.address(platform::Selector::One) - pair.address(platform::Selector::Zero),
                u32::from(len)
            );
        }
    }
}
