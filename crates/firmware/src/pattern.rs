//! Test patterns written to and checked in RAMX.
//!
//! The HSPI demo fills the host's link window with `word[i] = i + 0x55555555`
//! and the device verifies the same sequence after each burst.

use platform::{BusFault, BusMemory};

/// Offset added to the word index in the HSPI test pattern.
pub const PATTERN_SEED: u32 = 0x5555_5555;

/// Expected value of pattern word `index`.
pub const fn expected_word(index: u32) -> u32 {
    index.wrapping_add(PATTERN_SEED)
}

/// First word that did not match the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Word index in the region
    pub index: u32,
    /// Bus address of the word
    pub addr: u32,
    /// Value read
    pub found: u32,
    /// Value the pattern expects
    pub expected: u32,
}

impl core::fmt::Display for Mismatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "Verify err addr 0x{:08X} val 0x{:08X} expected 0x{:08X}",
            self.addr, self.found, self.expected
        )
    }
}

const fn word_addr(base: u32, index: u32) -> u32 {
    base.wrapping_add(index.wrapping_mul(4))
}

/// Write `words` pattern words starting at `base`.
pub fn fill<M: BusMemory + ?Sized>(memory: &mut M, base: u32, words: u32) -> Result<(), BusFault> {
    (0..words).try_for_each(|i| memory.write_u32(word_addr(base, i), expected_word(i)))
}

/// Zero `bytes` bytes starting at `base`.
pub fn clear<M: BusMemory + ?Sized>(memory: &mut M, base: u32, bytes: u32) -> Result<(), BusFault> {
    let zeros = [0u8; 256];
    let mut addr = base;
    let mut left = bytes as usize;
    while left > 0 {
        let n = left.min(zeros.len());
        memory.write(addr, zeros.get(..n).unwrap_or(&[]))?;
        addr = addr.wrapping_add(n as u32);
        left = left.saturating_sub(n);
    }
    Ok(())
}

/// Check `words` pattern words at `base`; `Ok(None)` when all match.
pub fn verify<M: BusMemory + ?Sized>(memory: &M, base: u32, words: u32) -> Result<Option<Mismatch>, BusFault> {
    for index in 0..words {
        let addr = word_addr(base, index);
        let found = memory.read_u32(addr)?;
        let expected = expected_word(index);
        if found != expected {
            return Ok(Some(Mismatch {
                index,
                addr,
                found,
                expected,
            }));
        }
    }
    Ok(None)
}

/// Word generator for the SerDes payloads: a constant or an increasing ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ramp {
    next: u32,
    step: u32,
}

impl Ramp {
    /// Ramp from `start` by `step` per word. `step == 0` is a constant fill.
    pub const fn new(start: u32, step: u32) -> Self {
        Self { next: start, step }
    }

    /// Value the next written word takes.
    pub const fn peek(&self) -> u32 {
        self.next
    }

    /// Fill `bytes / 4` words at `base` and advance the ramp.
    pub fn fill<M: BusMemory + ?Sized>(&mut self, memory: &mut M, base: u32, bytes: u32) -> Result<(), BusFault> {
        for i in 0..bytes / 4 {
            memory.write_u32(word_addr(base, i), self.next)?;
            self.next = self.next.wrapping_add(self.step);
        }
        Ok(())
    }
}
