//! RAMX as [`BusMemory`].
//!
//! RAMX is not mapped in `memory.x`; the link buffers live there by address
//! only, so CPU access goes through volatile reads and writes.

use platform::dma_safety::{DmaAccessible, RamxRegion};
use platform::{BusFault, BusMemory};

/// The 96 KiB RAMX window.
#[derive(Debug, Default)]
pub struct Ramx;

fn check(addr: u32, len: usize) -> Result<(), BusFault> {
    let fault = BusFault { addr, len };
    let len32 = u32::try_from(len).map_err(|_| fault)?;
    if RamxRegion::contains(addr, len32) {
        Ok(())
    } else {
        Err(fault)
    }
}

impl BusMemory for Ramx {
    fn read(&self, addr: u32, out: &mut [u8]) -> Result<(), BusFault> {
        check(addr, out.len())?;
        for (i, b) in out.iter_mut().enumerate() {
            let p = addr.wrapping_add(i as u32) as usize as *const u8;
            // SAFETY: inside RAMX, checked above.
            *b = unsafe { core::ptr::read_volatile(p) };
        }
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), BusFault> {
        check(addr, data.len())?;
        for (i, &b) in data.iter().enumerate() {
            let p = addr.wrapping_add(i as u32) as usize as *mut u8;
            // SAFETY: inside RAMX, checked above.
            unsafe { core::ptr::write_volatile(p, b) };
        }
        Ok(())
    }

    fn read_u32(&self, addr: u32) -> Result<u32, BusFault> {
        check(addr, 4)?;
        if addr % 4 != 0 {
            let mut word = [0u8; 4];
            self.read(addr, &mut word)?;
            return Ok(u32::from_le_bytes(word));
        }
        // SAFETY: aligned word inside RAMX.
        Ok(unsafe { core::ptr::read_volatile(addr as usize as *const u32) })
    }

    fn write_u32(&mut self, addr: u32, value: u32) -> Result<(), BusFault> {
        check(addr, 4)?;
        if addr % 4 != 0 {
            return self.write(addr, &value.to_le_bytes());
        }
        // SAFETY: aligned word inside RAMX.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) };
        Ok(())
    }
}
