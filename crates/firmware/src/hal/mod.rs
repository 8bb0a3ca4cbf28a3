//! CH569W register-level HAL (hardware builds only)
//!
//! Zero-sized handles over the memory-mapped peripherals the demo uses,
//! implementing the `platform` collaborator traits:
//!
//! | Handle            | Trait                 | Peripheral        |
//! |-------------------|-----------------------|-------------------|
//! | [`Pin`]           | `FlexPin`             | GPIO PA / PB      |
//! | [`HspiMmio`]      | `HspiPort`            | HSPI              |
//! | [`SerdesMmio`]    | `SerdesPort`          | SerDes + analog   |
//! | [`Ramx`]          | `BusMemory`           | RAMX              |
//! | [`SysTick`]       | `Timebase`            | 64-bit SysTick    |
//! | [`Uart1`]         | `core::fmt::Write`    | UART1 (PA7/PA8)   |

pub mod clock;
pub mod gpio;
pub mod memory;
pub mod ports;
pub mod systick;
pub mod uart;

pub use clock::{chip_id, init_clock_120mhz};
pub use gpio::Pin;
pub use memory::Ramx;
pub use ports::{HspiMmio, SerdesMmio};
pub use systick::SysTick;
pub use uart::Uart1;

/// PFIC interrupt enable registers.
const PFIC_IENR: u32 = 0xE000_E100;

/// Volatile register access at absolute addresses.
mod mmio {
    #[inline(always)]
    pub(crate) fn read8(addr: u32) -> u8 {
        // SAFETY: callers only pass CH569 peripheral register addresses.
        unsafe { core::ptr::read_volatile(addr as usize as *const u8) }
    }

    #[inline(always)]
    pub(crate) fn write8(addr: u32, value: u8) {
        // SAFETY: as above.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u8, value) }
    }

    #[inline(always)]
    pub(crate) fn read16(addr: u32) -> u16 {
        // SAFETY: as above; 16-bit registers are halfword aligned.
        unsafe { core::ptr::read_volatile(addr as usize as *const u16) }
    }

    #[inline(always)]
    pub(crate) fn write16(addr: u32, value: u16) {
        // SAFETY: as above.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u16, value) }
    }

    #[inline(always)]
    pub(crate) fn read32(addr: u32) -> u32 {
        // SAFETY: as above; 32-bit registers are word aligned.
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    #[inline(always)]
    pub(crate) fn write32(addr: u32, value: u32) {
        // SAFETY: as above.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}

/// Enable interrupt `irq` in the PFIC.
pub fn enable_irq(irq: u8) {
    let reg = PFIC_IENR.wrapping_add(u32::from(irq >> 5).wrapping_mul(4));
    mmio::write32(reg, 1u32 << (irq & 31));
}
