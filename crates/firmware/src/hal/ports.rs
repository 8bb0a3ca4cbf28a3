//! HSPI and SerDes register blocks.

use platform::hspi::{HSPI_BASE, HSPI_IRQ};
use platform::serdes::{
    SERDES_BASE, SERDES_IRQ, SERD_ANA_CFG1, SERD_ANA_CFG1_VALUE, SERD_ANA_CFG2, SERD_ANA_CFG2_VALUE,
};
use platform::{HspiPort, SerdesPort};

use super::{clock, enable_irq, mmio};

/// The HSPI peripheral.
#[derive(Debug)]
pub struct HspiMmio;

impl HspiMmio {
    const fn at(offset: u8) -> u32 {
        HSPI_BASE.wrapping_add(offset as u32)
    }
}

impl HspiPort for HspiMmio {
    fn read8(&self, offset: u8) -> u8 {
        mmio::read8(Self::at(offset))
    }
    fn write8(&mut self, offset: u8, value: u8) {
        mmio::write8(Self::at(offset), value);
    }
    fn read16(&self, offset: u8) -> u16 {
        mmio::read16(Self::at(offset))
    }
    fn write16(&mut self, offset: u8, value: u16) {
        mmio::write16(Self::at(offset), value);
    }
    fn read32(&self, offset: u8) -> u32 {
        mmio::read32(Self::at(offset))
    }
    fn write32(&mut self, offset: u8, value: u32) {
        mmio::write32(Self::at(offset), value);
    }
    fn enable_irq(&mut self) {
        enable_irq(HSPI_IRQ);
    }
}

/// The SerDes peripheral and its analog front end.
#[derive(Debug)]
pub struct SerdesMmio;

impl SerdesPort for SerdesMmio {
    fn read(&self, offset: u8) -> u32 {
        mmio::read32(SERDES_BASE.wrapping_add(u32::from(offset)))
    }

    fn write(&mut self, offset: u8, value: u32) {
        mmio::write32(SERDES_BASE.wrapping_add(u32::from(offset)), value);
    }

    fn analog_setup(&mut self) {
        clock::unlock_safe_access();
        mmio::write16(SERD_ANA_CFG1, SERD_ANA_CFG1_VALUE);
        mmio::write32(SERD_ANA_CFG2, SERD_ANA_CFG2_VALUE);
    }

    fn enable_irq(&mut self) {
        enable_irq(SERDES_IRQ);
    }
}
