//! GPIO ports A and B.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use platform::{FlexPin, PinMode, Port, PortPin};

use super::mmio;

const PA_BASE: u32 = 0x4000_1040;
const PB_BASE: u32 = 0x4000_1060;

const DIR: u32 = 0x00;
const PIN: u32 = 0x04;
const OUT: u32 = 0x08;
const CLR: u32 = 0x0C;
const PU: u32 = 0x10;
const PD: u32 = 0x14;
const DRV: u32 = 0x18;
const SMT: u32 = 0x1C;

/// PA0..PA23.
const PA_ALL: u32 = 0x00FF_FFFF;
/// PB0..PB24.
const PB_ALL: u32 = 0x01FF_FFFF;
/// PA7 (UART1 RX) and PA8 (UART1 TX).
const UART1_PINS: u32 = (1 << 7) | (1 << 8);

const fn base(port: Port) -> u32 {
    match port {
        Port::A => PA_BASE,
        Port::B => PB_BASE,
    }
}

fn set(port: Port, reg: u32, mask: u32) {
    let addr = base(port).wrapping_add(reg);
    mmio::write32(addr, mmio::read32(addr) | mask);
}

fn clear(port: Port, reg: u32, mask: u32) {
    let addr = base(port).wrapping_add(reg);
    mmio::write32(addr, mmio::read32(addr) & !mask);
}

/// Configure `mask` pins of `port`.
fn configure(port: Port, mask: u32, mode: PinMode) {
    match mode {
        PinMode::FloatingInput => {
            clear(port, PD, mask);
            clear(port, PU, mask);
            clear(port, DIR, mask);
        }
        PinMode::PullUpInput => {
            clear(port, SMT, mask);
            clear(port, PD, mask);
            set(port, PU, mask);
            clear(port, DIR, mask);
        }
        PinMode::PullDownInput => {
            set(port, SMT, mask);
            set(port, PD, mask);
            clear(port, PU, mask);
            clear(port, DIR, mask);
        }
        PinMode::PushPullOutput => {
            clear(port, SMT, mask);
            clear(port, DRV, mask);
            clear(port, PD, mask);
            set(port, DIR, mask);
        }
    }
}

/// Every GPIO to floating input, except the UART1 pins.
pub fn float_all() {
    configure(Port::A, PA_ALL & !UART1_PINS, PinMode::FloatingInput);
    configure(Port::B, PB_ALL, PinMode::FloatingInput);
}

/// UART1 pins: TX as output, Schmitt trigger on both.
pub(crate) fn uart1_pins() {
    set(Port::A, SMT, UART1_PINS);
    set(Port::A, DIR, 1 << 8);
}

/// One GPIO, reconfigurable at run time.
#[derive(Debug, Clone, Copy)]
pub struct Pin {
    pin: PortPin,
}

impl Pin {
    /// Handle on `pin`. Several handles on one pin alias the same register bits.
    pub const fn new(pin: PortPin) -> Self {
        Self { pin }
    }
}

impl ErrorType for Pin {
    type Error = Infallible;
}

impl InputPin for Pin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        let addr = base(self.pin.port()).wrapping_add(PIN);
        Ok(mmio::read32(addr) & self.pin.mask() != 0)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|v| !v)
    }
}

impl OutputPin for Pin {
    fn set_high(&mut self) -> Result<(), Self::Error> {
        set(self.pin.port(), OUT, self.pin.mask());
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        // CLR is write-one-to-clear on OUT
        mmio::write32(base(self.pin.port()).wrapping_add(CLR), self.pin.mask());
        Ok(())
    }
}

impl FlexPin for Pin {
    fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error> {
        configure(self.pin.port(), self.pin.mask(), mode);
        Ok(())
    }
}
