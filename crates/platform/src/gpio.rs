//! GPIO and pin abstraction layer
//!
//! The board synchronization lines change direction at run time (output on
//! one board, pulled-down input on the other, floating afterwards), so pins
//! are modelled as flexible pins on top of the `embedded-hal` digital traits
//! rather than with compile-time typestate.

use embedded_hal::digital::{InputPin, OutputPin};

/// Electrical mode of a CH569 GPIO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinMode {
    /// Input without pull resistor (safe idle state)
    FloatingInput,
    /// Input with pull-up
    PullUpInput,
    /// Input with pull-down and Schmitt trigger
    PullDownInput,
    /// High-speed push-pull output, 8 mA drive
    PushPullOutput,
}

impl PinMode {
    /// True when the pin drives the line.
    pub const fn is_output(self) -> bool {
        matches!(self, Self::PushPullOutput)
    }
}

/// Pin state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PinState {
    /// High (logic 1)
    High,
    /// Low (logic 0)
    Low,
}

impl From<bool> for PinState {
    fn from(value: bool) -> Self {
        if value {
            Self::High
        } else {
            Self::Low
        }
    }
}

impl From<PinState> for bool {
    fn from(value: PinState) -> Self {
        matches!(value, PinState::High)
    }
}

/// A pin whose direction and pull can be reconfigured at run time.
///
/// The error type is shared with the `embedded-hal` read/write traits.
pub trait FlexPin: InputPin + OutputPin {
    /// Reconfigure the pin electrical mode.
    fn set_mode(&mut self, mode: PinMode) -> Result<(), Self::Error>;

    /// Drive the line to `state` (pin must already be an output).
    fn set_state(&mut self, state: PinState) -> Result<(), Self::Error> {
        match state {
            PinState::High => self.set_high(),
            PinState::Low => self.set_low(),
        }
    }
}

/// GPIO port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Port {
    /// Port A (PA0..PA23)
    A,
    /// Port B (PB0..PB24)
    B,
}

/// A physical CH569 pin: port + bit index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PortPin {
    port: Port,
    index: u8,
}

impl PortPin {
    /// J3 SCS, second synchronization line.
    pub const PA12: Self = Self::new(Port::A, 12);
    /// J3 MOSI, first synchronization line.
    pub const PA14: Self = Self::new(Port::A, 14);
    /// User LED (active high).
    pub const PB22: Self = Self::new(Port::B, 22);
    /// User button (active high).
    pub const PB23: Self = Self::new(Port::B, 23);
    /// Board role strap (pulled up; jumper to GND on the secondary board).
    pub const PB24: Self = Self::new(Port::B, 24);

    /// Create a pin descriptor. `index` must be below 32.
    pub const fn new(port: Port, index: u8) -> Self {
        Self { port, index }
    }

    /// Port of this pin.
    pub const fn port(self) -> Port {
        self.port
    }

    /// Bit index in the port registers.
    pub const fn index(self) -> u8 {
        self.index
    }

    /// Single-bit mask for the port registers.
    pub const fn mask(self) -> u32 {
        1u32 << (self.index & 0x1F)
    }
}
