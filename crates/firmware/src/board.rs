//! HydraUSB3 board bring-up
//!
//! Safe GPIO defaults, role strap, LED and button, and the board
//! synchronization handshake over the J3 sync lines.

use embedded_hal::delay::DelayNs;
use link::{synchronize, BoardRole, HandshakeOutcome};
use platform::config::SYNC_TIMEOUT_CYCLES;
use platform::{FlexPin, PinMode, PortPin, Timebase};

/// Role strap, pulled up. Jumper to GND on the device board.
pub const STRAP_PIN: PortPin = PortPin::PB24;
/// Sync line driven by RoleA (J3 MOSI).
pub const SYNC_OUT_PIN: PortPin = PortPin::PA14;
/// Sync line driven by RoleB (J3 SCS).
pub const SYNC_IN_PIN: PortPin = PortPin::PA12;
/// User LED, active high.
pub const LED_PIN: PortPin = PortPin::PB22;
/// User button, active high.
pub const BUTTON_PIN: PortPin = PortPin::PB23;

/// Blink half-period while idle.
pub const BLINK_SLOW_MS: u32 = 250;
/// Blink half-period while the button is held. Shorter periods make the
/// device miss HSPI packets when both boards log to UART.
pub const BLINK_FAST_MS: u32 = 2;

/// Role used when the strap cannot be read.
pub const STRAP_FALLBACK: BoardRole = BoardRole::RoleB;

/// The board GPIOs the link demo uses.
pub struct Board<P> {
    strap: P,
    sync_out: P,
    sync_in: P,
    led: P,
    button: P,
}

impl<P: FlexPin> Board<P> {
    /// Take the pins and put them in their safe default state: strap
    /// pulled up, sync lines floating, LED off, button floating.
    pub fn new(mut strap: P, mut sync_out: P, mut sync_in: P, mut led: P, mut button: P) -> Result<Self, P::Error> {
        strap.set_mode(PinMode::PullUpInput)?;
        sync_out.set_mode(PinMode::FloatingInput)?;
        sync_in.set_mode(PinMode::FloatingInput)?;
        led.set_low()?;
        led.set_mode(PinMode::PushPullOutput)?;
        button.set_mode(PinMode::FloatingInput)?;
        Ok(Self {
            strap,
            sync_out,
            sync_in,
            led,
            button,
        })
    }

    /// Elect the role and wait for the peer board.
    ///
    /// The LED pulses once on success, as a scope trigger for the sync
    /// edge on both boards.
    pub fn synchronize<T: Timebase>(&mut self, timebase: &T) -> HandshakeOutcome {
        let outcome = synchronize(
            &mut self.strap,
            &mut self.sync_out,
            &mut self.sync_in,
            STRAP_FALLBACK,
            timebase,
            SYNC_TIMEOUT_CYCLES,
        );
        if matches!(outcome, HandshakeOutcome::Synchronized { .. }) {
            self.set_led(true);
            self.set_led(false);
        }
        outcome
    }

    /// True while the user button is held. A failed read counts as released.
    pub fn button_pressed(&mut self) -> bool {
        self.button.is_high().unwrap_or(false)
    }

    /// Drive the LED. Errors are ignored; the LED is cosmetic.
    pub fn set_led(&mut self, on: bool) {
        let _ = if on { self.led.set_high() } else { self.led.set_low() };
    }

    /// One LED blink period: on for `half_period_ms`, then off as long.
    pub fn blink<D: DelayNs>(&mut self, delay: &mut D, half_period_ms: u32) {
        self.set_led(true);
        delay.delay_ms(half_period_ms);
        self.set_led(false);
        delay.delay_ms(half_period_ms);
    }

    /// Blink half-period for the host idle loop.
    pub fn blink_period_ms(&mut self) -> u32 {
        if self.button_pressed() {
            BLINK_FAST_MS
        } else {
            BLINK_SLOW_MS
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use super::*;
    use embedded_hal::digital::InputPin;
    use platform::mocks::{ManualTimebase, MockPin};
    use platform::Port;
    use std::vec::Vec;

    struct Probe {
        pin: MockPin,
        levels: Vec<bool>,
        total_ms: u32,
    }

    impl DelayNs for Probe {
        fn delay_ns(&mut self, ns: u32) {
            self.levels.push(self.pin.is_high().unwrap());
            self.total_ms += ns / 1_000_000;
        }
    }

    fn board(strap_jumper: bool, peer_after: Option<u32>) -> (Board<MockPin>, MockPin) {
        let (led, peer) = MockPin::wired_pair();
        let sync_in = match peer_after {
            Some(n) => MockPin::new().with_peer_ready_after(n),
            None => MockPin::new(),
        };
        let b = Board::new(MockPin::strap(strap_jumper), MockPin::new(), sync_in, led, MockPin::new()).unwrap();
        (b, peer)
    }

    #[test]
    fn role_a_drives_mosi_and_listens_on_scs() {
        assert_eq!(SYNC_OUT_PIN, PortPin::PA14);
        assert_eq!((SYNC_OUT_PIN.port(), SYNC_OUT_PIN.mask()), (Port::A, 1 << 14));
        assert_eq!(SYNC_IN_PIN, PortPin::PA12);
        assert_eq!((SYNC_IN_PIN.port(), SYNC_IN_PIN.mask()), (Port::A, 1 << 12));
    }

    #[test]
    fn safe_defaults_applied() {
        let (b, _) = board(false, None);
        assert_eq!(b.strap.mode(), PinMode::PullUpInput);
        assert_eq!(b.sync_out.mode(), PinMode::FloatingInput);
        assert_eq!(b.led.mode(), PinMode::PushPullOutput);
        assert!(!b.led.line_level());
    }

    #[test]
    fn host_board_synchronizes_as_role_a() {
        let (mut b, _) = board(false, Some(5));
        let tb = ManualTimebase::ticking(120, 10);
        let outcome = b.synchronize(&tb);
        assert_eq!(outcome.role(), BoardRole::RoleA);
        assert!(matches!(outcome, HandshakeOutcome::Synchronized { .. }));
        assert_eq!(b.sync_out.history().last(), Some(&PinMode::FloatingInput));
        assert!(!b.led.line_level());
    }

    #[test]
    fn missing_peer_times_out_with_strap_role() {
        let (mut b, _) = board(true, None);
        let tb = ManualTimebase::ticking(120, SYNC_TIMEOUT_CYCLES / 50);
        let outcome = b.synchronize(&tb);
        assert_eq!(outcome, HandshakeOutcome::Timeout { role: BoardRole::RoleB });
    }

    #[test]
    fn blink_drives_led_on_then_off() {
        let (mut b, peer) = board(false, None);
        let mut delay = Probe {
            pin: peer,
            levels: Vec::new(),
            total_ms: 0,
        };
        let period = b.blink_period_ms();
        b.blink(&mut delay, period);
        assert_eq!(period, BLINK_SLOW_MS);
        assert_eq!(delay.levels.first(), Some(&true));
        assert_eq!(delay.levels.last(), Some(&false));
        assert_eq!(delay.total_ms, 2 * BLINK_SLOW_MS);
    }
}
