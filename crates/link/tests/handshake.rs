//! Handshake behaviour across wired sync lines.

#![allow(clippy::unwrap_used, clippy::expect_used)]
#![allow(clippy::arithmetic_side_effects)]

use embedded_hal::digital::OutputPin;
use link::{synchronize, BoardRole, HandshakeOutcome, LinkError};
use platform::mocks::{ManualTimebase, MockPin};
use platform::{FlexPin, PinMode};

#[test]
fn test_timeout_is_bounded_by_budget() {
    let mut strap = MockPin::strap(false);
    let mut out = MockPin::new();
    let mut inp = MockPin::new();
    let tb = ManualTimebase::ticking(120, 10);

    let outcome = synchronize(&mut strap, &mut out, &mut inp, BoardRole::RoleB, &tb, 1_000);

    assert_eq!(outcome, HandshakeOutcome::Timeout { role: BoardRole::RoleA });
    assert_eq!(outcome.into_result(), Err(LinkError::HandshakeTimeout));
    assert!(inp.reads() <= 100, "polled {} times past the budget", inp.reads());
    assert!(tb.peek() <= 1_000 + 2 * 10);
    assert_eq!(out.mode(), PinMode::FloatingInput);
    assert_eq!(inp.mode(), PinMode::FloatingInput);
}

#[test]
fn test_initiator_meets_a_peer_already_driving() {
    // line 1: initiator drives, responder listens; line 2: the reverse
    let (mut a_out, b_listen) = MockPin::wired_pair();
    let (mut a_in, mut b_drive) = MockPin::wired_pair();
    b_drive.set_mode(PinMode::PushPullOutput).unwrap();
    b_drive.set_high().unwrap();

    let mut strap = MockPin::strap(false);
    let tb = ManualTimebase::ticking(120, 1);
    let outcome = synchronize(&mut strap, &mut a_out, &mut a_in, BoardRole::RoleB, &tb, 10_000);

    let (role, cycles) = outcome.into_result().unwrap();
    assert_eq!(role, BoardRole::RoleA);
    assert!(cycles >= 1);
    assert_eq!(a_in.reads(), 1);
    // Released afterwards.
    assert!(!b_listen.line_level());
}

#[test]
fn test_responder_drives_the_other_line() {
    let (mut b_out, mut a_drive) = MockPin::wired_pair();
    let (mut b_in, a_listen) = MockPin::wired_pair();
    // Initiator already raised its line.
    a_drive.set_mode(PinMode::PushPullOutput).unwrap();
    a_drive.set_high().unwrap();

    let mut strap = MockPin::strap(true);
    let tb = ManualTimebase::ticking(120, 1);
    let outcome = synchronize(&mut strap, &mut b_out, &mut b_in, BoardRole::RoleA, &tb, 10_000);

    assert_eq!(outcome.role(), BoardRole::RoleB);
    assert!(matches!(outcome, HandshakeOutcome::Synchronized { .. }));
    assert_eq!(b_in.history(), [PinMode::PushPullOutput, PinMode::FloatingInput]);
    assert_eq!(b_out.reads(), 1);
    assert!(!a_listen.line_level());
}
