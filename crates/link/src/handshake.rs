//! Board synchronization handshake.
//!
//! Two boards stacked back-to-back share two sync lines. The strap decides
//! which board is the initiator (RoleA, HSPI host); each board drives one
//! line high and waits for the peer to raise the other. Both lines return to
//! floating inputs afterwards so they can be reused.
//!
//! ```text
//!            RoleA                      RoleB
//!   pin_out  push-pull high ────────▶  pull-down input (polled)
//!   pin_in   pull-down input ◀──────── push-pull high
//! ```

use embedded_hal::digital::InputPin;
use platform::{FlexPin, PinMode, Timebase};

use crate::error::LinkError;
use crate::sequencer::Direction;

/// Role of this board on the link, fixed once the strap was read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BoardRole {
    /// Initiator, HSPI host (transmitter). Strap jumper absent.
    RoleA,
    /// Responder, HSPI device (receiver). Strap jumper fitted.
    RoleB,
}

impl BoardRole {
    /// Strap is pulled up; a fitted jumper pulls it low.
    pub const fn from_strap(high: bool) -> Self {
        if high {
            Self::RoleA
        } else {
            Self::RoleB
        }
    }

    /// HSPI direction this role takes.
    pub const fn direction(self) -> Direction {
        match self {
            Self::RoleA => Direction::Transmit,
            Self::RoleB => Direction::Receive,
        }
    }

    /// True for the initiator.
    pub const fn is_initiator(self) -> bool {
        matches!(self, Self::RoleA)
    }
}

impl core::fmt::Display for BoardRole {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::RoleA => write!(f, "RoleA (host)"),
            Self::RoleB => write!(f, "RoleB (device)"),
        }
    }
}

/// Result of [`synchronize`]. Produced once; never updated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HandshakeOutcome {
    /// Peer answered after `cycles` (always >= 1).
    Synchronized {
        /// Elected role
        role: BoardRole,
        /// Cycles spent waiting for the peer
        cycles: u64,
    },
    /// Peer never answered within the budget.
    Timeout {
        /// Role elected from the strap, usable to degrade
        role: BoardRole,
    },
}

impl HandshakeOutcome {
    /// Elected role, whether or not the peer answered.
    pub const fn role(&self) -> BoardRole {
        match *self {
            Self::Synchronized { role, .. } | Self::Timeout { role } => role,
        }
    }

    /// `Ok((role, cycles))`, or `HandshakeTimeout`.
    pub const fn into_result(self) -> Result<(BoardRole, u64), LinkError> {
        match self {
            Self::Synchronized { role, cycles } => Ok((role, cycles)),
            Self::Timeout { .. } => Err(LinkError::HandshakeTimeout),
        }
    }
}

/// Elect the role from `strap` and exchange the ready bit with the peer.
///
/// `hint` is used when the strap cannot be read. The wait is bounded by
/// `budget_cycles` of `timebase`; a timeout is not fatal.
pub fn synchronize<S, O, I, T>(
    strap: &mut S,
    pin_out: &mut O,
    pin_in: &mut I,
    hint: BoardRole,
    timebase: &T,
    budget_cycles: u64,
) -> HandshakeOutcome
where
    S: InputPin,
    O: FlexPin,
    I: FlexPin,
    T: Timebase,
{
    let role = strap.is_high().map_or(hint, BoardRole::from_strap);
    let waited = match role {
        BoardRole::RoleA => exchange(pin_out, pin_in, timebase, budget_cycles),
        BoardRole::RoleB => exchange(pin_in, pin_out, timebase, budget_cycles),
    };
    // Safe state regardless of the outcome.
    let released = pin_out.set_mode(PinMode::FloatingInput).is_ok() & pin_in.set_mode(PinMode::FloatingInput).is_ok();
    if !released {
        warn!("sync pins could not be released");
    }

    match waited {
        Some(cycles) => {
            info!("sync ok after {} cycles", cycles);
            HandshakeOutcome::Synchronized { role, cycles }
        }
        None => {
            warn!("sync timeout");
            HandshakeOutcome::Timeout { role }
        }
    }
}

/// Drive `drive` high and poll `listen` until it reads high.
fn exchange<D, L, T>(drive: &mut D, listen: &mut L, timebase: &T, budget_cycles: u64) -> Option<u64>
where
    D: FlexPin,
    L: FlexPin,
    T: Timebase,
{
    let ready = listen.set_mode(PinMode::PullDownInput).is_ok()
        && drive.set_low().is_ok()
        && drive.set_mode(PinMode::PushPullOutput).is_ok()
        && drive.set_high().is_ok();
    if !ready {
        return None;
    }

    let start = timebase.now_cycles();
    loop {
        let elapsed = timebase.elapsed_cycles(start);
        if elapsed >= budget_cycles {
            return None;
        }
        // A failed read counts as "not yet".
        if listen.is_high().unwrap_or(false) {
            return Some(elapsed.max(1));
        }
    }
}
