//! Pure burst state machine driven by the interrupt sequencer.
//!
//! Transitions take the current state by value and return the next one along
//! with the [`Step`] the sequencer must carry out on the hardware. Nothing
//! here touches a register, so every path is testable on the host.

use platform::Selector;

use crate::burst::{BurstProgress, PacketBurst};
use crate::error::{LinkError, LinkErrors};

/// Sequencer-owned state of one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    /// Configured, nothing in flight
    #[default]
    Idle,
    /// Burst in flight
    Active(BurstProgress),
    /// Last burst finished; further packets are ignored until re-armed
    Completed,
    /// Last burst aborted; further packets are discarded until re-armed
    Error(LinkErrors),
}

/// Hardware verdict on one completed packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketVerdict {
    /// Received (or sent) without fault
    Clean,
    /// Faults reported for this packet
    Faulty(LinkErrors),
}

/// Register action required after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Step {
    /// Advance half `used` to its next packet; `next` carries the next packet.
    Continue {
        /// Half the finished packet used
        used: Selector,
        /// Half the next packet uses
        next: Selector,
    },
    /// Last packet done: restore burst-start addresses.
    Finished {
        /// Half the last packet used
        used: Selector,
    },
    /// Burst aborted: restore burst-start addresses.
    Aborted(LinkErrors),
    /// Packet outside an active burst; nothing to do.
    Ignored,
}

impl LinkState {
    /// Arm a new burst.
    pub fn on_start(self) -> Result<Self, LinkError> {
        match self {
            Self::Idle | Self::Completed => Ok(Self::Active(BurstProgress::start())),
            Self::Active(_) => Err(LinkError::BurstInFlight),
            Self::Error(_) => Err(LinkError::ErrorPending),
        }
    }

    /// One packet completed with `verdict`.
    pub fn on_packet(self, burst: &PacketBurst, verdict: PacketVerdict) -> (Self, Step) {
        let Self::Active(progress) = self else {
            return (self, Step::Ignored);
        };
        match verdict {
            PacketVerdict::Faulty(errors) if !errors.is_empty() => (Self::Error(errors), Step::Aborted(errors)),
            PacketVerdict::Clean | PacketVerdict::Faulty(_) => {
                let used = progress.selector;
                let progress = progress.advance();
                if progress.packets >= burst.packets() {
                    (Self::Completed, Step::Finished { used })
                } else {
                    (
                        Self::Active(progress),
                        Step::Continue {
                            used,
                            next: progress.selector,
                        },
                    )
                }
            }
        }
    }

    /// A fault not tied to a packet (FIFO overflow under the Abort policy).
    ///
    /// Aborts an active burst and supersedes a pending completion. An error
    /// already latched absorbs the new kinds.
    pub fn on_fault(self, errors: LinkErrors) -> (Self, Step) {
        match self {
            Self::Idle => (self, Step::Ignored),
            Self::Error(prev) => (Self::Error(prev | errors), Step::Ignored),
            Self::Active(_) | Self::Completed => (Self::Error(errors), Step::Aborted(errors)),
        }
    }

    /// Back to Idle (configure, reset).
    #[must_use]
    pub const fn on_reset(self) -> Self {
        Self::Idle
    }

    /// True while a burst is in flight.
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn burst(n: u16) -> PacketBurst {
        PacketBurst::new(512, n).unwrap()
    }

    #[test]
    fn clean_packets_alternate_then_finish() {
        let b = burst(3);
        let s = LinkState::Idle.on_start().unwrap();
        let (s, step) = s.on_packet(&b, PacketVerdict::Clean);
        assert_eq!(
            step,
            Step::Continue {
                used: Selector::Zero,
                next: Selector::One
            }
        );
        let (s, step) = s.on_packet(&b, PacketVerdict::Clean);
        assert_eq!(
            step,
            Step::Continue {
                used: Selector::One,
                next: Selector::Zero
            }
        );
        let (s, step) = s.on_packet(&b, PacketVerdict::Clean);
        assert_eq!(step, Step::Finished { used: Selector::Zero });
        assert_eq!(s, LinkState::Completed);
    }

    #[test]
    fn faulty_packet_aborts_and_later_packets_are_ignored() {
        let b = burst(64);
        let s = LinkState::Idle.on_start().unwrap();
        let (s, _) = s.on_packet(&b, PacketVerdict::Clean);
        let (s, step) = s.on_packet(&b, PacketVerdict::Faulty(LinkErrors::CRC));
        assert_eq!(step, Step::Aborted(LinkErrors::CRC));
        let (s, step) = s.on_packet(&b, PacketVerdict::Clean);
        assert_eq!(step, Step::Ignored);
        assert_eq!(s, LinkState::Error(LinkErrors::CRC));
        assert_eq!(s.on_start(), Err(LinkError::ErrorPending));
    }

    #[test]
    fn fault_supersedes_completion() {
        let (s, step) = LinkState::Completed.on_fault(LinkErrors::FIFO);
        assert_eq!(step, Step::Aborted(LinkErrors::FIFO));
        let (s, _) = s.on_fault(LinkErrors::SEQ);
        assert_eq!(s, LinkState::Error(LinkErrors::FIFO | LinkErrors::SEQ));
    }

    #[test]
    fn cannot_start_twice() {
        let s = LinkState::Idle.on_start().unwrap();
        assert_eq!(s.on_start(), Err(LinkError::BurstInFlight));
        assert_eq!(s.on_reset(), LinkState::Idle);
    }
}
