use crate::dao::models::ParticipantEntity;
use crate::state::state_machine::SessionPhase;

/// Why a buzz attempt was turned down. Rejections are ordinary outcomes
/// reported back to the caller, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The buzz window is not open (or not open yet for this participant).
    WindowClosed,
    /// No participant with this identity joined the session.
    UnknownIdentity,
    /// The participant already holds a rank in the current window.
    AlreadyBuzzed,
}

/// Outcome of arbitrating one buzz attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuzzDecision {
    /// The buzz wins the next rank; the counter has already moved on.
    Accepted {
        /// 1-based position within the current buzz window.
        rank: u32,
    },
    /// The buzz is turned down; retries get the same answer.
    Rejected {
        /// Why the attempt was rejected.
        reason: RejectReason,
    },
}

/// Sole authority converting racing buzz attempts into a deterministic order.
///
/// The arbiter must only ever be consulted while the per-session gate is
/// held: that single serialization point is what turns "simultaneous" buzz
/// attempts into a strict, reproducible 1st/2nd ordering. Ranks come from a
/// window-scoped counter rather than wall-clock timestamps, so clock skew can
/// never produce ties.
#[derive(Debug)]
pub struct BuzzArbiter {
    next_rank: u32,
}

impl Default for BuzzArbiter {
    fn default() -> Self {
        Self { next_rank: 1 }
    }
}

impl BuzzArbiter {
    /// Arbiter for a fresh buzz window, starting at rank 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether a buzz attempt is accepted and assign its rank.
    ///
    /// Checks run in order: the window must be open, the identity must be
    /// known and eligible for the current generation, and the participant
    /// must not have buzzed yet. An accepted attempt consumes the next rank
    /// immediately: once a rank is handed out it is never handed out again
    /// in the same window, even if the caller later fails to persist the
    /// record.
    pub fn try_register(
        &mut self,
        phase: SessionPhase,
        generation: u64,
        participant: Option<&ParticipantEntity>,
    ) -> BuzzDecision {
        if phase != SessionPhase::BuzzWindow {
            return BuzzDecision::Rejected {
                reason: RejectReason::WindowClosed,
            };
        }

        let Some(participant) = participant else {
            return BuzzDecision::Rejected {
                reason: RejectReason::UnknownIdentity,
            };
        };

        // Joined while this window was already open: their window has not
        // opened yet.
        if participant.eligible_generation > generation {
            return BuzzDecision::Rejected {
                reason: RejectReason::WindowClosed,
            };
        }

        if participant.buzzed {
            return BuzzDecision::Rejected {
                reason: RejectReason::AlreadyBuzzed,
            };
        }

        let rank = self.next_rank;
        self.next_rank += 1;
        BuzzDecision::Accepted { rank }
    }

    /// Rewind the counter for the next buzz window.
    pub fn reset(&mut self) {
        self.next_rank = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::models::ParticipantEntity;

    fn participant(identity: &str) -> ParticipantEntity {
        ParticipantEntity::new(identity.into(), 0)
    }

    fn buzzed(identity: &str, rank: u32) -> ParticipantEntity {
        let mut entity = participant(identity);
        entity.buzzed = true;
        entity.rank = Some(rank);
        entity
    }

    #[test]
    fn rejects_when_window_is_closed() {
        let mut arbiter = BuzzArbiter::new();
        let alice = participant("alice");

        for phase in [SessionPhase::Idle, SessionPhase::Countdown { remaining: 2 }] {
            assert_eq!(
                arbiter.try_register(phase, 0, Some(&alice)),
                BuzzDecision::Rejected {
                    reason: RejectReason::WindowClosed
                }
            );
        }
    }

    #[test]
    fn rejects_unknown_identity() {
        let mut arbiter = BuzzArbiter::new();
        assert_eq!(
            arbiter.try_register(SessionPhase::BuzzWindow, 0, None),
            BuzzDecision::Rejected {
                reason: RejectReason::UnknownIdentity
            }
        );
    }

    #[test]
    fn rejects_repeat_buzzes_deterministically() {
        let mut arbiter = BuzzArbiter::new();
        let alice = buzzed("alice", 1);

        // Every retry gets the same answer, no matter how often it arrives.
        for _ in 0..3 {
            assert_eq!(
                arbiter.try_register(SessionPhase::BuzzWindow, 0, Some(&alice)),
                BuzzDecision::Rejected {
                    reason: RejectReason::AlreadyBuzzed
                }
            );
        }
    }

    #[test]
    fn mid_window_joiner_waits_for_the_next_window() {
        let mut arbiter = BuzzArbiter::new();
        let late = ParticipantEntity::new("dave".into(), 1);

        assert_eq!(
            arbiter.try_register(SessionPhase::BuzzWindow, 0, Some(&late)),
            BuzzDecision::Rejected {
                reason: RejectReason::WindowClosed
            }
        );

        // After the next reset the generation catches up and the buzz counts.
        assert_eq!(
            arbiter.try_register(SessionPhase::BuzzWindow, 1, Some(&late)),
            BuzzDecision::Accepted { rank: 1 }
        );
    }

    #[test]
    fn ranks_are_contiguous_from_one() {
        let mut arbiter = BuzzArbiter::new();

        for (index, identity) in ["alice", "bob", "carol"].iter().enumerate() {
            let entity = participant(identity);
            let decision = arbiter.try_register(SessionPhase::BuzzWindow, 0, Some(&entity));
            assert_eq!(
                decision,
                BuzzDecision::Accepted {
                    rank: index as u32 + 1
                }
            );
        }
    }

    #[test]
    fn a_handed_out_rank_is_never_reissued() {
        let mut arbiter = BuzzArbiter::new();
        let alice = participant("alice");
        let bob = participant("bob");

        assert_eq!(
            arbiter.try_register(SessionPhase::BuzzWindow, 0, Some(&alice)),
            BuzzDecision::Accepted { rank: 1 }
        );

        // Even if alice's record never landed, bob cannot receive rank 1.
        assert_eq!(
            arbiter.try_register(SessionPhase::BuzzWindow, 0, Some(&bob)),
            BuzzDecision::Accepted { rank: 2 }
        );
    }

    #[test]
    fn replaying_the_same_arrival_order_reproduces_ranks() {
        let arrival = ["carol", "alice", "bob"];

        let run = || {
            let mut arbiter = BuzzArbiter::new();
            arrival
                .iter()
                .map(|identity| {
                    let entity = participant(identity);
                    arbiter.try_register(SessionPhase::BuzzWindow, 0, Some(&entity))
                })
                .collect::<Vec<_>>()
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn reset_rewinds_the_counter() {
        let mut arbiter = BuzzArbiter::new();
        let alice = participant("alice");

        assert_eq!(
            arbiter.try_register(SessionPhase::BuzzWindow, 0, Some(&alice)),
            BuzzDecision::Accepted { rank: 1 }
        );
        arbiter.reset();

        assert_eq!(
            arbiter.try_register(SessionPhase::BuzzWindow, 1, Some(&alice)),
            BuzzDecision::Accepted { rank: 1 }
        );
    }
}
