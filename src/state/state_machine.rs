use std::time::Instant;

use thiserror::Error;
use uuid::Uuid;

/// Lifecycle phases of a buzzer session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Nothing running; the admin can start a countdown.
    Idle,
    /// Countdown in progress; buzzers are still disarmed.
    Countdown {
        /// Ticks left before the buzz window opens.
        remaining: u8,
    },
    /// Buzz window is open; the arbiter accepts buzzes.
    BuzzWindow,
}

/// Events that can be applied to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Admin starts the countdown with the configured number of ticks.
    StartCountdown {
        /// Number of ticks the countdown runs before the window opens.
        ticks: u8,
    },
    /// The countdown timer advances by one tick.
    Tick,
    /// Admin resets the session back to idle.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Errors that can occur when planning a state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    /// A transition is already pending and must be applied or aborted.
    AlreadyPending,
    /// The requested transition is not valid from the current phase.
    InvalidTransition(InvalidTransition),
}

/// Errors that can occur when applying a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
    /// State machine phase changed since the plan was created.
    PhaseMismatch {
        /// Phase when plan was created.
        expected: SessionPhase,
        /// Current phase.
        actual: SessionPhase,
    },
    /// State machine version changed since the plan was created.
    VersionMismatch {
        /// Version when plan was created.
        expected: usize,
        /// Current version.
        actual: usize,
    },
}

/// Errors that can occur when aborting a planned state machine transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AbortError {
    /// No transition is currently pending.
    NoPending,
    /// Plan ID does not match the pending plan.
    IdMismatch {
        /// Expected plan ID.
        expected: PlanId,
        /// Provided plan ID.
        got: PlanId,
    },
}

/// Unique identifier for a planned state transition.
pub type PlanId = Uuid;

/// A planned state machine transition that has been validated but not yet applied.
#[derive(Debug, Clone)]
pub struct Plan {
    /// Unique identifier for this plan.
    pub id: PlanId,
    /// Phase the state machine is currently in.
    pub from: SessionPhase,
    /// Phase the state machine will transition to.
    pub to: SessionPhase,
    /// Event that triggered this transition.
    pub event: SessionEvent,
    /// Version number after applying this transition.
    pub version_next: usize,
    /// Timestamp when this plan was created.
    pub pending_since: Instant,
}

/// Snapshot of the current state machine state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Current phase of the state machine.
    pub phase: SessionPhase,
    /// Version number of the state machine (increments on each transition).
    pub version: usize,
    /// Reset generation (increments on each applied reset).
    pub generation: u64,
    /// Pending transition phase, if a transition is planned but not yet applied.
    pub pending: Option<SessionPhase>,
}

/// State machine owning the countdown/buzz-window lifecycle of one session.
///
/// Mutations follow a plan/apply/abort protocol: a transition is first
/// validated and parked as a [`Plan`], the associated side effects (store
/// writes) run, and only then is the plan applied. A failed side effect
/// aborts the plan and leaves the phase untouched.
#[derive(Debug, Clone)]
pub struct SessionStateMachine {
    phase: SessionPhase,
    version: usize,
    generation: u64,
    pending: Option<Plan>,
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            version: 0,
            generation: 0,
            pending: None,
        }
    }
}

impl SessionStateMachine {
    /// Create a new state machine initialised in the idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Current reset generation. Timers capture this value when they start
    /// and become no-ops once it moves on.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Monotonic version, bumped on every applied transition. Clients use it
    /// to discard stale snapshots.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Create a snapshot of the current state machine state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            version: self.version,
            generation: self.generation,
            pending: self.pending.as_ref().map(|plan| plan.to),
        }
    }

    /// Plan a transition by validating that the event can be applied from the current phase.
    /// Returns a Plan that can later be applied or aborted.
    pub fn plan(&mut self, event: SessionEvent) -> Result<Plan, PlanError> {
        if self.pending.is_some() {
            return Err(PlanError::AlreadyPending);
        }

        let next = self
            .compute_transition(event)
            .map_err(PlanError::InvalidTransition)?;

        let plan = Plan {
            id: Uuid::new_v4(),
            from: self.phase,
            to: next,
            event,
            version_next: self.version + 1,
            pending_since: Instant::now(),
        };

        self.pending = Some(plan.clone());

        Ok(plan)
    }

    /// Apply a planned transition, moving the state machine to the next phase.
    /// Returns the new phase after the transition.
    pub fn apply(&mut self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let plan = self.pending.take().ok_or(ApplyError::NoPending)?;

        if plan.id != plan_id {
            let expected_plan_id = plan.id;
            self.pending = Some(plan);
            return Err(ApplyError::IdMismatch {
                expected: expected_plan_id,
                got: plan_id,
            });
        }

        if self.phase != plan.from {
            return Err(ApplyError::PhaseMismatch {
                expected: plan.from,
                actual: self.phase,
            });
        }

        if self.version + 1 != plan.version_next {
            return Err(ApplyError::VersionMismatch {
                expected: plan.version_next,
                actual: self.version + 1,
            });
        }

        self.phase = plan.to;
        self.version = plan.version_next;
        if plan.event == SessionEvent::Reset {
            self.generation += 1;
        }
        self.pending = None;

        Ok(self.phase)
    }

    /// Abort a planned transition without applying it, returning the state machine to its previous state.
    pub fn abort(&mut self, plan_id: PlanId) -> Result<(), AbortError> {
        let plan = self.pending.as_ref().ok_or(AbortError::NoPending)?;

        if plan.id != plan_id {
            return Err(AbortError::IdMismatch {
                expected: plan.id,
                got: plan_id,
            });
        }

        self.pending = None;
        Ok(())
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase, event) {
            (SessionPhase::Idle, SessionEvent::StartCountdown { ticks }) => {
                if ticks == 0 {
                    SessionPhase::BuzzWindow
                } else {
                    SessionPhase::Countdown { remaining: ticks }
                }
            }
            (SessionPhase::Countdown { remaining }, SessionEvent::Tick) => {
                if remaining > 1 {
                    SessionPhase::Countdown {
                        remaining: remaining - 1,
                    }
                } else {
                    SessionPhase::BuzzWindow
                }
            }
            // A tick that lands after the window already opened stays put, so
            // repeated ticks past expiry never produce a second transition.
            (SessionPhase::BuzzWindow, SessionEvent::Tick) => SessionPhase::BuzzWindow,
            (_, SessionEvent::Reset) => SessionPhase::Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut SessionStateMachine, event: SessionEvent) -> SessionPhase {
        let plan = sm.plan(event).unwrap();
        sm.apply(plan.id).unwrap()
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = SessionStateMachine::new();
        assert_eq!(sm.phase(), SessionPhase::Idle);
        assert_eq!(sm.generation(), 0);
    }

    #[test]
    fn full_cycle_through_countdown_and_window() {
        let mut sm = SessionStateMachine::new();

        assert_eq!(
            apply(&mut sm, SessionEvent::StartCountdown { ticks: 3 }),
            SessionPhase::Countdown { remaining: 3 }
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::Tick),
            SessionPhase::Countdown { remaining: 2 }
        );
        assert_eq!(
            apply(&mut sm, SessionEvent::Tick),
            SessionPhase::Countdown { remaining: 1 }
        );
        assert_eq!(apply(&mut sm, SessionEvent::Tick), SessionPhase::BuzzWindow);
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionPhase::Idle);
    }

    #[test]
    fn double_start_is_rejected_not_queued() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::StartCountdown { ticks: 3 });

        let err = sm
            .plan(SessionEvent::StartCountdown { ticks: 3 })
            .unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, SessionPhase::Countdown { remaining: 3 });
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn start_during_window_is_rejected() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::StartCountdown { ticks: 1 });
        apply(&mut sm, SessionEvent::Tick);
        assert_eq!(sm.phase(), SessionPhase::BuzzWindow);

        assert!(matches!(
            sm.plan(SessionEvent::StartCountdown { ticks: 3 }),
            Err(PlanError::InvalidTransition(_))
        ));
    }

    #[test]
    fn tick_after_expiry_is_idempotent() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::StartCountdown { ticks: 1 });
        assert_eq!(apply(&mut sm, SessionEvent::Tick), SessionPhase::BuzzWindow);

        // Ticks landing after the window opened keep the phase unchanged.
        assert_eq!(apply(&mut sm, SessionEvent::Tick), SessionPhase::BuzzWindow);
        assert_eq!(apply(&mut sm, SessionEvent::Tick), SessionPhase::BuzzWindow);
    }

    #[test]
    fn tick_while_idle_is_invalid() {
        let mut sm = SessionStateMachine::new();
        let err = sm.plan(SessionEvent::Tick).unwrap_err();
        match err {
            PlanError::InvalidTransition(invalid) => {
                assert_eq!(invalid.from, SessionPhase::Idle);
                assert_eq!(invalid.event, SessionEvent::Tick);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reset_aborts_a_running_countdown() {
        let mut sm = SessionStateMachine::new();
        apply(&mut sm, SessionEvent::StartCountdown { ticks: 3 });
        apply(&mut sm, SessionEvent::Tick);
        assert_eq!(apply(&mut sm, SessionEvent::Reset), SessionPhase::Idle);
    }

    #[test]
    fn reset_bumps_the_generation() {
        let mut sm = SessionStateMachine::new();
        assert_eq!(sm.generation(), 0);

        apply(&mut sm, SessionEvent::StartCountdown { ticks: 1 });
        assert_eq!(sm.generation(), 0);

        apply(&mut sm, SessionEvent::Reset);
        assert_eq!(sm.generation(), 1);

        // Reset is legal from idle too and still advances the generation.
        apply(&mut sm, SessionEvent::Reset);
        assert_eq!(sm.generation(), 2);
    }

    #[test]
    fn zero_tick_countdown_opens_the_window_immediately() {
        let mut sm = SessionStateMachine::new();
        assert_eq!(
            apply(&mut sm, SessionEvent::StartCountdown { ticks: 0 }),
            SessionPhase::BuzzWindow
        );
    }

    #[test]
    fn version_increments_on_every_applied_transition() {
        let mut sm = SessionStateMachine::new();
        assert_eq!(sm.snapshot().version, 0);

        apply(&mut sm, SessionEvent::StartCountdown { ticks: 2 });
        assert_eq!(sm.snapshot().version, 1);
        apply(&mut sm, SessionEvent::Tick);
        assert_eq!(sm.snapshot().version, 2);
    }

    #[test]
    fn abort_clears_pending() {
        let mut sm = SessionStateMachine::new();
        let plan = sm.plan(SessionEvent::StartCountdown { ticks: 3 }).unwrap();
        sm.abort(plan.id).unwrap();
        assert!(sm.snapshot().pending.is_none());
        assert_eq!(sm.phase(), SessionPhase::Idle);
    }

    #[test]
    fn plan_while_pending_is_rejected() {
        let mut sm = SessionStateMachine::new();
        let _plan = sm.plan(SessionEvent::StartCountdown { ticks: 3 }).unwrap();
        assert_eq!(
            sm.plan(SessionEvent::Reset).unwrap_err(),
            PlanError::AlreadyPending
        );
    }
}
