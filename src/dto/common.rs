use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::phase::VisibleSessionPhase,
    state::{Snapshot, Transition, state_machine::SessionPhase},
};

/// Shared snapshot describing the current session phase.
///
/// `version` is monotonic across all transitions of a session; clients that
/// receive snapshots out of order keep the one with the highest version.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct PhaseSnapshot {
    /// Current phase of the session.
    pub phase: VisibleSessionPhase,
    /// Ticks left before the window opens; present during countdown only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub countdown_remaining: Option<u8>,
    /// Monotonic state machine version.
    pub version: usize,
    /// Reset generation.
    pub generation: u64,
}

impl PhaseSnapshot {
    fn build(phase: &SessionPhase, version: usize, generation: u64) -> Self {
        let countdown_remaining = match phase {
            SessionPhase::Countdown { remaining } => Some(*remaining),
            _ => None,
        };
        Self {
            phase: phase.into(),
            countdown_remaining,
            version,
            generation,
        }
    }
}

impl From<&Snapshot> for PhaseSnapshot {
    fn from(value: &Snapshot) -> Self {
        Self::build(&value.phase, value.version, value.generation)
    }
}

impl From<&Transition> for PhaseSnapshot {
    fn from(value: &Transition) -> Self {
        Self::build(&value.to, value.version, value.generation)
    }
}
