use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::SessionPhase;

/// Publicly visible session phase exposed to clients (REST/SSE).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleSessionPhase {
    /// No countdown running; waiting for the admin.
    Idle,
    /// Countdown in progress, buzzers still disarmed.
    Countdown,
    /// Buzz window open, first buzz wins.
    BuzzWindow,
}

impl From<&SessionPhase> for VisibleSessionPhase {
    fn from(value: &SessionPhase) -> Self {
        match value {
            SessionPhase::Idle => VisibleSessionPhase::Idle,
            SessionPhase::Countdown { .. } => VisibleSessionPhase::Countdown,
            SessionPhase::BuzzWindow => VisibleSessionPhase::BuzzWindow,
        }
    }
}
