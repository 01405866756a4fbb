//! DTO definitions used by the admin REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::dto::common::PhaseSnapshot;

/// Response returned when a session is created; the token is the admin
/// capability and is only ever handed out here.
#[derive(Debug, Serialize, ToSchema)]
pub struct CreateSessionResponse {
    /// Identifier participants use to join.
    pub session_id: Uuid,
    /// Capability token required by every admin endpoint.
    pub admin_token: String,
}

/// Response emitted when the countdown starts.
#[derive(Debug, Serialize, ToSchema)]
pub struct StartCountdownResponse {
    /// Snapshot after the countdown transition.
    pub snapshot: PhaseSnapshot,
}

/// Response summarising an applied session reset.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResetSessionResponse {
    /// Reset generation after the reset; stale timers carry older values.
    pub generation: u64,
    /// How many participant records were touched by the reset.
    pub participants_cleared: usize,
}

/// Query parameters of the admin history view.
#[derive(Debug, Deserialize, IntoParams)]
pub struct HistoryQuery {
    /// Maximum number of records to return; defaults to the configured limit.
    pub limit: Option<usize>,
}
