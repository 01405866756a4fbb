//! DTO definitions for the participant-facing session API.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{BuzzRecordEntity, ParticipantEntity},
    dto::{common::PhaseSnapshot, format_system_time, validation::validate_identity},
    state::arbiter::{BuzzDecision, RejectReason},
};

/// Payload presented by a caller to register in a session.
#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    /// Unique identity the caller wants to claim within the session.
    pub identity: String,
}

impl Validate for JoinRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_identity(&self.identity) {
            errors.add("identity", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Confirmation returned when a participant joined a session.
#[derive(Debug, Serialize, ToSchema)]
pub struct JoinResponse {
    /// The registered identity.
    pub identity: String,
    /// True when the participant joined while a window was already open and
    /// can only buzz starting with the next round.
    pub active_from_next_window: bool,
}

/// Payload presented by a caller attempting to buzz.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BuzzRequest {
    /// Identity of the buzzing participant.
    pub identity: String,
}

impl Validate for BuzzRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        if let Err(e) = validate_identity(&self.identity) {
            errors.add("identity", e);
        }
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Why a buzz attempt was turned down, as exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuzzRejectReason {
    /// The buzz window is not open (or not open yet for this participant).
    WindowClosed,
    /// No participant with this identity joined the session.
    UnknownIdentity,
    /// The participant already holds a rank in this window.
    AlreadyBuzzed,
}

impl From<RejectReason> for BuzzRejectReason {
    fn from(value: RejectReason) -> Self {
        match value {
            RejectReason::WindowClosed => BuzzRejectReason::WindowClosed,
            RejectReason::UnknownIdentity => BuzzRejectReason::UnknownIdentity,
            RejectReason::AlreadyBuzzed => BuzzRejectReason::AlreadyBuzzed,
        }
    }
}

/// Outcome of a buzz attempt. Rejections are ordinary responses, not errors.
#[derive(Debug, Serialize, ToSchema)]
pub struct BuzzResponse {
    /// Whether the buzz was accepted.
    pub accepted: bool,
    /// Rank assigned to the accepted buzz.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    /// Why the buzz was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<BuzzRejectReason>,
}

impl From<BuzzDecision> for BuzzResponse {
    fn from(value: BuzzDecision) -> Self {
        match value {
            BuzzDecision::Accepted { rank } => Self {
                accepted: true,
                rank: Some(rank),
                reason: None,
            },
            BuzzDecision::Rejected { reason } => Self {
                accepted: false,
                rank: None,
                reason: Some(reason.into()),
            },
        }
    }
}

/// One row of the leaderboard.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardEntry {
    /// 1-based position in the current window.
    pub rank: u32,
    /// Identity of the participant.
    pub identity: String,
    /// When the buzz was accepted (RFC 3339).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buzzed_at: Option<String>,
}

impl From<&ParticipantEntity> for LeaderboardEntry {
    fn from(value: &ParticipantEntity) -> Self {
        Self {
            rank: value.rank.unwrap_or_default(),
            identity: value.identity.clone(),
            buzzed_at: value.buzzed_at.map(format_system_time),
        }
    }
}

/// Ordered projection of all accepted buzzes in the current window.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    /// Entries sorted ascending by rank.
    pub entries: Vec<LeaderboardEntry>,
}

/// Buzz status of the identity that asked for the session state.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantStatus {
    /// The queried identity.
    pub identity: String,
    /// Whether this participant already buzzed in the current window.
    pub buzzed: bool,
    /// Rank held by this participant, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

/// Query parameters of the session state view.
#[derive(Debug, Deserialize, IntoParams)]
pub struct StateQuery {
    /// Identity whose buzz status should be included in the response.
    pub identity: Option<String>,
}

/// Current session state as seen by one caller, so a client can disable its
/// own buzz control without racing the server.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionStateResponse {
    /// Phase snapshot with its ordering markers.
    pub snapshot: PhaseSnapshot,
    /// Status of the caller's identity, when one was provided.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant: Option<ParticipantStatus>,
}

/// One entry of the admin buzz history view.
#[derive(Debug, Serialize, ToSchema)]
pub struct BuzzHistoryEntry {
    /// Identity whose buzz was recorded.
    pub identity: String,
    /// Rank the buzz received in its window.
    pub rank: u32,
    /// When the record was created (RFC 3339).
    pub recorded_at: String,
}

impl From<BuzzRecordEntity> for BuzzHistoryEntry {
    fn from(value: BuzzRecordEntity) -> Self {
        Self {
            identity: value.identity,
            rank: value.rank,
            recorded_at: format_system_time(value.recorded_at),
        }
    }
}
