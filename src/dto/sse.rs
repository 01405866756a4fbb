use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::common::PhaseSnapshot;

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// Optional SSE event name.
    pub event: Option<String>,
    /// Serialized payload placed in the SSE data field.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from a pre-rendered data string.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
    /// Snapshot of the session phase at subscription time.
    pub snapshot: PhaseSnapshot,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// Whether the storage backend is currently unreachable.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever the session phase changes.
pub struct PhaseChangedEvent(pub PhaseSnapshot);

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted when a new participant joined the session.
pub struct ParticipantJoinedEvent {
    /// Identity of the new participant.
    pub identity: String,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted when a buzz has been accepted and ranked.
pub struct BuzzAcceptedEvent {
    /// Identity whose buzz was accepted.
    pub identity: String,
    /// Rank the buzz received.
    pub rank: u32,
}

#[derive(Debug, Serialize, ToSchema)]
/// Event emitted after the admin reset the session.
pub struct SessionResetEvent {
    /// Reset generation after the reset.
    pub generation: u64,
}
