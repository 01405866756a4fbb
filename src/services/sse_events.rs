use std::sync::Arc;

use serde::Serialize;
use tracing::warn;

use crate::{
    dto::{
        common::PhaseSnapshot,
        sse::{
            BuzzAcceptedEvent, ParticipantJoinedEvent, PhaseChangedEvent, ServerEvent,
            SessionResetEvent, SystemStatus,
        },
    },
    state::{SessionState, SharedState, Transition},
};

const EVENT_PHASE_CHANGED: &str = "phase_changed";
const EVENT_PARTICIPANT_JOINED: &str = "participant.joined";
const EVENT_BUZZ_ACCEPTED: &str = "buzz.accepted";
const EVENT_SESSION_RESET: &str = "session.reset";
const EVENT_SYSTEM_STATUS: &str = "system_status";

/// Broadcast a session phase change notification with its ordering markers.
pub fn broadcast_phase_changed(session: &Arc<SessionState>, transition: &Transition) {
    let payload = PhaseChangedEvent(PhaseSnapshot::from(transition));
    send_session_event(session, EVENT_PHASE_CHANGED, &payload);
}

/// Broadcast that a new participant joined the session.
pub fn broadcast_participant_joined(session: &Arc<SessionState>, identity: &str) {
    let payload = ParticipantJoinedEvent {
        identity: identity.to_string(),
    };
    send_session_event(session, EVENT_PARTICIPANT_JOINED, &payload);
}

/// Broadcast an accepted buzz together with its rank.
pub fn broadcast_buzz_accepted(session: &Arc<SessionState>, identity: &str, rank: u32) {
    let payload = BuzzAcceptedEvent {
        identity: identity.to_string(),
        rank,
    };
    send_session_event(session, EVENT_BUZZ_ACCEPTED, &payload);
}

/// Broadcast that the session was reset to idle.
pub fn broadcast_session_reset(session: &Arc<SessionState>, generation: u64) {
    let payload = SessionResetEvent { generation };
    send_session_event(session, EVENT_SESSION_RESET, &payload);
}

/// Fan the degraded flag out to every live session stream.
pub fn broadcast_system_status(state: &SharedState, degraded: bool) {
    let payload = SystemStatus { degraded };
    for session in state.sessions() {
        send_session_event(&session, EVENT_SYSTEM_STATUS, &payload);
    }
}

fn send_session_event(session: &Arc<SessionState>, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => session.sse().broadcast(event),
        Err(err) => warn!(
            session_id = %session.id(),
            event,
            error = %err,
            "failed to serialize SSE payload"
        ),
    }
}
