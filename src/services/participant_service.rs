use std::time::SystemTime;

use tracing::{info, warn};
use validator::Validate;

use crate::{
    dao::{
        models::{BuzzRecordEntity, ParticipantEntity},
        session_store::SessionId,
    },
    dto::{
        common::PhaseSnapshot,
        session::{
            BuzzRequest, BuzzResponse, JoinRequest, JoinResponse, LeaderboardEntry,
            LeaderboardResponse, ParticipantStatus, SessionStateResponse,
        },
    },
    error::ServiceError,
    services::{sse_events, store_ops},
    state::{SharedState, arbiter::BuzzDecision, state_machine::SessionPhase},
};

/// Register a caller in a session under a unique identity.
///
/// Runs under the session gate so two racing joins of the same identity
/// cannot both succeed. Joining while the buzz window is already open is
/// allowed but only counts from the next window on.
pub async fn join(
    state: &SharedState,
    session_id: SessionId,
    request: JoinRequest,
) -> Result<JoinResponse, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let session = state.require_session(session_id)?;
    let store = state.require_session_store().await?;
    let config = state.config();
    let identity = request.identity;

    let _gate = session.exclusive().await;
    let snapshot = session.snapshot().await;

    let existing = store_ops::with_retry(config, "get_participant", || {
        store.get_participant(session_id, identity.clone())
    })
    .await?;
    if existing.is_some() {
        return Err(ServiceError::IdentityTaken(identity));
    }

    let active_from_next_window = snapshot.phase == SessionPhase::BuzzWindow;
    let eligible_generation = if active_from_next_window {
        snapshot.generation + 1
    } else {
        snapshot.generation
    };

    let participant = ParticipantEntity::new(identity.clone(), eligible_generation);
    store_ops::with_retry(config, "set_participant", || {
        store.set_participant(session_id, participant.clone())
    })
    .await?;

    sse_events::broadcast_participant_joined(&session, &identity);
    info!(session_id = %session_id, identity = %identity, "participant joined");

    Ok(JoinResponse {
        identity: participant.identity,
        active_from_next_window,
    })
}

/// Submit a buzz attempt and return its arbitration outcome.
///
/// The whole read-decide-persist sequence holds the session gate: that single
/// serialization point is what gives two "simultaneous" buzzes a strict,
/// reproducible ordering. Rejections come back as ordinary responses.
pub async fn buzz(
    state: &SharedState,
    session_id: SessionId,
    request: BuzzRequest,
) -> Result<BuzzResponse, ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;

    let session = state.require_session(session_id)?;
    let store = state.require_session_store().await?;
    let config = state.config();
    let identity = request.identity;

    let _gate = session.exclusive().await;
    let snapshot = session.snapshot().await;

    let participant = store_ops::with_retry(config, "get_participant", || {
        store.get_participant(session_id, identity.clone())
    })
    .await?;

    let decision = {
        let mut arbiter = session.arbiter().write().await;
        arbiter.try_register(snapshot.phase, snapshot.generation, participant.as_ref())
    };

    if let (BuzzDecision::Accepted { rank }, Some(mut entity)) = (decision, participant) {
        let now = SystemTime::now();
        entity.buzzed = true;
        entity.rank = Some(rank);
        entity.buzzed_at = Some(now);

        let persisted = async {
            store_ops::with_retry(config, "set_participant", || {
                store.set_participant(session_id, entity.clone())
            })
            .await?;
            store_ops::with_retry(config, "append_buzz_record", || {
                store.append_buzz_record(
                    session_id,
                    BuzzRecordEntity {
                        identity: entity.identity.clone(),
                        rank,
                        recorded_at: now,
                    },
                )
            })
            .await
        }
        .await;

        if let Err(err) = persisted {
            // The rank stays consumed: a gap is acceptable, a duplicate is not.
            warn!(
                session_id = %session_id,
                identity = %entity.identity,
                rank,
                "failed to persist accepted buzz; its rank is abandoned"
            );
            return Err(err);
        }

        sse_events::broadcast_buzz_accepted(&session, &entity.identity, rank);
        info!(session_id = %session_id, identity = %entity.identity, rank, "buzz accepted");
    }

    Ok(decision.into())
}

/// Ordered projection of all accepted buzzes in the current window.
pub async fn leaderboard(
    state: &SharedState,
    session_id: SessionId,
) -> Result<LeaderboardResponse, ServiceError> {
    let session = state.require_session(session_id)?;
    let store = state.require_session_store().await?;

    let _gate = session.shared().await;
    let participants = store_ops::with_retry(state.config(), "list_participants", || {
        store.list_participants(session_id)
    })
    .await?;

    let mut buzzed: Vec<&ParticipantEntity> = participants
        .iter()
        .filter(|participant| participant.buzzed && participant.rank.is_some())
        .collect();
    buzzed.sort_by_key(|participant| participant.rank);

    Ok(LeaderboardResponse {
        entries: buzzed.into_iter().map(LeaderboardEntry::from).collect(),
    })
}

/// Current phase snapshot plus the caller's own buzz status, so a client can
/// disable its buzz control without racing the server.
pub async fn session_state(
    state: &SharedState,
    session_id: SessionId,
    identity: Option<String>,
) -> Result<SessionStateResponse, ServiceError> {
    let session = state.require_session(session_id)?;

    let _gate = session.shared().await;
    let snapshot = session.snapshot().await;

    let participant = match identity {
        Some(identity) => {
            let store = state.require_session_store().await?;
            let entity = store_ops::with_retry(state.config(), "get_participant", || {
                store.get_participant(session_id, identity.clone())
            })
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "identity `{identity}` is not registered in this session"
                ))
            })?;

            Some(ParticipantStatus {
                identity: entity.identity,
                buzzed: entity.buzzed,
                rank: entity.rank,
            })
        }
        None => None,
    };

    Ok(SessionStateResponse {
        snapshot: PhaseSnapshot::from(&snapshot),
        participant,
    })
}
