use std::time::SystemTime;

use tracing::{info, warn};

use crate::{
    config::ResetPolicy,
    dao::{models::SessionControlEntity, session_store::SessionId},
    dto::{
        admin::{CreateSessionResponse, ResetSessionResponse, StartCountdownResponse},
        common::PhaseSnapshot,
        session::BuzzHistoryEntry,
    },
    error::ServiceError,
    services::{countdown, sse_events, store_ops},
    state::{
        SessionState, SharedState,
        state_machine::{SessionEvent, SessionPhase},
        transitions,
    },
};

/// Register a fresh session and persist its initial control document. The
/// returned admin token is the capability for every admin operation on it.
pub async fn create_session(state: &SharedState) -> Result<CreateSessionResponse, ServiceError> {
    let store = state.require_session_store().await?;
    let session = state.create_session();
    let session_id = session.id();

    let persisted = store_ops::with_retry(state.config(), "set_control", || {
        store.set_control(session_id, SessionControlEntity::initial())
    })
    .await;

    if let Err(err) = persisted {
        state.remove_session(session_id);
        return Err(err);
    }

    info!(session_id = %session_id, "session created");

    Ok(CreateSessionResponse {
        session_id,
        admin_token: session.admin_token().to_owned(),
    })
}

/// Check the admin capability presented by a caller against the session's
/// token. Failures are logged since they are security-relevant.
pub fn authorize(session: &SessionState, provided: Option<&str>) -> Result<(), ServiceError> {
    match provided {
        Some(token) if token == session.admin_token() => Ok(()),
        Some(_) => {
            warn!(session_id = %session.id(), "admin request with wrong token");
            Err(ServiceError::Unauthorized(
                "invalid admin token for this session".into(),
            ))
        }
        None => {
            warn!(session_id = %session.id(), "admin request without token");
            Err(ServiceError::Unauthorized(
                "missing admin token header".into(),
            ))
        }
    }
}

/// Start the countdown of a session and spawn the timer task driving its
/// ticks. Rejected while a countdown or window is already active.
pub async fn start_countdown(
    state: &SharedState,
    session_id: SessionId,
) -> Result<StartCountdownResponse, ServiceError> {
    let session = state.require_session(session_id)?;
    let store = state.require_session_store().await?;
    let config = state.config().clone();
    let ticks = config.countdown_ticks;

    let session_for_work = session.clone();
    let ((), transition) = transitions::run_transition_with_broadcast(
        &session,
        SessionEvent::StartCountdown { ticks },
        |plan| {
            let store = store.clone();
            let config = config.clone();
            async move {
                let snapshot = session_for_work.snapshot().await;
                let now = SystemTime::now();
                let control = SessionControlEntity {
                    phase: plan.to.into(),
                    countdown_started_at: Some(now),
                    generation: snapshot.generation,
                    updated_at: now,
                };
                store_ops::with_retry(&config, "set_control", || {
                    store.set_control(session_id, control.clone())
                })
                .await
            }
        },
    )
    .await?;

    if matches!(transition.to, SessionPhase::Countdown { .. }) {
        countdown::spawn_ticker(state.clone(), session.clone(), transition.generation);
    }
    info!(session_id = %session_id, ticks, "countdown started");

    Ok(StartCountdownResponse {
        snapshot: PhaseSnapshot::from(&transition),
    })
}

/// Reset a session back to idle: clear participant buzz state according to
/// the configured policy, bump the generation so stale ticks die, and rewind
/// the arbiter for the next window.
///
/// Runs entirely under the session gate, so no concurrent buzz can observe a
/// pre-reset phase and land after the reset.
pub async fn reset_session(
    state: &SharedState,
    session_id: SessionId,
) -> Result<ResetSessionResponse, ServiceError> {
    let session = state.require_session(session_id)?;
    let store = state.require_session_store().await?;
    let config = state.config().clone();
    let policy = config.reset_policy;

    let session_for_work = session.clone();
    let (cleared, transition) = transitions::run_transition_with_broadcast(
        &session,
        SessionEvent::Reset,
        |plan| {
            let store = store.clone();
            let config = config.clone();
            async move {
                let snapshot = session_for_work.snapshot().await;
                let next_generation = snapshot.generation + 1;

                let participants = store_ops::with_retry(&config, "list_participants", || {
                    store.list_participants(session_id)
                })
                .await?;

                let cleared = match policy {
                    ResetPolicy::RemoveIdentities => {
                        let count = participants.len();
                        store_ops::with_retry(&config, "remove_participants", || {
                            store.remove_participants(session_id)
                        })
                        .await?;
                        count
                    }
                    ResetPolicy::RetainIdentities => {
                        let mut count = 0;
                        for mut participant in participants {
                            if !participant.buzzed && participant.rank.is_none() {
                                continue;
                            }
                            participant.clear_buzz();
                            store_ops::with_retry(&config, "set_participant", || {
                                store.set_participant(session_id, participant.clone())
                            })
                            .await?;
                            count += 1;
                        }
                        count
                    }
                };

                let now = SystemTime::now();
                let control = SessionControlEntity {
                    phase: plan.to.into(),
                    countdown_started_at: None,
                    generation: next_generation,
                    updated_at: now,
                };
                store_ops::with_retry(&config, "set_control", || {
                    store.set_control(session_id, control.clone())
                })
                .await?;

                // Rewind the rank counter while the gate is still held so the
                // next window starts at rank 1.
                session_for_work.arbiter().write().await.reset();

                Ok(cleared)
            }
        },
    )
    .await?;

    sse_events::broadcast_session_reset(&session, transition.generation);
    info!(
        session_id = %session_id,
        generation = transition.generation,
        cleared,
        "session reset"
    );

    Ok(ResetSessionResponse {
        generation: transition.generation,
        participants_cleared: cleared,
    })
}

/// Tear a session down: bump its generation so in-flight timers die, drop its
/// documents from the store, and remove it from the live registry.
pub async fn delete_session(
    state: &SharedState,
    session_id: SessionId,
) -> Result<(), ServiceError> {
    let session = state.require_session(session_id)?;
    let store = state.require_session_store().await?;
    let config = state.config().clone();

    session
        .run_transition(SessionEvent::Reset, |_plan| {
            let store = store.clone();
            let config = config.clone();
            async move {
                store_ops::with_retry(&config, "remove_session", || {
                    store.remove_session(session_id)
                })
                .await
            }
        })
        .await?;

    state.remove_session(session_id);
    info!(session_id = %session_id, "session deleted");
    Ok(())
}

/// Return the most recent buzz records of a session, newest first. History
/// spans windows: resets do not erase it.
pub async fn recent_history(
    state: &SharedState,
    session_id: SessionId,
    limit: Option<usize>,
) -> Result<Vec<BuzzHistoryEntry>, ServiceError> {
    state.require_session(session_id)?;
    let store = state.require_session_store().await?;
    let limit = limit.unwrap_or(state.config().history_limit);

    let records = store_ops::with_retry(state.config(), "list_recent_buzz_records", || {
        store.list_recent_buzz_records(session_id, limit)
    })
    .await?;

    Ok(records.into_iter().map(Into::into).collect())
}
