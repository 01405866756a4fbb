//! Timer task driving countdown ticks into the session state machine.
//!
//! The ticker is decoupled from client requests: it feeds `Tick` events into
//! the state machine at the configured interval and dies as soon as its
//! generation goes stale, so a reset during the countdown makes any in-flight
//! tick a no-op.

use std::{sync::Arc, time::SystemTime};

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    dao::models::SessionControlEntity,
    error::ServiceError,
    services::store_ops,
    state::{
        SessionState, SharedState,
        state_machine::{SessionEvent, SessionPhase},
        transitions,
    },
};

/// Marker used by the tick work closure to abort the transition when the
/// ticker's generation has been invalidated by a reset.
const STALE_TICK: &str = "stale countdown tick";

/// What one tick did to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The countdown advanced and more ticks are expected.
    CountdownRunning,
    /// The countdown expired and the buzz window is now open.
    WindowOpened,
    /// The tick belonged to an older generation and did nothing.
    Stale,
}

/// Spawn the timer task for a countdown started at the given generation.
pub fn spawn_ticker(state: SharedState, session: Arc<SessionState>, generation: u64) {
    tokio::spawn(run_ticker(state, session, generation));
}

async fn run_ticker(state: SharedState, session: Arc<SessionState>, generation: u64) {
    let interval = state.config().tick_interval;

    loop {
        sleep(interval).await;

        match tick(&state, &session, generation).await {
            Ok(TickOutcome::CountdownRunning) => continue,
            Ok(TickOutcome::WindowOpened) => {
                debug!(session_id = %session.id(), generation, "buzz window opened");
                break;
            }
            Ok(TickOutcome::Stale) => {
                debug!(session_id = %session.id(), generation, "ticker stopped by reset");
                break;
            }
            Err(
                err @ (ServiceError::Unavailable(_) | ServiceError::Degraded | ServiceError::Timeout),
            ) => {
                // Transient storage trouble: the countdown stalls and the
                // next tick retries. A reset still kills the ticker.
                warn!(session_id = %session.id(), error = %err, "tick failed; retrying next interval");
                continue;
            }
            Err(err) => {
                debug!(session_id = %session.id(), error = %err, "ticker stopping");
                break;
            }
        }
    }
}

/// Apply one countdown tick for the given generation.
///
/// The generation is re-checked under the session gate, so a tick racing a
/// reset can never move the new generation's state machine.
pub async fn tick(
    state: &SharedState,
    session: &Arc<SessionState>,
    generation: u64,
) -> Result<TickOutcome, ServiceError> {
    let store = state.require_session_store().await?;
    let config = state.config().clone();
    let session_id = session.id();

    let session_for_work = session.clone();
    let result = transitions::run_transition_with_broadcast(session, SessionEvent::Tick, |plan| {
        let store = store.clone();
        let config = config.clone();
        async move {
            let snapshot = session_for_work.snapshot().await;
            if snapshot.generation != generation {
                return Err(ServiceError::InvalidState(STALE_TICK.into()));
            }

            let previous = store_ops::with_retry(&config, "get_control", || {
                store.get_control(session_id)
            })
            .await?;

            let now = SystemTime::now();
            let control = SessionControlEntity {
                phase: plan.to.into(),
                // The original start time survives intermediate ticks and is
                // cleared once the window opens.
                countdown_started_at: match plan.to {
                    SessionPhase::Countdown { .. } => {
                        previous.and_then(|control| control.countdown_started_at)
                    }
                    _ => None,
                },
                generation: snapshot.generation,
                updated_at: now,
            };
            store_ops::with_retry(&config, "set_control", || {
                store.set_control(session_id, control.clone())
            })
            .await
        }
    })
    .await;

    match result {
        Ok(((), transition)) => {
            if transition.to == SessionPhase::BuzzWindow {
                Ok(TickOutcome::WindowOpened)
            } else {
                Ok(TickOutcome::CountdownRunning)
            }
        }
        // Covers both the in-work generation check and a plan rejected
        // because the session already left the countdown (e.g. reset to
        // idle): either way no countdown of this generation is running.
        Err(ServiceError::InvalidState(_)) => Ok(TickOutcome::Stale),
        Err(err) => Err(err),
    }
}
