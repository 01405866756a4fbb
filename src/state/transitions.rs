//! Helper tying state machine transitions to their broadcast side.

use std::sync::Arc;

use crate::{
    error::ServiceError,
    services::sse_events::broadcast_phase_changed,
    state::{
        SessionState, Transition,
        state_machine::{Plan, SessionEvent},
    },
};

/// Execute a planned state-machine transition, then broadcast the resulting
/// phase change when the phase actually moved.
pub async fn run_transition_with_broadcast<F, Fut, T>(
    session: &Arc<SessionState>,
    event: SessionEvent,
    work: F,
) -> Result<(T, Transition), ServiceError>
where
    F: FnOnce(Plan) -> Fut,
    Fut: std::future::Future<Output = Result<T, ServiceError>>,
{
    let (res, transition) = session.run_transition(event, work).await?;
    if transition.changed() {
        broadcast_phase_changed(session, &transition);
    }
    Ok((res, transition))
}
