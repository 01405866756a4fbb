use std::time::Duration;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::time::timeout;
use tracing::warn;

use crate::{
    dao::{models::SessionPhaseEntity, session_store::SessionId},
    error::ServiceError,
    state::{
        arbiter::BuzzArbiter,
        sse::SseHub,
        state_machine::{
            AbortError, ApplyError, Plan, PlanError, PlanId, SessionEvent, SessionPhase,
            SessionStateMachine, Snapshot,
        },
    },
};

impl From<SessionPhase> for SessionPhaseEntity {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::Idle => SessionPhaseEntity::Idle,
            SessionPhase::Countdown { remaining } => SessionPhaseEntity::Countdown { remaining },
            SessionPhase::BuzzWindow => SessionPhaseEntity::BuzzWindow,
        }
    }
}

/// Result of an applied state machine transition, handed back to callers so
/// they can decide what to broadcast.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    /// Phase before the transition.
    pub from: SessionPhase,
    /// Phase after the transition.
    pub to: SessionPhase,
    /// State machine version after the transition.
    pub version: usize,
    /// Reset generation after the transition.
    pub generation: u64,
}

impl Transition {
    /// Whether the transition produced an observable phase change.
    pub fn changed(&self) -> bool {
        self.from != self.to
    }
}

/// Per-session state bundle: the state machine, the buzz arbiter, the SSE hub
/// and the serialization gate every mutating operation must pass through.
pub struct SessionState {
    id: SessionId,
    admin_token: String,
    machine: RwLock<SessionStateMachine>,
    arbiter: RwLock<BuzzArbiter>,
    gate: RwLock<()>,
    sse: SseHub,
    transition_timeout: Option<Duration>,
}

impl SessionState {
    /// Build the state bundle for a freshly created session.
    pub fn new(
        id: SessionId,
        admin_token: String,
        sse_capacity: usize,
        transition_timeout: Option<Duration>,
    ) -> Self {
        Self {
            id,
            admin_token,
            machine: RwLock::new(SessionStateMachine::new()),
            arbiter: RwLock::new(BuzzArbiter::new()),
            gate: RwLock::new(()),
            sse: SseHub::new(sse_capacity),
            transition_timeout,
        }
    }

    /// Identifier of this session.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Admin capability token handed out at creation time.
    pub fn admin_token(&self) -> &str {
        &self.admin_token
    }

    /// Broadcast hub for this session's SSE stream.
    pub fn sse(&self) -> &SseHub {
        &self.sse
    }

    /// Snapshot the full state machine state.
    pub async fn snapshot(&self) -> Snapshot {
        self.machine.read().await.snapshot()
    }

    /// Buzz arbiter guarded by its own lock; only touch it while holding the
    /// gate returned by [`SessionState::exclusive`].
    pub fn arbiter(&self) -> &RwLock<BuzzArbiter> {
        &self.arbiter
    }

    /// Acquire the single serialization point for this session. Every
    /// state-mutating operation (buzz registration included) funnels through
    /// this lock so no mutation can interleave with another.
    pub async fn exclusive(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }

    /// Take a shared hold on the serialization point. Read-only views run
    /// concurrently with each other but never overlap a mutation, so they
    /// cannot observe a half-applied reset.
    pub async fn shared(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().await
    }

    /// Plan a transition on the session state machine, returning the plan.
    async fn plan_transition(&self, event: SessionEvent) -> Result<Plan, PlanError> {
        let mut sm = self.machine.write().await;
        sm.plan(event)
    }

    /// Apply the planned transition, returning the next phase.
    async fn apply_planned_transition(&self, plan_id: PlanId) -> Result<SessionPhase, ApplyError> {
        let mut sm = self.machine.write().await;
        sm.apply(plan_id)
    }

    /// Abort a planned transition of the session state machine.
    async fn abort_transition(&self, plan_id: PlanId) -> Result<(), AbortError> {
        let mut sm = self.machine.write().await;
        sm.abort(plan_id)
    }

    /// Run a state machine transition with its associated side effects under
    /// the serialization gate.
    ///
    /// The transition is planned first, then `work` runs with the validated
    /// plan (typically store writes deriving the control document from
    /// `plan.to`), and only on success is the plan applied. A failing or
    /// timed out `work` aborts the plan and leaves the phase untouched.
    pub async fn run_transition<F, Fut, T>(
        &self,
        event: SessionEvent,
        work: F,
    ) -> Result<(T, Transition), ServiceError>
    where
        F: FnOnce(Plan) -> Fut,
        Fut: std::future::Future<Output = Result<T, ServiceError>>,
    {
        let gate = self.gate.write().await;
        let plan = self.plan_transition(event).await?;
        let plan_id = plan.id;
        let from = plan.from;

        let work_future = work(plan);
        let outcome = if let Some(limit) = self.transition_timeout {
            match timeout(limit, work_future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Err(abort_err) = self.abort_transition(plan_id).await {
                        warn!(
                            session_id = %self.id,
                            event = ?event,
                            plan_id = %plan_id,
                            error = ?abort_err,
                            "failed to abort transition after timeout"
                        );
                    }
                    drop(gate);
                    return Err(ServiceError::Timeout);
                }
            }
        } else {
            work_future.await
        };

        match outcome {
            Ok(value) => {
                let to = self.apply_planned_transition(plan_id).await?;
                let snapshot = self.machine.read().await.snapshot();
                drop(gate);
                Ok((
                    value,
                    Transition {
                        from,
                        to,
                        version: snapshot.version,
                        generation: snapshot.generation,
                    },
                ))
            }
            Err(err) => {
                if let Err(abort_err) = self.abort_transition(plan_id).await {
                    warn!(
                        session_id = %self.id,
                        event = ?event,
                        plan_id = %plan_id,
                        error = ?abort_err,
                        "failed to abort transition after work error"
                    );
                }
                drop(gate);
                Err(err)
            }
        }
    }
}
