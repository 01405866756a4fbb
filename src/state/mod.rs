//! Shared application state: session registry, store handle, and per-session cores.

pub mod arbiter;
pub mod session;
mod sse;
pub mod state_machine;
pub mod transitions;

use std::{sync::Arc, time::Duration};

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::session_store::{SessionId, SessionStore},
    error::ServiceError,
};

pub use self::session::{SessionState, Transition};
pub use self::sse::SseHub;
pub use self::state_machine::{AbortError, ApplyError, Plan, PlanError, PlanId, Snapshot};

/// Shared handle to the application state.
pub type SharedState = Arc<AppState>;
/// How long a transition's side effects may run before being aborted.
pub const DEFAULT_TRANSITION_TIMEOUT: Duration = Duration::from_secs(5);
/// Broadcast capacity of each per-session SSE hub.
const SSE_CHANNEL_CAPACITY: usize = 16;

/// Central application state storing the live session registry and the
/// storage backend handle.
pub struct AppState {
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    sessions: DashMap<SessionId, Arc<SessionState>>,
    degraded: watch::Sender<bool>,
    config: AppConfig,
    transition_timeout: Option<Duration>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            session_store: RwLock::new(None),
            sessions: DashMap::new(),
            degraded: degraded_tx,
            config,
            transition_timeout: Some(DEFAULT_TRANSITION_TIMEOUT),
        })
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current session store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain the session store or fail with a degraded-mode error.
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new session store implementation and leave degraded mode.
    pub async fn set_session_store(&self, store: Arc<dyn SessionStore>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current session store and enter degraded mode.
    pub async fn clear_session_store(&self) {
        {
            let mut guard = self.session_store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.session_store.read().await;
        guard.is_none()
    }

    /// Update and broadcast the degraded flag.
    pub async fn update_degraded(&self, value: bool) {
        let _ = self.degraded.send_replace(value);
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Register a new live session and hand back its state bundle.
    pub fn create_session(&self) -> Arc<SessionState> {
        let id = Uuid::new_v4();
        let admin_token = Uuid::new_v4().simple().to_string();
        let session = Arc::new(SessionState::new(
            id,
            admin_token,
            SSE_CHANNEL_CAPACITY,
            self.transition_timeout,
        ));
        self.sessions.insert(id, session.clone());
        session
    }

    /// Look up a live session by id.
    pub fn session(&self, id: SessionId) -> Option<Arc<SessionState>> {
        self.sessions.get(&id).map(|entry| entry.value().clone())
    }

    /// Look up a live session or fail with a not-found error.
    pub fn require_session(&self, id: SessionId) -> Result<Arc<SessionState>, ServiceError> {
        self.session(id)
            .ok_or_else(|| ServiceError::NotFound(format!("session `{id}` not found")))
    }

    /// Drop a session from the registry, returning its state if it was live.
    pub fn remove_session(&self, id: SessionId) -> Option<Arc<SessionState>> {
        self.sessions.remove(&id).map(|(_, session)| session)
    }

    /// Snapshot of every live session, for fan-out broadcasts.
    pub fn sessions(&self) -> Vec<Arc<SessionState>> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
