//! Buzz Rush Back binary entrypoint wiring REST, SSE, and storage layers.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dao;
mod dto;
mod error;
mod routes;
mod services;
mod state;

use config::AppConfig;
use dao::session_store::{SessionStore, memory::MemorySessionStore};
use state::{AppState, SharedState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let app_config = AppConfig::load();
    let app_state = AppState::new(app_config);

    spawn_store_supervisor(app_state.clone());
    tokio::spawn(run_degraded_watcher(app_state.clone()));
    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

/// Pick a storage backend and hand it to the supervisor task. MongoDB is used
/// when `MONGO_URI` is set (and the feature is compiled in); otherwise the
/// server runs on the in-process store.
fn spawn_store_supervisor(state: SharedState) {
    #[cfg(feature = "mongo-store")]
    if let Ok(uri) = env::var("MONGO_URI") {
        use crate::dao::session_store::mongodb::{MongoConfig, MongoSessionStore};

        let db_name = env::var("MONGO_DB").ok();
        info!("using MongoDB session store");
        tokio::spawn(services::storage_supervisor::run(state, move || {
            let uri = uri.clone();
            let db_name = db_name.clone();
            async move {
                let config = MongoConfig::from_uri(&uri, db_name.as_deref()).await?;
                let store = MongoSessionStore::connect(config).await?;
                Ok(Arc::new(store) as Arc<dyn SessionStore>)
            }
        }));
        return;
    }

    info!("no MongoDB configured; using in-memory session store");
    tokio::spawn(services::storage_supervisor::run(state, || async {
        Ok(Arc::new(MemorySessionStore::new()) as Arc<dyn SessionStore>)
    }));
}

/// Fan degraded-mode flips out to every live session stream.
async fn run_degraded_watcher(state: SharedState) {
    let mut watcher = state.degraded_watcher();
    let mut last = *watcher.borrow();

    while watcher.changed().await.is_ok() {
        let value = *watcher.borrow();
        if value != last {
            last = value;
            services::sse_events::broadcast_system_status(&state, value);
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
