//! Library crate for buzz-rush-back, exposing modules for binaries and integration tests.

/// Runtime configuration loading.
pub mod config;
/// Persistence layer: entities, storage errors, store backends.
pub mod dao;
/// Data transfer objects for REST and SSE.
pub mod dto;
/// Service and application error taxonomy.
pub mod error;
/// HTTP route trees.
pub mod routes;
/// Business services composing state machine, arbiter, and store.
pub mod services;
/// Shared application and per-session state.
pub mod state;
