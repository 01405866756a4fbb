//! Persistence layer: entities, storage errors, and the session store backends.

pub mod models;
pub mod session_store;
pub mod storage;
