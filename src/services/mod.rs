/// Admin service for session control operations.
pub mod admin_service;
/// Countdown timer task feeding ticks into the state machine.
pub mod countdown;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Participant-facing session operations.
pub mod participant_service;
/// Server-Sent Events message generation.
pub mod sse_events;
/// Server-Sent Events broadcasting service.
pub mod sse_service;
/// Retry wrapper for store operations.
pub mod store_ops;
/// Storage connection supervisor.
pub mod storage_supervisor;
