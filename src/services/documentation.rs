use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Buzz Rush Back.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::session_stream,
        crate::routes::session::join,
        crate::routes::session::buzz,
        crate::routes::session::leaderboard,
        crate::routes::session::session_state,
        crate::routes::admin::create_session,
        crate::routes::admin::delete_session,
        crate::routes::admin::start_countdown,
        crate::routes::admin::reset_session,
        crate::routes::admin::recent_history,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::common::PhaseSnapshot,
            crate::dto::phase::VisibleSessionPhase,
            crate::dto::session::JoinRequest,
            crate::dto::session::JoinResponse,
            crate::dto::session::BuzzRequest,
            crate::dto::session::BuzzResponse,
            crate::dto::session::BuzzRejectReason,
            crate::dto::session::LeaderboardResponse,
            crate::dto::session::LeaderboardEntry,
            crate::dto::session::SessionStateResponse,
            crate::dto::session::ParticipantStatus,
            crate::dto::session::BuzzHistoryEntry,
            crate::dto::admin::CreateSessionResponse,
            crate::dto::admin::StartCountdownResponse,
            crate::dto::admin::ResetSessionResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Participant-facing session operations"),
        (name = "admin", description = "Admin session control operations"),
        (name = "sse", description = "Server-sent events streams"),
    )
)]
pub struct ApiDoc;
