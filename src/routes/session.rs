use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::session::{
        BuzzRequest, BuzzResponse, JoinRequest, JoinResponse, LeaderboardResponse,
        SessionStateResponse, StateQuery,
    },
    error::AppError,
    services::participant_service,
    state::SharedState,
};

/// Participant-facing routes: joining, buzzing, and read-only views.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions/{id}/join", post(join))
        .route("/sessions/{id}/buzz", post(buzz))
        .route("/sessions/{id}/leaderboard", get(leaderboard))
        .route("/sessions/{id}/state", get(session_state))
}

/// Register a new participant under a unique identity.
#[utoipa::path(
    post,
    path = "/sessions/{id}/join",
    tag = "session",
    params(("id" = String, Path, description = "Identifier of the session to join")),
    request_body = JoinRequest,
    responses(
        (status = 200, description = "Participant registered", body = JoinResponse),
        (status = 409, description = "Identity already taken")
    )
)]
pub async fn join(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, AppError> {
    let response = participant_service::join(&state, id, payload).await?;
    Ok(Json(response))
}

/// Submit a buzz attempt; rejections are ordinary payloads, not errors.
#[utoipa::path(
    post,
    path = "/sessions/{id}/buzz",
    tag = "session",
    params(("id" = String, Path, description = "Identifier of the session")),
    request_body = BuzzRequest,
    responses((status = 200, description = "Arbitration outcome", body = BuzzResponse))
)]
pub async fn buzz(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BuzzRequest>,
) -> Result<Json<BuzzResponse>, AppError> {
    let response = participant_service::buzz(&state, id, payload).await?;
    Ok(Json(response))
}

/// Ordered list of accepted buzzes for the current window.
#[utoipa::path(
    get,
    path = "/sessions/{id}/leaderboard",
    tag = "session",
    params(("id" = String, Path, description = "Identifier of the session")),
    responses((status = 200, description = "Current leaderboard", body = LeaderboardResponse))
)]
pub async fn leaderboard(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let response = participant_service::leaderboard(&state, id).await?;
    Ok(Json(response))
}

/// Phase snapshot plus the caller's own buzz status.
#[utoipa::path(
    get,
    path = "/sessions/{id}/state",
    tag = "session",
    params(
        ("id" = String, Path, description = "Identifier of the session"),
        StateQuery
    ),
    responses((status = 200, description = "Current session state", body = SessionStateResponse))
)]
pub async fn session_state(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<StateQuery>,
) -> Result<Json<SessionStateResponse>, AppError> {
    let response = participant_service::session_state(&state, id, query.identity).await?;
    Ok(Json(response))
}
