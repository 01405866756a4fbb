use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            CreateSessionResponse, HistoryQuery, ResetSessionResponse, StartCountdownResponse,
        },
        session::BuzzHistoryEntry,
    },
    error::AppError,
    services::admin_service,
    state::SharedState,
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Session lifecycle endpoints. Creating a session is open and mints the
/// admin capability; everything else requires the returned token.
pub fn router(state: SharedState) -> Router<SharedState> {
    let guarded = Router::new()
        .route("/sessions/{id}", delete(delete_session))
        .route("/sessions/{id}/countdown", post(start_countdown))
        .route("/sessions/{id}/reset", post(reset_session))
        .route("/sessions/{id}/history", get(recent_history))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token));

    Router::new()
        .route("/sessions", post(create_session))
        .merge(guarded)
}

/// Verify the admin token header against the targeted session before letting
/// the request through.
async fn require_admin_token(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let session = state.require_session(id)?;
    let token = request
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    admin_service::authorize(&session, token)?;
    Ok(next.run(request).await)
}

/// Create a new buzzer session and receive its admin token.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "admin",
    responses((status = 200, description = "Session created", body = CreateSessionResponse))
)]
pub async fn create_session(
    State(state): State<SharedState>,
) -> Result<Json<CreateSessionResponse>, AppError> {
    Ok(Json(admin_service::create_session(&state).await?))
}

/// Tear a session down and drop its stored documents.
#[utoipa::path(
    delete,
    path = "/sessions/{id}",
    tag = "admin",
    params(("x-admin-token" = String, Header, description = "Admin token returned at session creation"),
    ("id" = String, Path, description = "Identifier of the session to delete")),
    responses((status = 204, description = "Session deleted"))
)]
pub async fn delete_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    admin_service::delete_session(&state, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start the countdown; fails with a conflict while one is already running.
#[utoipa::path(
    post,
    path = "/sessions/{id}/countdown",
    tag = "admin",
    params(("x-admin-token" = String, Header, description = "Admin token returned at session creation"),
    ("id" = String, Path, description = "Identifier of the session")),
    responses(
        (status = 200, description = "Countdown started", body = StartCountdownResponse),
        (status = 409, description = "A countdown or buzz window is already active")
    )
)]
pub async fn start_countdown(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<StartCountdownResponse>, AppError> {
    Ok(Json(admin_service::start_countdown(&state, id).await?))
}

/// Reset the session to idle and clear participant buzz state.
#[utoipa::path(
    post,
    path = "/sessions/{id}/reset",
    tag = "admin",
    params(("x-admin-token" = String, Header, description = "Admin token returned at session creation"),
    ("id" = String, Path, description = "Identifier of the session")),
    responses((status = 200, description = "Session reset", body = ResetSessionResponse))
)]
pub async fn reset_session(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResetSessionResponse>, AppError> {
    Ok(Json(admin_service::reset_session(&state, id).await?))
}

/// List the most recent buzz records of the session, newest first.
#[utoipa::path(
    get,
    path = "/sessions/{id}/history",
    tag = "admin",
    params(("x-admin-token" = String, Header, description = "Admin token returned at session creation"),
    ("id" = String, Path, description = "Identifier of the session"),
    HistoryQuery),
    responses((status = 200, description = "Recent buzz records", body = [BuzzHistoryEntry]))
)]
pub async fn recent_history(
    State(state): State<SharedState>,
    Path(id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<BuzzHistoryEntry>>, AppError> {
    Ok(Json(
        admin_service::recent_history(&state, id, query.limit).await?,
    ))
}
