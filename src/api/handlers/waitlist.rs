//! Waitlist handlers.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{JoinWaitlistRequest, JoinWaitlistResponse, WaitlistQuery};
use crate::app_state::AppState;
use crate::auth::{AuthUser, RequireAdmin};
use crate::domain::{TicketTypeId, WaitlistEntry};
use crate::error::{BoxOfficeError, ErrorResponse};

/// `POST /waitlist`: Wait for a sold-out ticket type.
///
/// Returns 201 for a new entry and 200 when the caller was already waiting.
///
/// # Errors
///
/// - [`BoxOfficeError::TicketTypeNotFound`] if missing or deleted.
/// - [`BoxOfficeError::TicketsStillAvailable`] if stock remains.
#[utoipa::path(
    post,
    path = "/api/v1/waitlist",
    tag = "Waitlist",
    summary = "Join waitlist",
    request_body = JoinWaitlistRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Joined", body = JoinWaitlistResponse),
        (status = 200, description = "Already waiting", body = JoinWaitlistResponse),
        (status = 404, description = "Ticket type not found", body = ErrorResponse),
        (status = 409, description = "Tickets still available", body = ErrorResponse),
    )
)]
pub async fn join_waitlist(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(req): Json<JoinWaitlistRequest>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    let (entry, created) = state
        .waitlist
        .join(caller.user_id, req.ticket_type_id)
        .await?;
    let status = if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(JoinWaitlistResponse { entry, created })))
}

/// `GET /admin/waitlist`: Entries for one ticket type, oldest first.
///
/// # Errors
///
/// Returns [`BoxOfficeError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/admin/waitlist",
    tag = "Admin",
    summary = "List waitlist",
    params(WaitlistQuery),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Waitlist entries", body = Vec<WaitlistEntry>),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    )
)]
pub async fn list_waitlist(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(query): Query<WaitlistQuery>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(
        state
            .waitlist
            .list(TicketTypeId::from_uuid(query.ticket_type_id))
            .await?,
    ))
}

/// Waitlist routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/waitlist", post(join_waitlist))
        .route("/admin/waitlist", get(list_waitlist))
}
