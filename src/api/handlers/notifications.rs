//! Notification inbox handlers.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, patch};
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{Notification, NotificationId};
use crate::error::{BoxOfficeError, ErrorResponse};

/// `GET /notifications`: The caller's inbox, newest first.
///
/// # Errors
///
/// Returns [`BoxOfficeError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    tag = "Notifications",
    summary = "List notifications",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's notifications", body = Vec<Notification>),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(state.notifications.list_for_user(caller.user_id).await?))
}

/// `PATCH /notifications/{id}`: Mark one notification read.
///
/// # Errors
///
/// Returns [`BoxOfficeError::NotificationNotFound`] if missing or owned by
/// someone else.
#[utoipa::path(
    patch,
    path = "/api/v1/notifications/{id}",
    tag = "Notifications",
    summary = "Mark notification read",
    params(("id" = uuid::Uuid, Path, description = "Notification UUID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Notification marked read", body = Notification),
        (status = 404, description = "Notification not found", body = ErrorResponse),
    )
)]
pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(
        state
            .notifications
            .mark_read(NotificationId::from_uuid(id), caller.user_id)
            .await?,
    ))
}

/// Notification routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}", patch(mark_read))
}
