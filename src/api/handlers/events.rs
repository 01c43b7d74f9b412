//! Event handlers: public catalog and admin management.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::auth::RequireAdmin;
use crate::domain::{Event, EventDetails, EventId};
use crate::error::{BoxOfficeError, ErrorResponse};

/// `GET /events`: List events by start date.
///
/// # Errors
///
/// Returns [`BoxOfficeError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List events",
    responses(
        (status = 200, description = "All events ordered by start date", body = Vec<Event>),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(state.events.list().await?))
}

/// `GET /events/{id}`: Get one event.
///
/// # Errors
///
/// Returns [`BoxOfficeError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get event",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    responses(
        (status = 200, description = "Event", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(state.events.get(EventId::from_uuid(id)).await?))
}

/// `POST /admin/events`: Create an event.
///
/// # Errors
///
/// Returns [`BoxOfficeError::InvalidRequest`] on invalid details.
#[utoipa::path(
    post,
    path = "/api/v1/admin/events",
    tag = "Admin",
    summary = "Create event",
    request_body = EventDetails,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Invalid details", body = ErrorResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(details): Json<EventDetails>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    let event = state.events.create(details).await?;
    tracing::debug!(admin = %admin.user_id, event_id = %event.id, "admin created event");
    Ok((StatusCode::CREATED, Json(event)))
}

/// `PUT /admin/events/{id}`: Replace event details.
///
/// # Errors
///
/// Returns [`BoxOfficeError::EventNotFound`] or
/// [`BoxOfficeError::InvalidRequest`].
#[utoipa::path(
    put,
    path = "/api/v1/admin/events/{id}",
    tag = "Admin",
    summary = "Update event",
    params(("id" = uuid::Uuid, Path, description = "Event UUID")),
    request_body = EventDetails,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Event updated", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<uuid::Uuid>,
    Json(details): Json<EventDetails>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(
        state.events.update(EventId::from_uuid(id), details).await?,
    ))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events))
        .route("/events/{id}", get(get_event))
        .route("/admin/events", post(create_event))
        .route("/admin/events/{id}", put(update_event))
}
