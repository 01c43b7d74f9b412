//! Ticket type handlers: public listing, admin catalog and restock.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};

use crate::api::dto::{RestockRequest, TicketTypeQuery};
use crate::app_state::AppState;
use crate::auth::RequireAdmin;
use crate::domain::{EventId, NewTicketType, TicketType, TicketTypeId, TicketTypePatch};
use crate::error::{BoxOfficeError, ErrorResponse};

/// `GET /tickets`: List live ticket types.
///
/// # Errors
///
/// Returns [`BoxOfficeError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/tickets",
    tag = "Tickets",
    summary = "List ticket types",
    params(TicketTypeQuery),
    responses(
        (status = 200, description = "Live ticket types", body = Vec<TicketType>),
    )
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<TicketTypeQuery>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    let event_id = query.event_id.map(EventId::from_uuid);
    Ok(Json(state.inventory.list(event_id).await?))
}

/// `GET /tickets/{id}`: Get one live ticket type.
///
/// # Errors
///
/// Returns [`BoxOfficeError::TicketTypeNotFound`] if missing or deleted.
#[utoipa::path(
    get,
    path = "/api/v1/tickets/{id}",
    tag = "Tickets",
    summary = "Get ticket type",
    params(("id" = uuid::Uuid, Path, description = "Ticket type UUID")),
    responses(
        (status = 200, description = "Ticket type", body = TicketType),
        (status = 404, description = "Ticket type not found", body = ErrorResponse),
    )
)]
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(state.inventory.get(TicketTypeId::from_uuid(id)).await?))
}

/// `POST /admin/tickets`: Put a ticket type on sale.
///
/// # Errors
///
/// Returns [`BoxOfficeError::InvalidRequest`] or
/// [`BoxOfficeError::EventNotFound`].
#[utoipa::path(
    post,
    path = "/api/v1/admin/tickets",
    tag = "Admin",
    summary = "Create ticket type",
    request_body = NewTicketType,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Ticket type created", body = TicketType),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn create_ticket(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Json(new): Json<NewTicketType>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    let ticket = state.inventory.create(new).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// `PUT /admin/tickets/{id}`: Change descriptive fields.
///
/// # Errors
///
/// Returns [`BoxOfficeError::TicketTypeNotFound`] or
/// [`BoxOfficeError::InvalidRequest`].
#[utoipa::path(
    put,
    path = "/api/v1/admin/tickets/{id}",
    tag = "Admin",
    summary = "Update ticket type",
    description = "Updates batch, name, description and price. Stock is changed only by reservations and restocks.",
    params(("id" = uuid::Uuid, Path, description = "Ticket type UUID")),
    request_body = TicketTypePatch,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Ticket type updated", body = TicketType),
        (status = 404, description = "Ticket type not found", body = ErrorResponse),
    )
)]
pub async fn update_ticket(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<uuid::Uuid>,
    Json(patch): Json<TicketTypePatch>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(
        state
            .inventory
            .update(TicketTypeId::from_uuid(id), patch)
            .await?,
    ))
}

/// `DELETE /admin/tickets/{id}`: Take a ticket type off sale.
///
/// # Errors
///
/// Returns [`BoxOfficeError::TicketTypeNotFound`] if missing or deleted.
#[utoipa::path(
    delete,
    path = "/api/v1/admin/tickets/{id}",
    tag = "Admin",
    summary = "Delete ticket type",
    params(("id" = uuid::Uuid, Path, description = "Ticket type UUID")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Ticket type deleted"),
        (status = 404, description = "Ticket type not found", body = ErrorResponse),
    )
)]
pub async fn delete_ticket(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    state.inventory.delete(TicketTypeId::from_uuid(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /admin/tickets/{id}/restock`: Add stock.
///
/// # Errors
///
/// Returns [`BoxOfficeError::TicketTypeNotFound`] or
/// [`BoxOfficeError::InvalidRequest`].
#[utoipa::path(
    post,
    path = "/api/v1/admin/tickets/{id}/restock",
    tag = "Admin",
    summary = "Restock ticket type",
    description = "Adds stock and notifies everyone on the waitlist.",
    params(("id" = uuid::Uuid, Path, description = "Ticket type UUID")),
    request_body = RestockRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Ticket type after restock", body = TicketType),
        (status = 404, description = "Ticket type not found", body = ErrorResponse),
    )
)]
pub async fn restock_ticket(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<uuid::Uuid>,
    Json(req): Json<RestockRequest>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(
        state
            .inventory
            .restock(TicketTypeId::from_uuid(id), req.quantity)
            .await?,
    ))
}

/// Ticket type routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tickets", get(list_tickets))
        .route("/tickets/{id}", get(get_ticket))
        .route("/admin/tickets", post(create_ticket))
        .route("/admin/tickets/{id}", put(update_ticket).delete(delete_ticket))
        .route("/admin/tickets/{id}/restock", post(restock_ticket))
}
