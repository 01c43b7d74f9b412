//! Transaction handlers: reservation, settlement and listing.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{PaginationParams, ReserveRequest, TransactionListResponse};
use crate::app_state::AppState;
use crate::auth::{AuthUser, RequireAdmin};
use crate::domain::{Transaction, TransactionId};
use crate::error::{BoxOfficeError, ErrorResponse};

/// `POST /user/transactions`: Reserve tickets.
///
/// Holds the units until the payment deadline and sends the caller a
/// confirmation notification.
///
/// # Errors
///
/// - [`BoxOfficeError::InvalidRequest`] on zero quantity.
/// - [`BoxOfficeError::TicketTypeNotFound`] if missing or deleted.
/// - [`BoxOfficeError::InsufficientInventory`] if stock is short.
#[utoipa::path(
    post,
    path = "/api/v1/user/transactions",
    tag = "Transactions",
    summary = "Reserve tickets",
    description = "Atomically holds stock and opens a Pending transaction with a payment deadline.",
    request_body = ReserveRequest,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Reservation created", body = Transaction),
        (status = 400, description = "Invalid quantity", body = ErrorResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Ticket type not found", body = ErrorResponse),
        (status = 422, description = "Insufficient inventory", body = ErrorResponse),
    )
)]
pub async fn reserve(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(req): Json<ReserveRequest>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    let transaction = state
        .reservations
        .reserve(caller.user_id, req.ticket_type_id, req.quantity)
        .await?;
    state.reservations.send_confirmation(&transaction).await;
    Ok((StatusCode::CREATED, Json(transaction)))
}

/// `GET /user/transactions`: The caller's transactions.
///
/// # Errors
///
/// Returns [`BoxOfficeError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/user/transactions",
    tag = "Transactions",
    summary = "List own transactions",
    params(PaginationParams),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's transactions, newest first", body = TransactionListResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
    )
)]
pub async fn list_own(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    let all = state.reservations.list_for_user(caller.user_id).await?;
    let (data, pagination) = page.paginate(all);
    Ok(Json(TransactionListResponse { data, pagination }))
}

/// `POST /user/transactions/{id}/cancel`: Give back a pending reservation.
///
/// # Errors
///
/// - [`BoxOfficeError::TransactionNotFound`] if missing or not the caller's.
/// - [`BoxOfficeError::InvalidTransition`] if no longer pending.
#[utoipa::path(
    post,
    path = "/api/v1/user/transactions/{id}/cancel",
    tag = "Transactions",
    summary = "Cancel own reservation",
    params(("id" = uuid::Uuid, Path, description = "Transaction UUID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Transaction marked failed", body = Transaction),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 409, description = "Transaction already settled", body = ErrorResponse),
    )
)]
pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(
        state
            .reservations
            .cancel(caller, TransactionId::from_uuid(id))
            .await?,
    ))
}

/// `GET /admin/transactions`: Every transaction.
///
/// # Errors
///
/// Returns [`BoxOfficeError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/admin/transactions",
    tag = "Admin",
    summary = "List all transactions",
    params(PaginationParams),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All transactions, newest first", body = TransactionListResponse),
        (status = 403, description = "Admin role required", body = ErrorResponse),
    )
)]
pub async fn list_all(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Query(page): Query<PaginationParams>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    let all = state.reservations.list_all().await?;
    let (data, pagination) = page.paginate(all);
    Ok(Json(TransactionListResponse { data, pagination }))
}

/// `GET /admin/transactions/{id}`: One transaction.
///
/// # Errors
///
/// Returns [`BoxOfficeError::TransactionNotFound`] if missing.
#[utoipa::path(
    get,
    path = "/api/v1/admin/transactions/{id}",
    tag = "Admin",
    summary = "Get transaction",
    params(("id" = uuid::Uuid, Path, description = "Transaction UUID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Transaction", body = Transaction),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
    )
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(
        state.reservations.get(TransactionId::from_uuid(id)).await?,
    ))
}

/// `POST /admin/transactions/{id}/confirm`: Record a successful payment.
///
/// # Errors
///
/// - [`BoxOfficeError::TransactionNotFound`] if missing.
/// - [`BoxOfficeError::InvalidTransition`] if no longer pending.
#[utoipa::path(
    post,
    path = "/api/v1/admin/transactions/{id}/confirm",
    tag = "Admin",
    summary = "Confirm payment",
    params(("id" = uuid::Uuid, Path, description = "Transaction UUID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Transaction paid", body = Transaction),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 409, description = "Transaction already settled", body = ErrorResponse),
    )
)]
pub async fn confirm(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(
        state
            .reservations
            .confirm_payment(TransactionId::from_uuid(id))
            .await?,
    ))
}

/// `POST /admin/transactions/{id}/decline`: Record a failed payment.
///
/// # Errors
///
/// - [`BoxOfficeError::TransactionNotFound`] if missing.
/// - [`BoxOfficeError::InvalidTransition`] if no longer pending.
#[utoipa::path(
    post,
    path = "/api/v1/admin/transactions/{id}/decline",
    tag = "Admin",
    summary = "Decline payment",
    description = "Marks the transaction failed, returns its units to stock and notifies the waitlist.",
    params(("id" = uuid::Uuid, Path, description = "Transaction UUID")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Transaction failed", body = Transaction),
        (status = 404, description = "Transaction not found", body = ErrorResponse),
        (status = 409, description = "Transaction already settled", body = ErrorResponse),
    )
)]
pub async fn decline(
    State(state): State<AppState>,
    RequireAdmin(_admin): RequireAdmin,
    Path(id): Path<uuid::Uuid>,
) -> Result<impl IntoResponse, BoxOfficeError> {
    Ok(Json(
        state
            .reservations
            .decline_payment(TransactionId::from_uuid(id))
            .await?,
    ))
}

/// Transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/transactions", post(reserve).get(list_own))
        .route("/user/transactions/{id}/cancel", post(cancel))
        .route("/admin/transactions", get(list_all))
        .route("/admin/transactions/{id}", get(get_transaction))
        .route("/admin/transactions/{id}/confirm", post(confirm))
        .route("/admin/transactions/{id}/decline", post(decline))
}
