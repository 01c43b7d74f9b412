//! Service error types with HTTP status code mapping.
//!
//! [`BoxOfficeError`] is the central error type. Each variant maps to a
//! specific HTTP status code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{
    EventId, NotificationId, TicketTypeId, TransactionId, TransactionStatus,
};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "insufficient inventory: requested 3, available 2",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see code ranges on [`BoxOfficeError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category         | HTTP Status                  |
/// |-----------|------------------|------------------------------|
/// | 1000–1999 | Validation/Auth  | 400 / 401 / 403              |
/// | 2000–2999 | State/Not Found  | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server           | 500 / 503                    |
/// | 4000–4999 | Business rules   | 409 / 422                    |
#[derive(Debug, thiserror::Error)]
pub enum BoxOfficeError {
    /// Ticket type is missing or soft-deleted.
    #[error("ticket type not found: {0}")]
    TicketTypeNotFound(TicketTypeId),

    /// Transaction is missing (or not visible to the caller).
    #[error("transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Event is missing.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// Notification is missing (or not owned by the caller).
    #[error("notification not found: {0}")]
    NotificationNotFound(NotificationId),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Bearer token missing, malformed, or rejected.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated caller lacks the required role.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Not enough tickets left for the requested quantity.
    #[error("insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory {
        /// Quantity the caller asked for.
        requested: u32,
        /// Quantity available when the request was evaluated.
        available: u32,
    },

    /// Transaction already left `Pending`; terminal states are immutable.
    #[error("transaction {id} is {from}, cannot move to {to}")]
    InvalidTransition {
        /// Transaction identifier.
        id: TransactionId,
        /// Current (terminal) status.
        from: TransactionStatus,
        /// Requested status.
        to: TransactionStatus,
    },

    /// Waitlist join refused because the ticket type is not sold out.
    #[error("ticket type {0} still has tickets available")]
    TicketsStillAvailable(TicketTypeId),

    /// Lost a race on an atomic update; the caller should retry.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// Storage layer failure.
    #[error("persistence error: {0}")]
    PersistenceFailure(String),

    /// Notification delivery failed. Never rolls back business state.
    #[error("notification error: {0}")]
    NotificationFailure(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BoxOfficeError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Unauthorized(_) => 1101,
            Self::Forbidden(_) => 1102,
            Self::TicketTypeNotFound(_) => 2001,
            Self::TransactionNotFound(_) => 2002,
            Self::EventNotFound(_) => 2003,
            Self::NotificationNotFound(_) => 2004,
            Self::InvalidTransition { .. } => 2101,
            Self::ConcurrencyConflict(_) => 2102,
            Self::Internal(_) => 3000,
            Self::PersistenceFailure(_) => 3001,
            Self::NotificationFailure(_) => 3002,
            Self::InsufficientInventory { .. } => 4001,
            Self::TicketsStillAvailable(_) => 4002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::TicketTypeNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::EventNotFound(_)
            | Self::NotificationNotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidTransition { .. }
            | Self::ConcurrencyConflict(_)
            | Self::TicketsStillAvailable(_) => StatusCode::CONFLICT,
            Self::InsufficientInventory { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::PersistenceFailure(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::NotificationFailure(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns `true` for rejections caused by the request itself rather
    /// than by a system fault.
    #[must_use]
    pub const fn is_business_rejection(&self) -> bool {
        matches!(
            self,
            Self::TicketTypeNotFound(_)
                | Self::TransactionNotFound(_)
                | Self::EventNotFound(_)
                | Self::NotificationNotFound(_)
                | Self::InvalidRequest(_)
                | Self::InsufficientInventory { .. }
                | Self::InvalidTransition { .. }
                | Self::TicketsStillAvailable(_)
        )
    }
}

impl From<sqlx::Error> for BoxOfficeError {
    fn from(err: sqlx::Error) -> Self {
        // 40001 serialization_failure, 40P01 deadlock_detected
        if let sqlx::Error::Database(db) = &err
            && matches!(db.code().as_deref(), Some("40001" | "40P01"))
        {
            return Self::ConcurrencyConflict(db.message().to_string());
        }
        Self::PersistenceFailure(err.to_string())
    }
}

impl IntoResponse for BoxOfficeError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let details = match &self {
            Self::InsufficientInventory { available, .. } => {
                Some(format!("available={available}"))
            }
            _ => None,
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
