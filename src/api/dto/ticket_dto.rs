//! Ticket type DTOs: listing filter and restock body.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Query parameters for `GET /tickets`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TicketTypeQuery {
    /// Only list ticket types of this event.
    #[serde(default)]
    pub event_id: Option<uuid::Uuid>,
}

/// Request body for `POST /admin/tickets/{id}/restock`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RestockRequest {
    /// Units to add (must be positive).
    pub quantity: u32,
}
