//! Waitlist DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{TicketTypeId, WaitlistEntry};

/// Request body for `POST /waitlist`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinWaitlistRequest {
    /// Sold-out ticket type to wait for.
    pub ticket_type_id: TicketTypeId,
}

/// Response body for `POST /waitlist`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinWaitlistResponse {
    /// The caller's entry.
    pub entry: WaitlistEntry,
    /// `false` when the caller was already waiting.
    pub created: bool,
}

/// Query parameters for `GET /admin/waitlist`.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WaitlistQuery {
    /// Ticket type whose waitlist to show.
    pub ticket_type_id: uuid::Uuid,
}
