//! Transaction DTOs for reservation and listing.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common_dto::PaginationMeta;
use crate::domain::{TicketTypeId, Transaction};

/// Request body for `POST /user/transactions`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReserveRequest {
    /// Ticket type to reserve.
    pub ticket_type_id: TicketTypeId,
    /// Units to reserve (must be positive).
    pub quantity: u32,
}

/// Paginated transaction list.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionListResponse {
    /// Transactions on this page, newest first.
    pub data: Vec<Transaction>,
    /// Pagination metadata.
    pub pagination: PaginationMeta,
}
