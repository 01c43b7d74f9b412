//! Waitlist entries for sold-out ticket types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{TicketTypeId, UserId, WaitlistEntryId};

/// A user waiting for a sold-out ticket type.
///
/// At most one entry exists per `(user_id, ticket_type_id)`; joining again
/// returns the existing entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WaitlistEntry {
    /// Entry identifier.
    pub id: WaitlistEntryId,
    /// Waiting user.
    pub user_id: UserId,
    /// Ticket type the user is waiting for.
    pub ticket_type_id: TicketTypeId,
    /// When the user joined.
    pub created_at: DateTime<Utc>,
}

impl WaitlistEntry {
    /// Creates a fresh entry.
    #[must_use]
    pub fn new(user_id: UserId, ticket_type_id: TicketTypeId, now: DateTime<Utc>) -> Self {
        Self {
            id: WaitlistEntryId::new(),
            user_id,
            ticket_type_id,
            created_at: now,
        }
    }
}
