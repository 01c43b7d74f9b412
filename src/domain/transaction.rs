//! Purchase transactions and their status lifecycle.
//!
//! ```text
//!            confirm payment
//!   Pending ─────────────────▶ Paid
//!      │  decline / cancel
//!      ├────────────────────▶ Failed   (inventory released)
//!      │  deadline passed
//!      └────────────────────▶ Expired  (inventory released)
//! ```
//!
//! `Paid`, `Failed` and `Expired` are terminal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{TicketType, TicketTypeId, TransactionId, UserId};
use crate::error::BoxOfficeError;

/// Status of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Inventory is held until the deadline.
    Pending,
    /// Payment confirmed.
    Paid,
    /// Payment declined or reservation cancelled.
    Failed,
    /// Deadline passed without payment.
    Expired,
}

impl TransactionStatus {
    /// Database / wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Failed => "failed",
            Self::Expired => "expired",
        }
    }

    /// Terminal statuses never change again.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Whether leaving `Pending` for this status returns the reserved
    /// quantity to the ticket type.
    #[must_use]
    pub const fn releases_inventory(&self) -> bool {
        matches!(self, Self::Failed | Self::Expired)
    }

    /// Only `Pending` may move, and only to a terminal status.
    #[must_use]
    pub const fn can_transition_to(&self, to: Self) -> bool {
        matches!(self, Self::Pending) && to.is_terminal()
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = BoxOfficeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "failed" => Ok(Self::Failed),
            "expired" => Ok(Self::Expired),
            other => Err(BoxOfficeError::Internal(format!(
                "unknown transaction status: {other}"
            ))),
        }
    }
}

/// One purchase attempt.
///
/// The transaction never tracks inventory itself; `quantity` records the
/// decrement it caused on its ticket type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Transaction {
    /// Unique transaction identifier.
    pub id: TransactionId,
    /// Purchasing user.
    pub user_id: UserId,
    /// Reserved ticket type.
    pub ticket_type_id: TicketTypeId,
    /// Reserved units (always positive).
    pub quantity: u32,
    /// `quantity * price` at reservation time, in minor units.
    pub total_price_cents: i64,
    /// Current status.
    pub status: TransactionStatus,
    /// After this instant a `Pending` transaction is eligible for expiry.
    pub deadline: DateTime<Utc>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Builds a `Pending` transaction for `quantity` units of `ticket`.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::InvalidRequest`] if `quantity` is zero or
    /// the total price overflows.
    pub fn pending(
        user_id: UserId,
        ticket: &TicketType,
        quantity: u32,
        now: DateTime<Utc>,
        reservation_window: Duration,
    ) -> Result<Self, BoxOfficeError> {
        if quantity == 0 {
            return Err(BoxOfficeError::InvalidRequest(
                "quantity must be positive".to_string(),
            ));
        }
        Ok(Self {
            id: TransactionId::new(),
            user_id,
            ticket_type_id: ticket.id,
            quantity,
            total_price_cents: ticket.total_price(quantity)?,
            status: TransactionStatus::Pending,
            deadline: now + reservation_window,
            created_at: now,
            updated_at: now,
        })
    }

    /// `Pending` with its deadline at or before `now`.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == TransactionStatus::Pending && self.deadline <= now
    }

    /// Checks that moving to `to` is allowed from the current status.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::InvalidTransition`] when the transaction is
    /// already terminal or `to` is not terminal.
    pub fn ensure_transition(&self, to: TransactionStatus) -> Result<(), BoxOfficeError> {
        if self.status.can_transition_to(to) {
            Ok(())
        } else {
            Err(BoxOfficeError::InvalidTransition {
                id: self.id,
                from: self.status,
                to,
            })
        }
    }
}
