//! Domain events reflecting inventory and transaction changes.
//!
//! Every inventory mutation emits a [`FeedEvent`] through the
//! [`super::EventBus`]. Events are broadcast to WebSocket subscribers
//! filtered by ticket type.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{TicketTypeId, TransactionId, TransactionStatus};

/// Domain event emitted after every inventory-relevant mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// A ticket type was put on sale.
    TicketTypeCreated {
        /// Ticket type identifier.
        ticket_type_id: TicketTypeId,
        /// Initial stock.
        quantity_available: u32,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Units were held by a new `Pending` transaction.
    InventoryReserved {
        /// Ticket type identifier.
        ticket_type_id: TicketTypeId,
        /// Holding transaction.
        transaction_id: TransactionId,
        /// Units held.
        quantity: u32,
        /// Stock left after the hold.
        remaining: u32,
        /// Reservation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A transaction left `Pending` without payment and returned its units.
    InventoryReleased {
        /// Ticket type identifier.
        ticket_type_id: TicketTypeId,
        /// Released transaction.
        transaction_id: TransactionId,
        /// Units returned.
        quantity: u32,
        /// Stock after the release.
        remaining: u32,
        /// Terminal status the transaction reached.
        status: TransactionStatus,
        /// Release timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An operator added stock.
    InventoryRestocked {
        /// Ticket type identifier.
        ticket_type_id: TicketTypeId,
        /// Units added.
        added: u32,
        /// Stock after the restock.
        remaining: u32,
        /// Restock timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Payment for a transaction was confirmed.
    PaymentConfirmed {
        /// Ticket type identifier.
        ticket_type_id: TicketTypeId,
        /// Paid transaction.
        transaction_id: TransactionId,
        /// Confirmation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// The waitlist of a restocked ticket type was drained.
    WaitlistDrained {
        /// Ticket type identifier.
        ticket_type_id: TicketTypeId,
        /// Number of users notified.
        notified: usize,
        /// Drain timestamp.
        timestamp: DateTime<Utc>,
    },
}

impl FeedEvent {
    /// Returns the ticket type this event concerns.
    #[must_use]
    pub fn ticket_type_id(&self) -> TicketTypeId {
        match self {
            Self::TicketTypeCreated { ticket_type_id, .. }
            | Self::InventoryReserved { ticket_type_id, .. }
            | Self::InventoryReleased { ticket_type_id, .. }
            | Self::InventoryRestocked { ticket_type_id, .. }
            | Self::PaymentConfirmed { ticket_type_id, .. }
            | Self::WaitlistDrained { ticket_type_id, .. } => *ticket_type_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::TicketTypeCreated { .. } => "ticket_type_created",
            Self::InventoryReserved { .. } => "inventory_reserved",
            Self::InventoryReleased { .. } => "inventory_released",
            Self::InventoryRestocked { .. } => "inventory_restocked",
            Self::PaymentConfirmed { .. } => "payment_confirmed",
            Self::WaitlistDrained { .. } => "waitlist_drained",
        }
    }
}
