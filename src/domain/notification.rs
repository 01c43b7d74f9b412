//! User notifications: confirmations, reminders, waitlist availability.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, NotificationId, TicketTypeId, TransactionId, UserId};

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A reservation was created.
    Confirmation,
    /// An event the user holds paid tickets for starts tomorrow.
    Reminder,
    /// A waitlisted ticket type has stock again.
    WaitlistAvailable,
}

impl NotificationKind {
    /// Database / wire representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation",
            Self::Reminder => "reminder",
            Self::WaitlistAvailable => "waitlist_available",
        }
    }

    /// Parses the database representation.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "confirmation" => Some(Self::Confirmation),
            "reminder" => Some(Self::Reminder),
            "waitlist_available" => Some(Self::WaitlistAvailable),
            _ => None,
        }
    }
}

/// Structured data handed to a [`crate::notify::Notifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    /// Reservation created; payment due before `deadline`.
    Confirmation {
        /// Created transaction.
        transaction_id: TransactionId,
        /// Reserved ticket type.
        ticket_type_id: TicketTypeId,
        /// Ticket type display name.
        ticket_name: String,
        /// Reserved units.
        quantity: u32,
        /// Amount due in minor units.
        total_price_cents: i64,
        /// Payment deadline.
        deadline: DateTime<Utc>,
    },
    /// Event starts soon.
    Reminder {
        /// Paid transaction the reminder is about.
        transaction_id: TransactionId,
        /// Event identifier.
        event_id: EventId,
        /// Event name.
        event_name: String,
        /// First day of the event.
        start_date: NaiveDate,
        /// Ticket type display name.
        ticket_name: String,
        /// Purchased units.
        quantity: u32,
    },
    /// Waitlisted ticket type has stock again.
    WaitlistAvailable {
        /// Ticket type that was restocked.
        ticket_type_id: TicketTypeId,
        /// Ticket type display name.
        ticket_name: String,
        /// Units available at drain time.
        quantity_available: u32,
    },
}

impl NotificationPayload {
    /// The kind this payload is delivered as.
    #[must_use]
    pub const fn kind(&self) -> NotificationKind {
        match self {
            Self::Confirmation { .. } => NotificationKind::Confirmation,
            Self::Reminder { .. } => NotificationKind::Reminder,
            Self::WaitlistAvailable { .. } => NotificationKind::WaitlistAvailable,
        }
    }

    /// Human-readable message body.
    #[must_use]
    pub fn content(&self) -> String {
        match self {
            Self::Confirmation {
                ticket_name,
                quantity,
                total_price_cents,
                deadline,
                ..
            } => format!(
                "Your reservation of {quantity} x {ticket_name} is confirmed. \
                 Total {}. Complete payment before {}.",
                format_cents(*total_price_cents),
                deadline.format("%Y-%m-%d %H:%M UTC"),
            ),
            Self::Reminder {
                event_name,
                start_date,
                ticket_name,
                quantity,
                ..
            } => format!(
                "Reminder: {event_name} starts on {}. You hold {quantity} x {ticket_name}.",
                start_date.format("%d-%m-%Y"),
            ),
            Self::WaitlistAvailable {
                ticket_name,
                quantity_available,
                ..
            } => format!(
                "Tickets are available again for {ticket_name} ({quantity_available} left)."
            ),
        }
    }
}

fn format_cents(cents: i64) -> String {
    format!("{}.{:02}", cents / 100, (cents % 100).abs())
}

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    /// Notification identifier.
    pub id: NotificationId,
    /// Recipient.
    pub user_id: UserId,
    /// Category.
    pub kind: NotificationKind,
    /// Rendered message.
    pub content: String,
    /// When it was recorded.
    pub created_at: DateTime<Utc>,
    /// When the recipient marked it read.
    pub read_at: Option<DateTime<Utc>>,
}

impl Notification {
    /// Renders `payload` into a new unread notification for `user_id`.
    #[must_use]
    pub fn from_payload(user_id: UserId, payload: &NotificationPayload, now: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            kind: payload.kind(),
            content: payload.content(),
            created_at: now,
            read_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_content_formats_price() {
        let payload = NotificationPayload::Confirmation {
            transaction_id: TransactionId::new(),
            ticket_type_id: TicketTypeId::new(),
            ticket_name: "VIP".to_string(),
            quantity: 2,
            total_price_cents: 50_005,
            deadline: Utc::now(),
        };
        assert_eq!(payload.kind(), NotificationKind::Confirmation);
        assert!(payload.content().contains("2 x VIP"));
        assert!(payload.content().contains("500.05"));
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            NotificationKind::Confirmation,
            NotificationKind::Reminder,
            NotificationKind::WaitlistAvailable,
        ] {
            assert_eq!(NotificationKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(NotificationKind::parse("update"), None);
    }

    #[test]
    fn from_payload_starts_unread() {
        let user = UserId::new();
        let payload = NotificationPayload::WaitlistAvailable {
            ticket_type_id: TicketTypeId::new(),
            ticket_name: "GA".to_string(),
            quantity_available: 3,
        };
        let n = Notification::from_payload(user, &payload, Utc::now());
        assert_eq!(n.user_id, user);
        assert_eq!(n.kind, NotificationKind::WaitlistAvailable);
        assert!(n.read_at.is_none());
    }
}
