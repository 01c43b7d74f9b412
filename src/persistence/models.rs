//! Database row types and their conversion into domain types.
//!
//! Counts are stored as `INTEGER` (`i32`) and guarded by `CHECK (... >= 0)`
//! constraints; conversion back to `u32` still fails loudly rather than
//! wrapping if a row ever violates that.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::domain::{
    Event, EventId, Notification, NotificationId, NotificationKind, TicketType, TicketTypeId,
    Transaction, TransactionId, UserId, WaitlistEntry, WaitlistEntryId,
};
use crate::error::BoxOfficeError;

fn count(column: &str, value: i32) -> Result<u32, BoxOfficeError> {
    u32::try_from(value).map_err(|_| {
        BoxOfficeError::PersistenceFailure(format!("negative {column} in stored row: {value}"))
    })
}

/// Converts a domain count into its column representation.
///
/// # Errors
///
/// Returns [`BoxOfficeError::InvalidRequest`] if `value` exceeds `i32::MAX`.
pub fn to_column(column: &str, value: u32) -> Result<i32, BoxOfficeError> {
    i32::try_from(value)
        .map_err(|_| BoxOfficeError::InvalidRequest(format!("{column} too large: {value}")))
}

/// A row from `ticket_types`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TicketTypeRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning event.
    pub event_id: Uuid,
    /// Sale batch.
    pub batch: i32,
    /// Display name.
    pub name: String,
    /// Free text.
    pub description: String,
    /// Unit price in cents.
    pub price_cents: i64,
    /// Current stock.
    pub quantity_available: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<TicketTypeRow> for TicketType {
    type Error = BoxOfficeError;

    fn try_from(row: TicketTypeRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TicketTypeId::from_uuid(row.id),
            event_id: EventId::from_uuid(row.event_id),
            batch: count("batch", row.batch)?,
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            quantity_available: count("quantity_available", row.quantity_available)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

/// A row from `transactions`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct TransactionRow {
    /// Primary key.
    pub id: Uuid,
    /// Buyer.
    pub user_id: Uuid,
    /// Reserved ticket type.
    pub ticket_type_id: Uuid,
    /// Units held.
    pub quantity: i32,
    /// Price at reservation time.
    pub total_price_cents: i64,
    /// Lifecycle status.
    pub status: String,
    /// Payment deadline.
    pub deadline: DateTime<Utc>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = BoxOfficeError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: TransactionId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            ticket_type_id: TicketTypeId::from_uuid(row.ticket_type_id),
            quantity: count("quantity", row.quantity)?,
            total_price_cents: row.total_price_cents,
            status: row.status.parse()?,
            deadline: row.deadline,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row from `waitlist_entries`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct WaitlistRow {
    /// Primary key.
    pub id: Uuid,
    /// Waiting user.
    pub user_id: Uuid,
    /// Sold-out ticket type.
    pub ticket_type_id: Uuid,
    /// Join time.
    pub created_at: DateTime<Utc>,
}

impl From<WaitlistRow> for WaitlistEntry {
    fn from(row: WaitlistRow) -> Self {
        Self {
            id: WaitlistEntryId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            ticket_type_id: TicketTypeId::from_uuid(row.ticket_type_id),
            created_at: row.created_at,
        }
    }
}

/// A row from `notifications`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    /// Primary key.
    pub id: Uuid,
    /// Recipient.
    pub user_id: Uuid,
    /// Kind discriminator.
    pub kind: String,
    /// Rendered message.
    pub content: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When the user read it.
    pub read_at: Option<DateTime<Utc>>,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = BoxOfficeError;

    fn try_from(row: NotificationRow) -> Result<Self, Self::Error> {
        let kind = NotificationKind::parse(&row.kind).ok_or_else(|| {
            BoxOfficeError::PersistenceFailure(format!("unknown notification kind: {}", row.kind))
        })?;
        Ok(Self {
            id: NotificationId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            kind,
            content: row.content,
            created_at: row.created_at,
            read_at: row.read_at,
        })
    }
}

/// A row from `events`.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Primary key.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Free text.
    pub description: String,
    /// City.
    pub location_city: String,
    /// State or region.
    pub location_state: String,
    /// Country.
    pub location_country: String,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day.
    pub end_date: NaiveDate,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update.
    pub updated_at: DateTime<Utc>,
}

impl From<EventRow> for Event {
    fn from(row: EventRow) -> Self {
        Self {
            id: EventId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            location_city: row.location_city,
            location_state: row.location_state,
            location_country: row.location_country,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::TransactionStatus;

    fn tx_row(status: &str, quantity: i32) -> TransactionRow {
        let now = Utc::now();
        TransactionRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            ticket_type_id: Uuid::new_v4(),
            quantity,
            total_price_cents: 3_000,
            status: status.to_string(),
            deadline: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn transaction_row_converts() {
        let Ok(tx) = Transaction::try_from(tx_row("paid", 3)) else {
            panic!("row should convert");
        };
        assert_eq!(tx.status, TransactionStatus::Paid);
        assert_eq!(tx.quantity, 3);
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let result = Transaction::try_from(tx_row("pending", -1));
        assert!(matches!(result, Err(BoxOfficeError::PersistenceFailure(_))));
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!(Transaction::try_from(tx_row("refunded", 1)).is_err());
    }

    #[test]
    fn to_column_rejects_overflow() {
        assert_eq!(to_column("quantity", 7).ok(), Some(7));
        assert!(to_column("quantity", u32::MAX).is_err());
    }
}
