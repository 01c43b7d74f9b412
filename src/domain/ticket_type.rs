//! Ticket types: the purchasable categories of an event and their stock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EventId, TicketTypeId};
use crate::error::BoxOfficeError;

/// A purchasable category within an event.
///
/// `quantity_available` is the single source of truth for remaining
/// inventory. It is only ever changed through the atomic operations of
/// [`crate::persistence::InventoryStore`], never by saving a modified copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TicketType {
    /// Unique ticket type identifier.
    pub id: TicketTypeId,
    /// Event this ticket type belongs to.
    pub event_id: EventId,
    /// Sales batch number (early bird = 1, regular = 2, ...).
    pub batch: u32,
    /// Display name, e.g. `"VIP"`.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Unit price in minor currency units.
    pub price_cents: i64,
    /// Units still available for reservation.
    pub quantity_available: u32,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker. Deleted ticket types cannot be reserved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TicketType {
    /// Builds a ticket type from a creation request.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::InvalidRequest`] if the request is invalid.
    pub fn create(new: NewTicketType, now: DateTime<Utc>) -> Result<Self, BoxOfficeError> {
        new.validate()?;
        Ok(Self {
            id: TicketTypeId::new(),
            event_id: new.event_id,
            batch: new.batch,
            name: new.name,
            description: new.description,
            price_cents: new.price_cents,
            quantity_available: new.quantity_available,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Returns `true` once the ticket type has been soft-deleted.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns `true` when nothing is left to reserve.
    #[must_use]
    pub const fn is_sold_out(&self) -> bool {
        self.quantity_available == 0
    }

    /// Total price for `quantity` units.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::InvalidRequest`] on arithmetic overflow.
    pub fn total_price(&self, quantity: u32) -> Result<i64, BoxOfficeError> {
        self.price_cents
            .checked_mul(i64::from(quantity))
            .ok_or_else(|| BoxOfficeError::InvalidRequest("total price overflows".to_string()))
    }

    /// Applies descriptive changes. Inventory is not part of the patch.
    pub fn apply(&mut self, patch: TicketTypePatch, now: DateTime<Utc>) {
        if let Some(batch) = patch.batch {
            self.batch = batch;
        }
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(price_cents) = patch.price_cents {
            self.price_cents = price_cents;
        }
        self.updated_at = now;
    }
}

/// Creation request for a ticket type.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewTicketType {
    /// Owning event.
    pub event_id: EventId,
    /// Sales batch number.
    #[serde(default = "default_batch")]
    pub batch: u32,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Unit price in minor currency units.
    pub price_cents: i64,
    /// Initial stock.
    pub quantity_available: u32,
}

const fn default_batch() -> u32 {
    1
}

impl NewTicketType {
    fn validate(&self) -> Result<(), BoxOfficeError> {
        if self.name.trim().is_empty() {
            return Err(BoxOfficeError::InvalidRequest(
                "ticket type name must not be empty".to_string(),
            ));
        }
        if self.price_cents < 0 {
            return Err(BoxOfficeError::InvalidRequest(
                "price must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Descriptive update of a ticket type. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TicketTypePatch {
    /// New batch number.
    #[serde(default)]
    pub batch: Option<u32>,
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default)]
    pub description: Option<String>,
    /// New unit price. Applies to future reservations only.
    #[serde(default)]
    pub price_cents: Option<i64>,
}

impl TicketTypePatch {
    /// Validates the patch fields that are present.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::InvalidRequest`] on an empty name or a
    /// negative price.
    pub fn validate(&self) -> Result<(), BoxOfficeError> {
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(BoxOfficeError::InvalidRequest(
                "ticket type name must not be empty".to_string(),
            ));
        }
        if self.price_cents.is_some_and(|p| p < 0) {
            return Err(BoxOfficeError::InvalidRequest(
                "price must not be negative".to_string(),
            ));
        }
        Ok(())
    }
}
