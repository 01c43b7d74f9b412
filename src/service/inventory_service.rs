//! Inventory service: ticket type catalog and operator restocks.

use std::sync::Arc;

use crate::domain::{
    Clock, EventBus, EventId, FeedEvent, NewTicketType, TicketType, TicketTypeId,
    TicketTypePatch,
};
use crate::error::BoxOfficeError;
use crate::persistence::{EventCatalog, InventoryStore};

use super::WaitlistService;

/// Manages ticket types. Stock only grows here through [`Self::restock`];
/// reservations and releases belong to the reservation flow.
#[derive(Debug, Clone)]
pub struct InventoryService {
    inventory: Arc<dyn InventoryStore>,
    events: Arc<dyn EventCatalog>,
    waitlist: Arc<WaitlistService>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl InventoryService {
    /// Creates a new `InventoryService`.
    #[must_use]
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        events: Arc<dyn EventCatalog>,
        waitlist: Arc<WaitlistService>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inventory,
            events,
            waitlist,
            event_bus,
            clock,
        }
    }

    /// Puts a new ticket type on sale for an existing event.
    ///
    /// # Errors
    ///
    /// - [`BoxOfficeError::InvalidRequest`] on invalid fields.
    /// - [`BoxOfficeError::EventNotFound`] if the event does not exist.
    pub async fn create(&self, new: NewTicketType) -> Result<TicketType, BoxOfficeError> {
        if self.events.get_event(new.event_id).await?.is_none() {
            return Err(BoxOfficeError::EventNotFound(new.event_id));
        }
        let now = self.clock.now();
        let ticket = TicketType::create(new, now)?;
        self.inventory.create_ticket_type(&ticket).await?;

        let _ = self.event_bus.publish(FeedEvent::TicketTypeCreated {
            ticket_type_id: ticket.id,
            quantity_available: ticket.quantity_available,
            timestamp: now,
        });
        tracing::info!(
            ticket_type_id = %ticket.id,
            event_id = %ticket.event_id,
            quantity = ticket.quantity_available,
            "ticket type created"
        );
        Ok(ticket)
    }

    /// Loads a live ticket type.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::TicketTypeNotFound`] if missing or deleted.
    pub async fn get(&self, id: TicketTypeId) -> Result<TicketType, BoxOfficeError> {
        self.inventory
            .get_ticket_type(id)
            .await?
            .filter(|t| !t.is_deleted())
            .ok_or(BoxOfficeError::TicketTypeNotFound(id))
    }

    /// Live ticket types, optionally for a single event.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    pub async fn list(&self, event_id: Option<EventId>) -> Result<Vec<TicketType>, BoxOfficeError> {
        self.inventory.list_ticket_types(event_id).await
    }

    /// Changes descriptive fields. Stock is not part of the patch.
    ///
    /// # Errors
    ///
    /// - [`BoxOfficeError::InvalidRequest`] on invalid fields.
    /// - [`BoxOfficeError::TicketTypeNotFound`] if missing or deleted.
    pub async fn update(
        &self,
        id: TicketTypeId,
        patch: TicketTypePatch,
    ) -> Result<TicketType, BoxOfficeError> {
        patch.validate()?;
        let mut ticket = self.get(id).await?;
        ticket.apply(patch, self.clock.now());
        let saved = self.inventory.save_ticket_type(&ticket).await?;
        tracing::info!(ticket_type_id = %id, "ticket type updated");
        Ok(saved)
    }

    /// Takes a ticket type off sale. Pending transactions still settle.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::TicketTypeNotFound`] if missing or already
    /// deleted.
    pub async fn delete(&self, id: TicketTypeId) -> Result<(), BoxOfficeError> {
        self.inventory.delete_ticket_type(id, self.clock.now()).await?;
        tracing::info!(ticket_type_id = %id, "ticket type deleted");
        Ok(())
    }

    /// Adds stock and notifies the waitlist.
    ///
    /// # Errors
    ///
    /// - [`BoxOfficeError::InvalidRequest`] if `quantity` is zero.
    /// - [`BoxOfficeError::TicketTypeNotFound`] if missing or deleted.
    pub async fn restock(
        &self,
        id: TicketTypeId,
        quantity: u32,
    ) -> Result<TicketType, BoxOfficeError> {
        if quantity == 0 {
            return Err(BoxOfficeError::InvalidRequest(
                "restock quantity must be positive".to_string(),
            ));
        }
        let now = self.clock.now();
        let ticket = self.inventory.restock(id, quantity, now).await?;

        let _ = self.event_bus.publish(FeedEvent::InventoryRestocked {
            ticket_type_id: id,
            added: quantity,
            remaining: ticket.quantity_available,
            timestamp: now,
        });
        tracing::info!(
            ticket_type_id = %id,
            added = quantity,
            remaining = ticket.quantity_available,
            "ticket type restocked"
        );

        if let Err(e) = self.waitlist.notify_available(id).await {
            tracing::warn!(ticket_type_id = %id, error = %e, "waitlist drain failed");
        }
        Ok(ticket)
    }
}
