//! Waitlist service: sold-out registration and restock draining.

use std::sync::Arc;

use crate::domain::{
    Clock, EventBus, FeedEvent, NotificationPayload, TicketTypeId, UserId, WaitlistEntry,
};
use crate::error::BoxOfficeError;
use crate::notify::{self, Notifier};
use crate::persistence::{InventoryStore, WaitlistStore};

/// Registers users on sold-out ticket types and notifies them when stock
/// comes back.
#[derive(Debug, Clone)]
pub struct WaitlistService {
    inventory: Arc<dyn InventoryStore>,
    waitlist: Arc<dyn WaitlistStore>,
    notifier: Arc<dyn Notifier>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
}

impl WaitlistService {
    /// Creates a new `WaitlistService`.
    #[must_use]
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        waitlist: Arc<dyn WaitlistStore>,
        notifier: Arc<dyn Notifier>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            inventory,
            waitlist,
            notifier,
            event_bus,
            clock,
        }
    }

    /// Puts `user_id` on the waitlist of a sold-out ticket type.
    ///
    /// Joining twice returns the existing entry. The flag is `true` when a
    /// new entry was created.
    ///
    /// A new entry is followed by [`Self::notify_available`], so stock that
    /// came back between the sold-out check and the insert still reaches
    /// the joining user.
    ///
    /// # Errors
    ///
    /// - [`BoxOfficeError::TicketTypeNotFound`] if missing or deleted.
    /// - [`BoxOfficeError::TicketsStillAvailable`] if stock remains.
    pub async fn join(
        &self,
        user_id: UserId,
        ticket_type_id: TicketTypeId,
    ) -> Result<(WaitlistEntry, bool), BoxOfficeError> {
        let ticket = self
            .inventory
            .get_ticket_type(ticket_type_id)
            .await?
            .filter(|t| !t.is_deleted())
            .ok_or(BoxOfficeError::TicketTypeNotFound(ticket_type_id))?;
        if !ticket.is_sold_out() {
            return Err(BoxOfficeError::TicketsStillAvailable(ticket_type_id));
        }

        let entry = WaitlistEntry::new(user_id, ticket_type_id, self.clock.now());
        let (entry, created) = self.waitlist.join(&entry).await?;
        if created {
            tracing::info!(%user_id, %ticket_type_id, "joined waitlist");
            if let Err(e) = self.notify_available(ticket_type_id).await {
                tracing::warn!(%ticket_type_id, error = %e, "waitlist recheck failed");
            }
        }
        Ok((entry, created))
    }

    /// Removes and returns every entry for a ticket type, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    pub async fn drain(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> Result<Vec<WaitlistEntry>, BoxOfficeError> {
        self.waitlist.drain(ticket_type_id).await
    }

    /// Entries for a ticket type, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    pub async fn list(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> Result<Vec<WaitlistEntry>, BoxOfficeError> {
        self.waitlist.list(ticket_type_id).await
    }

    /// Drains the waitlist of a ticket type that has stock and notifies
    /// every drained user. Returns the drained entries.
    ///
    /// Nothing is drained while the ticket type is sold out or deleted.
    /// A failed notification is logged and the entry is not re-queued.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    pub async fn notify_available(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> Result<Vec<WaitlistEntry>, BoxOfficeError> {
        let Some(ticket) = self.inventory.get_ticket_type(ticket_type_id).await? else {
            return Ok(Vec::new());
        };
        if ticket.is_deleted() || ticket.is_sold_out() {
            return Ok(Vec::new());
        }

        let drained = self.waitlist.drain(ticket_type_id).await?;
        if drained.is_empty() {
            return Ok(drained);
        }

        let payload = NotificationPayload::WaitlistAvailable {
            ticket_type_id,
            ticket_name: ticket.name.clone(),
            quantity_available: ticket.quantity_available,
        };
        let mut notified = 0usize;
        for entry in &drained {
            if notify::deliver(self.notifier.as_ref(), entry.user_id, &payload).await {
                notified = notified.saturating_add(1);
            }
        }

        let _ = self.event_bus.publish(FeedEvent::WaitlistDrained {
            ticket_type_id,
            notified,
            timestamp: self.clock.now(),
        });
        tracing::info!(
            %ticket_type_id,
            drained = drained.len(),
            notified,
            "waitlist drained"
        );
        Ok(drained)
    }
}
