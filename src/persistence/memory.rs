//! In-memory backend with per-row fine-grained locking.
//!
//! Ticket types and transactions live in `RwLock<HashMap<...>>` maps where
//! each row is individually protected by a [`tokio::sync::Mutex`]. The
//! row mutex is what makes check-and-decrement and close-and-release
//! atomic: a reservation holds the ticket type's mutex across the check
//! and the decrement, and closing a transaction holds the transaction's
//! mutex across the status check, the status write and the inventory
//! increment.
//!
//! Lock order is always transaction row, then ticket type row.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::{Mutex, RwLock};

use super::{
    ClosedTransaction, EventCatalog, InventoryStore, NotificationStore, TransactionLedger,
    WaitlistStore,
};
use crate::domain::{
    Event, EventId, Notification, NotificationId, TicketType, TicketTypeId, Transaction,
    TransactionId, TransactionStatus, UserId, WaitlistEntry,
};
use crate::error::BoxOfficeError;

type Row<T> = Arc<Mutex<T>>;

/// Process-local storage for every persistence capability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ticket_types: RwLock<HashMap<TicketTypeId, Row<TicketType>>>,
    transactions: RwLock<HashMap<TransactionId, Row<Transaction>>>,
    waitlist: Mutex<Vec<WaitlistEntry>>,
    notifications: RwLock<Vec<Notification>>,
    events: RwLock<HashMap<EventId, Event>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn ticket_row(&self, id: TicketTypeId) -> Result<Row<TicketType>, BoxOfficeError> {
        self.ticket_types
            .read()
            .await
            .get(&id)
            .map(Arc::clone)
            .ok_or(BoxOfficeError::TicketTypeNotFound(id))
    }

    async fn transaction_rows(&self) -> Vec<Row<Transaction>> {
        self.transactions
            .read()
            .await
            .values()
            .map(Arc::clone)
            .collect()
    }

    async fn snapshot_transactions<F>(&self, keep: F) -> Vec<Transaction>
    where
        F: Fn(&Transaction) -> bool,
    {
        let mut out = Vec::new();
        for row in self.transaction_rows().await {
            let tx = row.lock().await;
            if keep(&tx) {
                out.push(tx.clone());
            }
        }
        out
    }
}

#[async_trait]
impl InventoryStore for MemoryStore {
    async fn create_ticket_type(&self, ticket: &TicketType) -> Result<(), BoxOfficeError> {
        let mut map = self.ticket_types.write().await;
        if map.contains_key(&ticket.id) {
            return Err(BoxOfficeError::InvalidRequest(format!(
                "ticket type {} already exists",
                ticket.id
            )));
        }
        map.insert(ticket.id, Arc::new(Mutex::new(ticket.clone())));
        Ok(())
    }

    async fn get_ticket_type(
        &self,
        id: TicketTypeId,
    ) -> Result<Option<TicketType>, BoxOfficeError> {
        let Ok(row) = self.ticket_row(id).await else {
            return Ok(None);
        };
        let ticket = row.lock().await.clone();
        Ok(Some(ticket))
    }

    async fn list_ticket_types(
        &self,
        event_id: Option<EventId>,
    ) -> Result<Vec<TicketType>, BoxOfficeError> {
        let rows: Vec<_> = self
            .ticket_types
            .read()
            .await
            .values()
            .map(Arc::clone)
            .collect();
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let ticket = row.lock().await;
            if ticket.is_deleted() || event_id.is_some_and(|e| e != ticket.event_id) {
                continue;
            }
            out.push(ticket.clone());
        }
        out.sort_by(|a, b| a.batch.cmp(&b.batch).then(a.created_at.cmp(&b.created_at)));
        Ok(out)
    }

    async fn save_ticket_type(&self, ticket: &TicketType) -> Result<TicketType, BoxOfficeError> {
        let row = self.ticket_row(ticket.id).await?;
        let mut stored = row.lock().await;
        if stored.is_deleted() {
            return Err(BoxOfficeError::TicketTypeNotFound(ticket.id));
        }
        stored.batch = ticket.batch;
        stored.name.clone_from(&ticket.name);
        stored.description.clone_from(&ticket.description);
        stored.price_cents = ticket.price_cents;
        stored.updated_at = ticket.updated_at;
        Ok(stored.clone())
    }

    async fn delete_ticket_type(
        &self,
        id: TicketTypeId,
        now: DateTime<Utc>,
    ) -> Result<(), BoxOfficeError> {
        let row = self.ticket_row(id).await?;
        let mut stored = row.lock().await;
        if stored.is_deleted() {
            return Err(BoxOfficeError::TicketTypeNotFound(id));
        }
        stored.deleted_at = Some(now);
        stored.updated_at = now;
        Ok(())
    }

    async fn try_reserve(
        &self,
        id: TicketTypeId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<TicketType, BoxOfficeError> {
        let row = self.ticket_row(id).await?;
        let mut ticket = row.lock().await;
        if ticket.is_deleted() {
            return Err(BoxOfficeError::TicketTypeNotFound(id));
        }
        let Some(remaining) = ticket.quantity_available.checked_sub(quantity) else {
            return Err(BoxOfficeError::InsufficientInventory {
                requested: quantity,
                available: ticket.quantity_available,
            });
        };
        ticket.quantity_available = remaining;
        ticket.updated_at = now;
        Ok(ticket.clone())
    }

    async fn release(
        &self,
        id: TicketTypeId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<u32, BoxOfficeError> {
        let row = self.ticket_row(id).await?;
        let mut ticket = row.lock().await;
        ticket.quantity_available = ticket.quantity_available.saturating_add(quantity);
        ticket.updated_at = now;
        Ok(ticket.quantity_available)
    }

    async fn restock(
        &self,
        id: TicketTypeId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<TicketType, BoxOfficeError> {
        let row = self.ticket_row(id).await?;
        let mut ticket = row.lock().await;
        if ticket.is_deleted() {
            return Err(BoxOfficeError::TicketTypeNotFound(id));
        }
        ticket.quantity_available = ticket.quantity_available.saturating_add(quantity);
        ticket.updated_at = now;
        Ok(ticket.clone())
    }
}

#[async_trait]
impl TransactionLedger for MemoryStore {
    async fn create_transaction(&self, transaction: &Transaction) -> Result<(), BoxOfficeError> {
        let mut map = self.transactions.write().await;
        if map.contains_key(&transaction.id) {
            return Err(BoxOfficeError::InvalidRequest(format!(
                "transaction {} already exists",
                transaction.id
            )));
        }
        map.insert(transaction.id, Arc::new(Mutex::new(transaction.clone())));
        Ok(())
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, BoxOfficeError> {
        let row = self.transactions.read().await.get(&id).map(Arc::clone);
        match row {
            Some(row) => Ok(Some(row.lock().await.clone())),
            None => Ok(None),
        }
    }

    async fn close_pending(
        &self,
        id: TransactionId,
        to: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<ClosedTransaction>, BoxOfficeError> {
        if !to.is_terminal() {
            return Err(BoxOfficeError::InvalidRequest(
                "a transaction can only be closed into a terminal status".to_string(),
            ));
        }
        let Some(row) = self.transactions.read().await.get(&id).map(Arc::clone) else {
            return Ok(None);
        };
        let mut tx = row.lock().await;
        if tx.status != TransactionStatus::Pending {
            return Ok(None);
        }

        let remaining = if to.releases_inventory() {
            let ticket_row = self.ticket_row(tx.ticket_type_id).await?;
            let mut ticket = ticket_row.lock().await;
            ticket.quantity_available = ticket.quantity_available.saturating_add(tx.quantity);
            ticket.updated_at = now;
            Some(ticket.quantity_available)
        } else {
            None
        };

        tx.status = to;
        tx.updated_at = now;
        Ok(Some(ClosedTransaction {
            transaction: tx.clone(),
            remaining,
        }))
    }

    async fn find_pending_expired(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, BoxOfficeError> {
        let mut out = self.snapshot_transactions(|tx| tx.is_overdue(before)).await;
        out.sort_by_key(|tx| tx.deadline);
        Ok(out)
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Transaction>, BoxOfficeError> {
        let mut out = self.snapshot_transactions(|tx| tx.user_id == user_id).await;
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, BoxOfficeError> {
        let mut out = self.snapshot_transactions(|_| true).await;
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn find_paid_for_event_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Transaction>, BoxOfficeError> {
        let starting: Vec<EventId> = self
            .events
            .read()
            .await
            .values()
            .filter(|e| e.start_date == date)
            .map(|e| e.id)
            .collect();
        if starting.is_empty() {
            return Ok(Vec::new());
        }

        let rows: Vec<_> = self
            .ticket_types
            .read()
            .await
            .values()
            .map(Arc::clone)
            .collect();
        let mut ticket_ids = Vec::new();
        for row in rows {
            let ticket = row.lock().await;
            if starting.contains(&ticket.event_id) {
                ticket_ids.push(ticket.id);
            }
        }

        let mut out = self
            .snapshot_transactions(|tx| {
                tx.status == TransactionStatus::Paid && ticket_ids.contains(&tx.ticket_type_id)
            })
            .await;
        out.sort_by_key(|tx| tx.created_at);
        Ok(out)
    }
}

#[async_trait]
impl WaitlistStore for MemoryStore {
    async fn join(&self, entry: &WaitlistEntry) -> Result<(WaitlistEntry, bool), BoxOfficeError> {
        let mut entries = self.waitlist.lock().await;
        if let Some(existing) = entries
            .iter()
            .find(|e| e.user_id == entry.user_id && e.ticket_type_id == entry.ticket_type_id)
        {
            return Ok((existing.clone(), false));
        }
        entries.push(entry.clone());
        Ok((entry.clone(), true))
    }

    async fn drain(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> Result<Vec<WaitlistEntry>, BoxOfficeError> {
        let mut entries = self.waitlist.lock().await;
        let (mut drained, kept): (Vec<_>, Vec<_>) = entries
            .drain(..)
            .partition(|e| e.ticket_type_id == ticket_type_id);
        *entries = kept;
        drained.sort_by_key(|e| e.created_at);
        Ok(drained)
    }

    async fn list(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> Result<Vec<WaitlistEntry>, BoxOfficeError> {
        let entries = self.waitlist.lock().await;
        let mut out: Vec<_> = entries
            .iter()
            .filter(|e| e.ticket_type_id == ticket_type_id)
            .cloned()
            .collect();
        out.sort_by_key(|e| e.created_at);
        Ok(out)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn record(&self, notification: &Notification) -> Result<(), BoxOfficeError> {
        self.notifications.write().await.push(notification.clone());
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Notification>, BoxOfficeError> {
        let mut out: Vec<_> = self
            .notifications
            .read()
            .await
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, BoxOfficeError> {
        let mut all = self.notifications.write().await;
        let Some(n) = all.iter_mut().find(|n| n.id == id && n.user_id == user_id) else {
            return Ok(None);
        };
        if n.read_at.is_none() {
            n.read_at = Some(now);
        }
        Ok(Some(n.clone()))
    }
}

#[async_trait]
impl EventCatalog for MemoryStore {
    async fn create_event(&self, event: &Event) -> Result<(), BoxOfficeError> {
        self.events.write().await.insert(event.id, event.clone());
        Ok(())
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, BoxOfficeError> {
        Ok(self.events.read().await.get(&id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>, BoxOfficeError> {
        let mut out: Vec<_> = self.events.read().await.values().cloned().collect();
        out.sort_by_key(|e| e.start_date);
        Ok(out)
    }

    async fn save_event(&self, event: &Event) -> Result<(), BoxOfficeError> {
        let mut map = self.events.write().await;
        let Some(stored) = map.get_mut(&event.id) else {
            return Err(BoxOfficeError::EventNotFound(event.id));
        };
        *stored = event.clone();
        Ok(())
    }
}
