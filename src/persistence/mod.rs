//! Persistence layer: inventory, transaction ledger, waitlist, notifications
//! and events.
//!
//! Each concern is a trait so services receive exactly the capability they
//! need. Two backends implement all of them: [`postgres::PostgresStore`]
//! (`sqlx::PgPool`) and [`memory::MemoryStore`] (tests, and servers started
//! with persistence disabled). [`Stores`] bundles one backend behind the
//! trait objects and is injected into every service.
//!
//! Inventory is never written by saving a modified copy of a row. All
//! quantity changes go through [`InventoryStore::try_reserve`],
//! [`InventoryStore::release`], [`InventoryStore::restock`] and
//! [`TransactionLedger::close_pending`], each of which is one atomic unit.

pub mod memory;
pub mod models;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{
    Event, EventId, Notification, NotificationId, TicketType, TicketTypeId, Transaction,
    TransactionId, TransactionStatus, UserId, WaitlistEntry,
};
use crate::error::BoxOfficeError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Result of closing a `Pending` transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedTransaction {
    /// The transaction in its new terminal status.
    pub transaction: Transaction,
    /// Stock after the release, when the new status releases inventory.
    pub remaining: Option<u32>,
}

/// Per-ticket-type stock and catalog.
#[async_trait]
pub trait InventoryStore: Send + Sync + fmt::Debug {
    /// Inserts a new ticket type.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn create_ticket_type(&self, ticket: &TicketType) -> Result<(), BoxOfficeError>;

    /// Loads a ticket type, including soft-deleted ones.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn get_ticket_type(&self, id: TicketTypeId)
    -> Result<Option<TicketType>, BoxOfficeError>;

    /// Lists live ticket types, optionally restricted to one event.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn list_ticket_types(
        &self,
        event_id: Option<EventId>,
    ) -> Result<Vec<TicketType>, BoxOfficeError>;

    /// Persists the descriptive fields of `ticket` (batch, name,
    /// description, price) and returns the stored row. The stored quantity
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::TicketTypeNotFound`] if the ticket type is
    /// missing or deleted.
    async fn save_ticket_type(&self, ticket: &TicketType) -> Result<TicketType, BoxOfficeError>;

    /// Soft-deletes a ticket type.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::TicketTypeNotFound`] if it is missing or
    /// already deleted.
    async fn delete_ticket_type(
        &self,
        id: TicketTypeId,
        now: DateTime<Utc>,
    ) -> Result<(), BoxOfficeError>;

    /// Atomically checks `quantity_available >= quantity` and decrements.
    /// Returns the ticket type after the decrement.
    ///
    /// # Errors
    ///
    /// - [`BoxOfficeError::TicketTypeNotFound`] if missing or deleted.
    /// - [`BoxOfficeError::InsufficientInventory`] if not enough stock; no
    ///   state is mutated.
    async fn try_reserve(
        &self,
        id: TicketTypeId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<TicketType, BoxOfficeError>;

    /// Atomically returns `quantity` units. Works on deleted ticket types so
    /// compensations always land. Returns the new stock.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::TicketTypeNotFound`] if the row is gone.
    async fn release(
        &self,
        id: TicketTypeId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<u32, BoxOfficeError>;

    /// Atomically adds stock to a live ticket type.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::TicketTypeNotFound`] if missing or deleted.
    async fn restock(
        &self,
        id: TicketTypeId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<TicketType, BoxOfficeError>;
}

/// Purchase attempts and their status transitions.
#[async_trait]
pub trait TransactionLedger: Send + Sync + fmt::Debug {
    /// Inserts a new `Pending` transaction.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn create_transaction(&self, transaction: &Transaction) -> Result<(), BoxOfficeError>;

    /// Loads a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, BoxOfficeError>;

    /// Moves a transaction out of `Pending` into `to`, conditioned on it
    /// still being `Pending`. When `to` releases inventory, the quantity is
    /// returned to the ticket type in the same atomic unit.
    ///
    /// Returns `None` when the transaction is missing or no longer
    /// `Pending` (another writer won).
    ///
    /// # Errors
    ///
    /// - [`BoxOfficeError::InvalidRequest`] if `to` is `Pending`.
    /// - [`BoxOfficeError::ConcurrencyConflict`] /
    ///   [`BoxOfficeError::PersistenceFailure`] on storage failure; nothing
    ///   is applied in that case.
    async fn close_pending(
        &self,
        id: TransactionId,
        to: TransactionStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<ClosedTransaction>, BoxOfficeError>;

    /// Every `Pending` transaction whose deadline is at or before `before`,
    /// oldest deadline first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn find_pending_expired(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, BoxOfficeError>;

    /// A user's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Transaction>, BoxOfficeError>;

    /// All transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn list_transactions(&self) -> Result<Vec<Transaction>, BoxOfficeError>;

    /// Paid transactions for events starting on `date`.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn find_paid_for_event_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Transaction>, BoxOfficeError>;
}

/// Users waiting for sold-out ticket types.
#[async_trait]
pub trait WaitlistStore: Send + Sync + fmt::Debug {
    /// Adds `entry` unless the same user already waits for the same ticket
    /// type. Returns the stored entry and whether it was newly created.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn join(&self, entry: &WaitlistEntry) -> Result<(WaitlistEntry, bool), BoxOfficeError>;

    /// Removes and returns every entry for a ticket type, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn drain(&self, ticket_type_id: TicketTypeId)
    -> Result<Vec<WaitlistEntry>, BoxOfficeError>;

    /// Entries for a ticket type, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn list(&self, ticket_type_id: TicketTypeId)
    -> Result<Vec<WaitlistEntry>, BoxOfficeError>;
}

/// Stored user notifications.
#[async_trait]
pub trait NotificationStore: Send + Sync + fmt::Debug {
    /// Stores a notification.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn record(&self, notification: &Notification) -> Result<(), BoxOfficeError>;

    /// A user's notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Notification>, BoxOfficeError>;

    /// Marks a notification owned by `user_id` as read. Returns `None` if
    /// no such notification belongs to the user.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, BoxOfficeError>;
}

/// Events that ticket types belong to.
#[async_trait]
pub trait EventCatalog: Send + Sync + fmt::Debug {
    /// Inserts an event.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn create_event(&self, event: &Event) -> Result<(), BoxOfficeError>;

    /// Loads an event.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn get_event(&self, id: EventId) -> Result<Option<Event>, BoxOfficeError>;

    /// All events ordered by start date.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    async fn list_events(&self) -> Result<Vec<Event>, BoxOfficeError>;

    /// Overwrites an existing event.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::EventNotFound`] if the event is missing.
    async fn save_event(&self, event: &Event) -> Result<(), BoxOfficeError>;
}

/// One storage backend exposed through every persistence capability.
#[derive(Debug, Clone)]
pub struct Stores {
    /// Ticket types and stock.
    pub inventory: Arc<dyn InventoryStore>,
    /// Transactions.
    pub ledger: Arc<dyn TransactionLedger>,
    /// Waitlist entries.
    pub waitlist: Arc<dyn WaitlistStore>,
    /// Notifications.
    pub notifications: Arc<dyn NotificationStore>,
    /// Events.
    pub events: Arc<dyn EventCatalog>,
}

impl Stores {
    /// Wraps a backend implementing every capability.
    #[must_use]
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: InventoryStore
            + TransactionLedger
            + WaitlistStore
            + NotificationStore
            + EventCatalog
            + 'static,
    {
        let inventory = Arc::clone(&backend) as Arc<dyn InventoryStore>;
        let ledger = Arc::clone(&backend) as Arc<dyn TransactionLedger>;
        let waitlist = Arc::clone(&backend) as Arc<dyn WaitlistStore>;
        let notifications = Arc::clone(&backend) as Arc<dyn NotificationStore>;
        let events: Arc<dyn EventCatalog> = backend;
        Self {
            inventory,
            ledger,
            waitlist,
            notifications,
            events,
        }
    }

    /// Fresh in-memory backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }

    /// PostgreSQL backend over an existing pool.
    #[must_use]
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        Self::from_backend(Arc::new(PostgresStore::new(pool)))
    }
}
