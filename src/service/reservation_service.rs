//! Reservation service: holds inventory for new purchases and settles them.
//!
//! Every mutation follows the same pattern: one atomic store call, then
//! emit feed events, then (for releases) drain the waitlist. Stock is never
//! read, modified and written back.

use std::sync::Arc;

use chrono::Duration;

use crate::domain::{
    Clock, EventBus, FeedEvent, Identity, NotificationPayload, TicketTypeId, Transaction,
    TransactionId, TransactionStatus, UserId,
};
use crate::error::BoxOfficeError;
use crate::notify::{self, Notifier};
use crate::persistence::{InventoryStore, TransactionLedger};

use super::WaitlistService;

/// Orchestrates reservation and settlement of transactions.
#[derive(Debug, Clone)]
pub struct ReservationService {
    inventory: Arc<dyn InventoryStore>,
    ledger: Arc<dyn TransactionLedger>,
    waitlist: Arc<WaitlistService>,
    notifier: Arc<dyn Notifier>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    reservation_window: Duration,
}

impl ReservationService {
    /// Creates a new `ReservationService`.
    #[must_use]
    pub fn new(
        inventory: Arc<dyn InventoryStore>,
        ledger: Arc<dyn TransactionLedger>,
        waitlist: Arc<WaitlistService>,
        notifier: Arc<dyn Notifier>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
        reservation_window: Duration,
    ) -> Self {
        Self {
            inventory,
            ledger,
            waitlist,
            notifier,
            event_bus,
            clock,
            reservation_window,
        }
    }

    /// How long a `Pending` transaction holds its units.
    #[must_use]
    pub const fn reservation_window(&self) -> Duration {
        self.reservation_window
    }

    /// Holds `quantity` units of a ticket type and records a `Pending`
    /// transaction due at `now + reservation_window`.
    ///
    /// If the transaction cannot be recorded, the units are given back
    /// before the error is returned.
    ///
    /// # Errors
    ///
    /// - [`BoxOfficeError::InvalidRequest`] if `quantity` is zero.
    /// - [`BoxOfficeError::TicketTypeNotFound`] if missing or deleted.
    /// - [`BoxOfficeError::InsufficientInventory`] if stock is short.
    /// - [`BoxOfficeError::ConcurrencyConflict`] if the ledger write lost a
    ///   race; the caller may retry.
    /// - [`BoxOfficeError::PersistenceFailure`] if the ledger write fails
    ///   otherwise.
    pub async fn reserve(
        &self,
        user_id: UserId,
        ticket_type_id: TicketTypeId,
        quantity: u32,
    ) -> Result<Transaction, BoxOfficeError> {
        if quantity == 0 {
            return Err(BoxOfficeError::InvalidRequest(
                "quantity must be positive".to_string(),
            ));
        }

        let now = self.clock.now();
        let reserved = self
            .inventory
            .try_reserve(ticket_type_id, quantity, now)
            .await?;

        let recorded = match Transaction::pending(
            user_id,
            &reserved,
            quantity,
            now,
            self.reservation_window,
        ) {
            Ok(transaction) => self
                .ledger
                .create_transaction(&transaction)
                .await
                .map(|()| transaction),
            Err(e) => Err(e),
        };

        let transaction = match recorded {
            Ok(transaction) => transaction,
            Err(e) => {
                self.compensate(ticket_type_id, quantity).await;
                return Err(match e {
                    BoxOfficeError::InvalidRequest(_)
                    | BoxOfficeError::ConcurrencyConflict(_) => e,
                    other => BoxOfficeError::PersistenceFailure(other.to_string()),
                });
            }
        };

        let _ = self.event_bus.publish(FeedEvent::InventoryReserved {
            ticket_type_id,
            transaction_id: transaction.id,
            quantity,
            remaining: reserved.quantity_available,
            timestamp: now,
        });
        tracing::info!(
            transaction_id = %transaction.id,
            %user_id,
            %ticket_type_id,
            quantity,
            remaining = reserved.quantity_available,
            "inventory reserved"
        );
        Ok(transaction)
    }

    async fn compensate(&self, ticket_type_id: TicketTypeId, quantity: u32) {
        match self
            .inventory
            .release(ticket_type_id, quantity, self.clock.now())
            .await
        {
            Ok(remaining) => tracing::warn!(
                %ticket_type_id,
                quantity,
                remaining,
                "reservation rolled back"
            ),
            Err(e) => tracing::error!(
                %ticket_type_id,
                quantity,
                error = %e,
                "reservation rollback failed; stock is short until corrected"
            ),
        }
    }

    /// Tells the buyer their reservation is held until the deadline.
    /// Failures are logged only.
    pub async fn send_confirmation(&self, transaction: &Transaction) {
        let ticket_name = match self
            .inventory
            .get_ticket_type(transaction.ticket_type_id)
            .await
        {
            Ok(Some(ticket)) => ticket.name,
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!(
                    transaction_id = %transaction.id,
                    error = %e,
                    "confirmation skipped"
                );
                return;
            }
        };
        let payload = NotificationPayload::Confirmation {
            transaction_id: transaction.id,
            ticket_type_id: transaction.ticket_type_id,
            ticket_name,
            quantity: transaction.quantity,
            total_price_cents: transaction.total_price_cents,
            deadline: transaction.deadline,
        };
        let _ = notify::deliver(self.notifier.as_ref(), transaction.user_id, &payload).await;
    }

    /// Marks a `Pending` transaction `Paid`. Inventory is unchanged.
    ///
    /// # Errors
    ///
    /// - [`BoxOfficeError::TransactionNotFound`] if missing.
    /// - [`BoxOfficeError::InvalidTransition`] if no longer `Pending`.
    pub async fn confirm_payment(&self, id: TransactionId) -> Result<Transaction, BoxOfficeError> {
        self.close(id, TransactionStatus::Paid).await
    }

    /// Marks a `Pending` transaction `Failed` after a payment decline and
    /// returns its units.
    ///
    /// # Errors
    ///
    /// - [`BoxOfficeError::TransactionNotFound`] if missing.
    /// - [`BoxOfficeError::InvalidTransition`] if no longer `Pending`.
    pub async fn decline_payment(&self, id: TransactionId) -> Result<Transaction, BoxOfficeError> {
        self.close(id, TransactionStatus::Failed).await
    }

    /// Cancels the caller's own `Pending` transaction and returns its units.
    ///
    /// # Errors
    ///
    /// - [`BoxOfficeError::TransactionNotFound`] if missing or owned by
    ///   another user.
    /// - [`BoxOfficeError::InvalidTransition`] if no longer `Pending`.
    pub async fn cancel(
        &self,
        caller: Identity,
        id: TransactionId,
    ) -> Result<Transaction, BoxOfficeError> {
        let transaction = self.get(id).await?;
        if transaction.user_id != caller.user_id {
            return Err(BoxOfficeError::TransactionNotFound(id));
        }
        transaction.ensure_transition(TransactionStatus::Failed)?;
        self.close(id, TransactionStatus::Failed).await
    }

    /// Loads a transaction.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::TransactionNotFound`] if missing.
    pub async fn get(&self, id: TransactionId) -> Result<Transaction, BoxOfficeError> {
        self.ledger
            .get_transaction(id)
            .await?
            .ok_or(BoxOfficeError::TransactionNotFound(id))
    }

    /// A user's transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Transaction>, BoxOfficeError> {
        self.ledger.find_by_user(user_id).await
    }

    /// All transactions, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    pub async fn list_all(&self) -> Result<Vec<Transaction>, BoxOfficeError> {
        self.ledger.list_transactions().await
    }

    async fn close(
        &self,
        id: TransactionId,
        to: TransactionStatus,
    ) -> Result<Transaction, BoxOfficeError> {
        let now = self.clock.now();
        let Some(closed) = self.ledger.close_pending(id, to, now).await? else {
            // Lost the race or never existed.
            let current = self.get(id).await?;
            return Err(BoxOfficeError::InvalidTransition {
                id,
                from: current.status,
                to,
            });
        };

        let transaction = closed.transaction;
        let ticket_type_id = transaction.ticket_type_id;
        match closed.remaining {
            Some(remaining) => {
                let _ = self.event_bus.publish(FeedEvent::InventoryReleased {
                    ticket_type_id,
                    transaction_id: id,
                    quantity: transaction.quantity,
                    remaining,
                    status: to,
                    timestamp: now,
                });
                tracing::info!(
                    transaction_id = %id,
                    %ticket_type_id,
                    status = %to,
                    quantity = transaction.quantity,
                    remaining,
                    "transaction closed, inventory released"
                );
                if let Err(e) = self.waitlist.notify_available(ticket_type_id).await {
                    tracing::warn!(%ticket_type_id, error = %e, "waitlist drain failed");
                }
            }
            None => {
                let _ = self.event_bus.publish(FeedEvent::PaymentConfirmed {
                    ticket_type_id,
                    transaction_id: id,
                    timestamp: now,
                });
                tracing::info!(transaction_id = %id, %ticket_type_id, status = %to, "transaction closed");
            }
        }
        Ok(transaction)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EventId, ManualClock, NewTicketType, NotificationKind, Role, TicketType};
    use crate::notify::NotificationCenter;
    use crate::persistence::{MemoryStore, Stores};
    use async_trait::async_trait;
    use chrono::{DateTime, NaiveDate, Utc};

    #[derive(Debug)]
    struct BrokenLedger {
        inner: Arc<MemoryStore>,
        conflict: bool,
    }

    #[async_trait]
    impl TransactionLedger for BrokenLedger {
        async fn create_transaction(&self, _t: &Transaction) -> Result<(), BoxOfficeError> {
            if self.conflict {
                return Err(BoxOfficeError::ConcurrencyConflict(
                    "could not serialize access".to_string(),
                ));
            }
            Err(BoxOfficeError::PersistenceFailure("disk full".to_string()))
        }
        async fn get_transaction(
            &self,
            id: TransactionId,
        ) -> Result<Option<Transaction>, BoxOfficeError> {
            self.inner.get_transaction(id).await
        }
        async fn close_pending(
            &self,
            id: TransactionId,
            to: TransactionStatus,
            now: DateTime<Utc>,
        ) -> Result<Option<crate::persistence::ClosedTransaction>, BoxOfficeError> {
            self.inner.close_pending(id, to, now).await
        }
        async fn find_pending_expired(
            &self,
            before: DateTime<Utc>,
        ) -> Result<Vec<Transaction>, BoxOfficeError> {
            self.inner.find_pending_expired(before).await
        }
        async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Transaction>, BoxOfficeError> {
            self.inner.find_by_user(user_id).await
        }
        async fn list_transactions(&self) -> Result<Vec<Transaction>, BoxOfficeError> {
            self.inner.list_transactions().await
        }
        async fn find_paid_for_event_on(
            &self,
            date: NaiveDate,
        ) -> Result<Vec<Transaction>, BoxOfficeError> {
            self.inner.find_paid_for_event_on(date).await
        }
    }

    #[derive(Debug)]
    struct SilentNotifier;

    #[async_trait]
    impl Notifier for SilentNotifier {
        async fn notify(
            &self,
            _user_id: UserId,
            _payload: &NotificationPayload,
        ) -> Result<crate::domain::Notification, BoxOfficeError> {
            Err(BoxOfficeError::NotificationFailure("unreachable".to_string()))
        }
    }

    struct Harness {
        service: ReservationService,
        stores: Stores,
        ticket_type_id: TicketTypeId,
        events: EventBus,
    }

    async fn harness_with(
        quantity: u32,
        stores: Stores,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Harness {
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::default());
        let notifier: Arc<dyn Notifier> = match notifier {
            Some(notifier) => notifier,
            None => Arc::new(NotificationCenter::new(
                Arc::clone(&stores.notifications),
                Arc::clone(&clock),
            )),
        };
        let events = EventBus::new(64);
        let waitlist = Arc::new(WaitlistService::new(
            Arc::clone(&stores.inventory),
            Arc::clone(&stores.waitlist),
            Arc::clone(&notifier),
            events.clone(),
            Arc::clone(&clock),
        ));
        let service = ReservationService::new(
            Arc::clone(&stores.inventory),
            Arc::clone(&stores.ledger),
            waitlist,
            notifier,
            events.clone(),
            clock,
            Duration::minutes(15),
        );
        let Ok(ticket) = TicketType::create(
            NewTicketType {
                event_id: EventId::new(),
                batch: 1,
                name: "VIP".to_string(),
                description: String::new(),
                price_cents: 10_000,
                quantity_available: quantity,
            },
            Utc::now(),
        ) else {
            panic!("valid ticket type");
        };
        if stores.inventory.create_ticket_type(&ticket).await.is_err() {
            panic!("insert failed");
        }
        Harness {
            service,
            stores,
            ticket_type_id: ticket.id,
            events,
        }
    }

    async fn harness(quantity: u32) -> Harness {
        harness_with(quantity, Stores::in_memory(), None).await
    }

    async fn available(h: &Harness) -> u32 {
        match h.stores.inventory.get_ticket_type(h.ticket_type_id).await {
            Ok(Some(t)) => t.quantity_available,
            _ => panic!("ticket type vanished"),
        }
    }

    fn owner(tx: &Transaction) -> Identity {
        Identity {
            user_id: tx.user_id,
            role: Role::User,
        }
    }

    #[tokio::test]
    async fn reserve_decrements_and_prices() {
        let h = harness(5).await;
        let mut rx = h.events.subscribe();
        let Ok(tx) = h.service.reserve(UserId::new(), h.ticket_type_id, 3).await else {
            panic!("reserve failed");
        };
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.total_price_cents, 30_000);
        assert_eq!(tx.deadline, tx.created_at + Duration::minutes(15));
        assert_eq!(available(&h).await, 2);

        let Ok(event) = rx.recv().await else {
            panic!("expected event");
        };
        assert_eq!(event.event_type_str(), "inventory_reserved");
    }

    #[tokio::test]
    async fn reserve_zero_is_invalid() {
        let h = harness(5).await;
        let result = h.service.reserve(UserId::new(), h.ticket_type_id, 0).await;
        assert!(matches!(result, Err(BoxOfficeError::InvalidRequest(_))));
        assert_eq!(available(&h).await, 5);
    }

    #[tokio::test]
    async fn reserve_over_stock_is_rejected_without_mutation() {
        let h = harness(2).await;
        let result = h.service.reserve(UserId::new(), h.ticket_type_id, 3).await;
        assert!(matches!(
            result,
            Err(BoxOfficeError::InsufficientInventory { .. })
        ));
        assert_eq!(available(&h).await, 2);
        assert!(h.service.list_all().await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn ledger_failure_rolls_back_inventory() {
        let memory = Arc::new(MemoryStore::new());
        let mut stores = Stores::from_backend(Arc::clone(&memory));
        stores.ledger = Arc::new(BrokenLedger {
            inner: memory,
            conflict: false,
        });
        let h = harness_with(5, stores, None).await;

        let result = h.service.reserve(UserId::new(), h.ticket_type_id, 3).await;
        assert!(matches!(result, Err(BoxOfficeError::PersistenceFailure(_))));
        assert_eq!(available(&h).await, 5);
    }

    #[tokio::test]
    async fn ledger_conflict_is_reported_as_retryable() {
        let memory = Arc::new(MemoryStore::new());
        let mut stores = Stores::from_backend(Arc::clone(&memory));
        stores.ledger = Arc::new(BrokenLedger {
            inner: memory,
            conflict: true,
        });
        let h = harness_with(5, stores, None).await;

        let result = h.service.reserve(UserId::new(), h.ticket_type_id, 2).await;
        let Err(err) = result else {
            panic!("reserve should fail");
        };
        assert!(matches!(err, BoxOfficeError::ConcurrencyConflict(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
        assert_eq!(available(&h).await, 5);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_never_oversell() {
        let h = harness(10).await;
        let service = Arc::new(h.service.clone());
        let mut handles = Vec::new();
        for _ in 0..50 {
            let service = Arc::clone(&service);
            let id = h.ticket_type_id;
            handles.push(tokio::spawn(async move {
                service.reserve(UserId::new(), id, 1).await.is_ok()
            }));
        }
        let mut won = 0u32;
        for handle in handles {
            if matches!(handle.await, Ok(true)) {
                won += 1;
            }
        }
        assert_eq!(won, 10);
        assert_eq!(available(&h).await, 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn two_and_one_from_two_never_both_succeed() {
        for _ in 0..20 {
            let h = harness(2).await;
            let a = h.service.clone();
            let b = h.service.clone();
            let id = h.ticket_type_id;
            let (r2, r1) = tokio::join!(
                tokio::spawn(async move { a.reserve(UserId::new(), id, 2).await.is_ok() }),
                tokio::spawn(async move { b.reserve(UserId::new(), id, 1).await.is_ok() }),
            );
            let both = matches!(r2, Ok(true)) && matches!(r1, Ok(true));
            assert!(!both);
        }
    }

    #[tokio::test]
    async fn confirm_payment_keeps_inventory() {
        let h = harness(5).await;
        let Ok(tx) = h.service.reserve(UserId::new(), h.ticket_type_id, 2).await else {
            panic!("reserve failed");
        };
        let Ok(paid) = h.service.confirm_payment(tx.id).await else {
            panic!("confirm failed");
        };
        assert_eq!(paid.status, TransactionStatus::Paid);
        assert_eq!(available(&h).await, 3);
    }

    #[tokio::test]
    async fn terminal_statuses_are_immutable() {
        let h = harness(5).await;
        let Ok(tx) = h.service.reserve(UserId::new(), h.ticket_type_id, 2).await else {
            panic!("reserve failed");
        };
        assert!(h.service.decline_payment(tx.id).await.is_ok());
        assert_eq!(available(&h).await, 5);

        let again = h.service.confirm_payment(tx.id).await;
        assert!(matches!(
            again,
            Err(BoxOfficeError::InvalidTransition {
                from: TransactionStatus::Failed,
                to: TransactionStatus::Paid,
                ..
            })
        ));
        let decline_twice = h.service.decline_payment(tx.id).await;
        assert!(matches!(
            decline_twice,
            Err(BoxOfficeError::InvalidTransition { .. })
        ));
        assert_eq!(available(&h).await, 5);
        let Ok(stored) = h.service.get(tx.id).await else {
            panic!("transaction vanished");
        };
        assert_eq!(stored.status, TransactionStatus::Failed);
    }

    #[tokio::test]
    async fn cancel_is_owner_only() {
        let h = harness(5).await;
        let Ok(tx) = h.service.reserve(UserId::new(), h.ticket_type_id, 2).await else {
            panic!("reserve failed");
        };
        let stranger = Identity {
            user_id: UserId::new(),
            role: Role::User,
        };
        let result = h.service.cancel(stranger, tx.id).await;
        assert!(matches!(result, Err(BoxOfficeError::TransactionNotFound(_))));

        let Ok(cancelled) = h.service.cancel(owner(&tx), tx.id).await else {
            panic!("owner cancel failed");
        };
        assert_eq!(cancelled.status, TransactionStatus::Failed);
        assert_eq!(available(&h).await, 5);
    }

    #[tokio::test]
    async fn missing_transaction_is_not_found() {
        let h = harness(1).await;
        let result = h.service.confirm_payment(TransactionId::new()).await;
        assert!(matches!(result, Err(BoxOfficeError::TransactionNotFound(_))));
    }

    #[tokio::test]
    async fn confirmation_is_recorded() {
        let h = harness(5).await;
        let Ok(tx) = h.service.reserve(UserId::new(), h.ticket_type_id, 1).await else {
            panic!("reserve failed");
        };
        h.service.send_confirmation(&tx).await;
        let inbox = h
            .stores
            .notifications
            .list_for_user(tx.user_id)
            .await
            .unwrap_or_default();
        assert_eq!(inbox.len(), 1);
        assert!(inbox.iter().all(|n| n.kind == NotificationKind::Confirmation));
    }

    #[tokio::test]
    async fn notifier_failure_keeps_reservation() {
        let silent: Arc<dyn Notifier> = Arc::new(SilentNotifier);
        let h = harness_with(5, Stores::in_memory(), Some(silent)).await;
        let Ok(tx) = h.service.reserve(UserId::new(), h.ticket_type_id, 2).await else {
            panic!("reserve failed");
        };
        h.service.send_confirmation(&tx).await;
        let Ok(stored) = h.service.get(tx.id).await else {
            panic!("transaction vanished");
        };
        assert_eq!(stored.status, TransactionStatus::Pending);
        assert_eq!(available(&h).await, 3);
    }

    #[tokio::test]
    async fn decline_notifies_waitlist() {
        let h = harness(2).await;
        let Ok(tx) = h.service.reserve(UserId::new(), h.ticket_type_id, 2).await else {
            panic!("reserve failed");
        };
        let waiting = UserId::new();
        let Ok((_, true)) = h.service.waitlist.join(waiting, h.ticket_type_id).await else {
            panic!("join failed");
        };

        assert!(h.service.decline_payment(tx.id).await.is_ok());
        let inbox = h
            .stores
            .notifications
            .list_for_user(waiting)
            .await
            .unwrap_or_default();
        assert_eq!(inbox.len(), 1);
        assert!(h.service.waitlist.list(h.ticket_type_id).await.unwrap_or_default().is_empty());
    }
}
