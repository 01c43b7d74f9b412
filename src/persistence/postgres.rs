//! PostgreSQL implementation of the persistence layer.
//!
//! Stock is only ever changed by single conditional `UPDATE` statements
//! (`quantity_available >= $n`) or, when a status change and a release
//! must land together, inside one database transaction.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use super::models::{
    EventRow, NotificationRow, TicketTypeRow, TransactionRow, WaitlistRow, to_column,
};
use super::{
    ClosedTransaction, EventCatalog, InventoryStore, NotificationStore, TransactionLedger,
    WaitlistStore,
};
use crate::domain::{
    Event, EventId, Notification, NotificationId, TicketType, TicketTypeId, Transaction,
    TransactionId, TransactionStatus, UserId, WaitlistEntry,
};
use crate::error::BoxOfficeError;

const TICKET_COLUMNS: &str = "id, event_id, batch, name, description, price_cents, \
     quantity_available, created_at, updated_at, deleted_at";

const TRANSACTION_COLUMNS: &str = "id, user_id, ticket_type_id, quantity, total_price_cents, \
     status, deadline, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, name, description, location_city, location_state, \
     location_country, start_date, end_date, created_at, updated_at";

/// PostgreSQL-backed store using `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new store with the given connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_ticket(&self, id: TicketTypeId) -> Result<Option<TicketType>, BoxOfficeError> {
        let row = sqlx::query_as::<_, TicketTypeRow>(&format!(
            "SELECT {TICKET_COLUMNS} FROM ticket_types WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(TicketType::try_from).transpose()
    }

    async fn fetch_transactions(
        &self,
        sql: &str,
        bind: Option<uuid::Uuid>,
    ) -> Result<Vec<Transaction>, BoxOfficeError> {
        let query = sqlx::query_as::<_, TransactionRow>(sql);
        let query = match bind {
            Some(value) => query.bind(value),
            None => query,
        };
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }
}

#[async_trait]
impl InventoryStore for PostgresStore {
    async fn create_ticket_type(&self, ticket: &TicketType) -> Result<(), BoxOfficeError> {
        sqlx::query(
            "INSERT INTO ticket_types (id, event_id, batch, name, description, price_cents, \
             quantity_available, created_at, updated_at, deleted_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(ticket.id.as_uuid())
        .bind(ticket.event_id.as_uuid())
        .bind(to_column("batch", ticket.batch)?)
        .bind(&ticket.name)
        .bind(&ticket.description)
        .bind(ticket.price_cents)
        .bind(to_column("quantity_available", ticket.quantity_available)?)
        .bind(ticket.created_at)
        .bind(ticket.updated_at)
        .bind(ticket.deleted_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_ticket_type(
        &self,
        id: TicketTypeId,
    ) -> Result<Option<TicketType>, BoxOfficeError> {
        self.fetch_ticket(id).await
    }

    async fn list_ticket_types(
        &self,
        event_id: Option<EventId>,
    ) -> Result<Vec<TicketType>, BoxOfficeError> {
        let rows = if let Some(event_id) = event_id {
            sqlx::query_as::<_, TicketTypeRow>(&format!(
                "SELECT {TICKET_COLUMNS} FROM ticket_types \
                 WHERE deleted_at IS NULL AND event_id = $1 ORDER BY batch, created_at"
            ))
            .bind(event_id.as_uuid())
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query_as::<_, TicketTypeRow>(&format!(
                "SELECT {TICKET_COLUMNS} FROM ticket_types \
                 WHERE deleted_at IS NULL ORDER BY batch, created_at"
            ))
            .fetch_all(&self.pool)
            .await
        }?;
        rows.into_iter().map(TicketType::try_from).collect()
    }

    async fn save_ticket_type(&self, ticket: &TicketType) -> Result<TicketType, BoxOfficeError> {
        let row = sqlx::query_as::<_, TicketTypeRow>(&format!(
            "UPDATE ticket_types SET batch = $2, name = $3, description = $4, \
             price_cents = $5, updated_at = $6 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {TICKET_COLUMNS}"
        ))
        .bind(ticket.id.as_uuid())
        .bind(to_column("batch", ticket.batch)?)
        .bind(&ticket.name)
        .bind(&ticket.description)
        .bind(ticket.price_cents)
        .bind(ticket.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TicketType::try_from)
            .transpose()?
            .ok_or(BoxOfficeError::TicketTypeNotFound(ticket.id))
    }

    async fn delete_ticket_type(
        &self,
        id: TicketTypeId,
        now: DateTime<Utc>,
    ) -> Result<(), BoxOfficeError> {
        let result = sqlx::query(
            "UPDATE ticket_types SET deleted_at = $2, updated_at = $2 \
             WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.as_uuid())
        .bind(now)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(BoxOfficeError::TicketTypeNotFound(id));
        }
        Ok(())
    }

    async fn try_reserve(
        &self,
        id: TicketTypeId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<TicketType, BoxOfficeError> {
        let row = sqlx::query_as::<_, TicketTypeRow>(&format!(
            "UPDATE ticket_types SET quantity_available = quantity_available - $2, updated_at = $3 \
             WHERE id = $1 AND deleted_at IS NULL AND quantity_available >= $2 \
             RETURNING {TICKET_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(to_column("quantity", quantity)?)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = row {
            return TicketType::try_from(row);
        }

        // Nothing updated: tell a missing row from a short one.
        match self.fetch_ticket(id).await? {
            Some(ticket) if !ticket.is_deleted() => Err(BoxOfficeError::InsufficientInventory {
                requested: quantity,
                available: ticket.quantity_available,
            }),
            _ => Err(BoxOfficeError::TicketTypeNotFound(id)),
        }
    }

    async fn release(
        &self,
        id: TicketTypeId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<u32, BoxOfficeError> {
        let remaining = sqlx::query_scalar::<_, i32>(
            "UPDATE ticket_types SET quantity_available = quantity_available + $2, updated_at = $3 \
             WHERE id = $1 RETURNING quantity_available",
        )
        .bind(id.as_uuid())
        .bind(to_column("quantity", quantity)?)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(BoxOfficeError::TicketTypeNotFound(id))?;
        u32::try_from(remaining)
            .map_err(|_| BoxOfficeError::PersistenceFailure("negative stock".to_string()))
    }

    async fn restock(
        &self,
        id: TicketTypeId,
        quantity: u32,
        now: DateTime<Utc>,
    ) -> Result<TicketType, BoxOfficeError> {
        let row = sqlx::query_as::<_, TicketTypeRow>(&format!(
            "UPDATE ticket_types SET quantity_available = quantity_available + $2, updated_at = $3 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {TICKET_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(to_column("quantity", quantity)?)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(TicketType::try_from)
            .transpose()?
            .ok_or(BoxOfficeError::TicketTypeNotFound(id))
    }
}

#[async_trait]
impl TransactionLedger for PostgresStore {
    async fn create_transaction(&self, transaction: &Transaction) -> Result<(), BoxOfficeError> {
        sqlx::query(
            "INSERT INTO transactions (id, user_id, ticket_type_id, quantity, total_price_cents, \
             status, deadline, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(transaction.id.as_uuid())
        .bind(transaction.user_id.as_uuid())
        .bind(transaction.ticket_type_id.as_uuid())
        .bind(to_column("quantity", transaction.quantity)?)
        .bind(transaction.total_price_cents)
        .bind(transaction.status.as_str())
        .bind(transaction.deadline)
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_transaction(
        &self,
        id: TransactionId,
    ) -> Result<Option<Transaction>, BoxOfficeError> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(Transaction::try_from).transpose()
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

        let mut db_tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "UPDATE transactions SET status = $2, updated_at = $3 \
             WHERE id = $1 AND status = 'pending' RETURNING {TRANSACTION_COLUMNS}"
        ))
        .bind(id.as_uuid())
        .bind(to.as_str())
        .bind(now)
        .fetch_optional(&mut *db_tx)
        .await?;

        let Some(row) = row else {
            db_tx.rollback().await?;
            return Ok(None);
        };
        let transaction = Transaction::try_from(row)?;

        let remaining = if to.releases_inventory() {
            let stock = sqlx::query_scalar::<_, i32>(
                "UPDATE ticket_types SET quantity_available = quantity_available + $2, \
                 updated_at = $3 WHERE id = $1 RETURNING quantity_available",
            )
            .bind(transaction.ticket_type_id.as_uuid())
            .bind(to_column("quantity", transaction.quantity)?)
            .bind(now)
            .fetch_optional(&mut *db_tx)
            .await?
            .ok_or(BoxOfficeError::TicketTypeNotFound(transaction.ticket_type_id))?;
            Some(u32::try_from(stock).map_err(|_| {
                BoxOfficeError::PersistenceFailure("negative stock".to_string())
            })?)
        } else {
            None
        };

        db_tx.commit().await?;
        Ok(Some(ClosedTransaction {
            transaction,
            remaining,
        }))
    }

    async fn find_pending_expired(
        &self,
        before: DateTime<Utc>,
    ) -> Result<Vec<Transaction>, BoxOfficeError> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
             WHERE status = 'pending' AND deadline <= $1 ORDER BY deadline"
        ))
        .bind(before)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn find_by_user(&self, user_id: UserId) -> Result<Vec<Transaction>, BoxOfficeError> {
        self.fetch_transactions(
            &format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions \
                 WHERE user_id = $1 ORDER BY created_at DESC"
            ),
            Some(*user_id.as_uuid()),
        )
        .await
    }

    async fn list_transactions(&self) -> Result<Vec<Transaction>, BoxOfficeError> {
        self.fetch_transactions(
            &format!("SELECT {TRANSACTION_COLUMNS} FROM transactions ORDER BY created_at DESC"),
            None,
        )
        .await
    }

    async fn find_paid_for_event_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<Transaction>, BoxOfficeError> {
        let rows = sqlx::query_as::<_, TransactionRow>(
            "SELECT t.id, t.user_id, t.ticket_type_id, t.quantity, t.total_price_cents, \
             t.status, t.deadline, t.created_at, t.updated_at \
             FROM transactions t \
             JOIN ticket_types tt ON tt.id = t.ticket_type_id \
             JOIN events e ON e.id = tt.event_id \
             WHERE t.status = 'paid' AND e.start_date = $1 ORDER BY t.created_at",
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Transaction::try_from).collect()
    }
}

#[async_trait]
impl WaitlistStore for PostgresStore {
    async fn join(&self, entry: &WaitlistEntry) -> Result<(WaitlistEntry, bool), BoxOfficeError> {
        let inserted = sqlx::query_as::<_, WaitlistRow>(
            "INSERT INTO waitlist_entries (id, user_id, ticket_type_id, created_at) \
             VALUES ($1, $2, $3, $4) ON CONFLICT (user_id, ticket_type_id) DO NOTHING \
             RETURNING id, user_id, ticket_type_id, created_at",
        )
        .bind(entry.id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(entry.ticket_type_id.as_uuid())
        .bind(entry.created_at)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = inserted {
            return Ok((row.into(), true));
        }

        let existing = sqlx::query_as::<_, WaitlistRow>(
            "SELECT id, user_id, ticket_type_id, created_at FROM waitlist_entries \
             WHERE user_id = $1 AND ticket_type_id = $2",
        )
        .bind(entry.user_id.as_uuid())
        .bind(entry.ticket_type_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok((existing.into(), false))
    }

    async fn drain(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> Result<Vec<WaitlistEntry>, BoxOfficeError> {
        let mut entries: Vec<WaitlistEntry> = sqlx::query_as::<_, WaitlistRow>(
            "DELETE FROM waitlist_entries WHERE ticket_type_id = $1 \
             RETURNING id, user_id, ticket_type_id, created_at",
        )
        .bind(ticket_type_id.as_uuid())
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(WaitlistEntry::from)
        .collect();
        entries.sort_by_key(|e| e.created_at);
        Ok(entries)
    }

    async fn list(
        &self,
        ticket_type_id: TicketTypeId,
    ) -> Result<Vec<WaitlistEntry>, BoxOfficeError> {
        let rows = sqlx::query_as::<_, WaitlistRow>(
            "SELECT id, user_id, ticket_type_id, created_at FROM waitlist_entries \
             WHERE ticket_type_id = $1 ORDER BY created_at",
        )
        .bind(ticket_type_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(WaitlistEntry::from).collect())
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn record(&self, notification: &Notification) -> Result<(), BoxOfficeError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, kind, content, created_at, read_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(notification.id.as_uuid())
        .bind(notification.user_id.as_uuid())
        .bind(notification.kind.as_str())
        .bind(&notification.content)
        .bind(notification.created_at)
        .bind(notification.read_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Notification>, BoxOfficeError> {
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, user_id, kind, content, created_at, read_at FROM notifications \
             WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Notification::try_from).collect()
    }

    async fn mark_read(
        &self,
        id: NotificationId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Option<Notification>, BoxOfficeError> {
        let row = sqlx::query_as::<_, NotificationRow>(
            "UPDATE notifications SET read_at = COALESCE(read_at, $3) \
             WHERE id = $1 AND user_id = $2 \
             RETURNING id, user_id, kind, content, created_at, read_at",
        )
        .bind(id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Notification::try_from).transpose()
    }
}

#[async_trait]
impl EventCatalog for PostgresStore {
    async fn create_event(&self, event: &Event) -> Result<(), BoxOfficeError> {
        sqlx::query(&format!(
            "INSERT INTO events ({EVENT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(event.id.as_uuid())
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.location_city)
        .bind(&event.location_state)
        .bind(&event.location_country)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_event(&self, id: EventId) -> Result<Option<Event>, BoxOfficeError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Event::from))
    }

    async fn list_events(&self) -> Result<Vec<Event>, BoxOfficeError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY start_date"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Event::from).collect())
    }

    async fn save_event(&self, event: &Event) -> Result<(), BoxOfficeError> {
        let result = sqlx::query(
            "UPDATE events SET name = $2, description = $3, location_city = $4, \
             location_state = $5, location_country = $6, start_date = $7, end_date = $8, \
             updated_at = $9 WHERE id = $1",
        )
        .bind(event.id.as_uuid())
        .bind(&event.name)
        .bind(&event.description)
        .bind(&event.location_city)
        .bind(&event.location_state)
        .bind(&event.location_country)
        .bind(event.start_date)
        .bind(event.end_date)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(BoxOfficeError::EventNotFound(event.id));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    //! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

    use super::*;
    use crate::domain::{EventDetails, NewTicketType};
    use sqlx::postgres::PgPoolOptions;

    async fn store() -> PostgresStore {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            panic!("DATABASE_URL must be set for postgres tests");
        };
        let Ok(pool) = PgPoolOptions::new().max_connections(8).connect(&url).await else {
            panic!("cannot connect to {url}");
        };
        if sqlx::migrate!("./migrations").run(&pool).await.is_err() {
            panic!("migrations failed");
        }
        PostgresStore::new(pool)
    }

    async fn event(store: &PostgresStore) -> Event {
        let today = Utc::now().date_naive();
        let Ok(event) = Event::create(
            EventDetails {
                name: "Harbour Nights".to_string(),
                description: String::new(),
                location_city: "Lisbon".to_string(),
                location_state: String::new(),
                location_country: "PT".to_string(),
                start_date: today,
                end_date: today,
            },
            Utc::now(),
        ) else {
            panic!("valid event");
        };
        if store.create_event(&event).await.is_err() {
            panic!("event insert failed");
        }
        event
    }

    fn ticket_for(event_id: EventId, quantity: u32) -> TicketType {
        let Ok(ticket) = TicketType::create(
            NewTicketType {
                event_id,
                batch: 1,
                name: "GA".to_string(),
                description: String::new(),
                price_cents: 2_500,
                quantity_available: quantity,
            },
            Utc::now(),
        ) else {
            panic!("valid ticket type");
        };
        ticket
    }

    async fn ticket(store: &PostgresStore, quantity: u32) -> TicketType {
        let event = event(store).await;
        let ticket = ticket_for(event.id, quantity);
        if store.create_ticket_type(&ticket).await.is_err() {
            panic!("insert failed");
        }
        ticket
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn ticket_type_requires_existing_event() {
        let store = store().await;
        let orphan = ticket_for(EventId::new(), 5);
        assert!(matches!(
            store.create_ticket_type(&orphan).await,
            Err(BoxOfficeError::PersistenceFailure(_))
        ));
        assert!(matches!(store.get_ticket_type(orphan.id).await, Ok(None)));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn conditional_reserve_never_oversells() {
        let store = std::sync::Arc::new(store().await);
        let ticket = ticket(&store, 10).await;

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = std::sync::Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.try_reserve(ticket.id, 1, Utc::now()).await.is_ok()
            }));
        }
        let mut won = 0;
        for handle in handles {
            if matches!(handle.await, Ok(true)) {
                won += 1;
            }
        }
        assert_eq!(won, 10);
        let Ok(Some(after)) = store.get_ticket_type(ticket.id).await else {
            panic!("ticket type vanished");
        };
        assert_eq!(after.quantity_available, 0);
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn close_pending_releases_in_same_transaction() {
        let store = store().await;
        let ticket = ticket(&store, 5).await;
        let Ok(reserved) = store.try_reserve(ticket.id, 2, Utc::now()).await else {
            panic!("reserve failed");
        };
        let Ok(tx) = Transaction::pending(
            UserId::new(),
            &reserved,
            2,
            Utc::now(),
            chrono::Duration::minutes(15),
        ) else {
            panic!("valid transaction");
        };
        if store.create_transaction(&tx).await.is_err() {
            panic!("create failed");
        }

        let first = store
            .close_pending(tx.id, TransactionStatus::Expired, Utc::now())
            .await;
        let Ok(Some(closed)) = first else {
            panic!("expected close");
        };
        assert_eq!(closed.remaining, Some(5));

        let second = store
            .close_pending(tx.id, TransactionStatus::Expired, Utc::now())
            .await;
        assert!(matches!(second, Ok(None)));
    }
}
