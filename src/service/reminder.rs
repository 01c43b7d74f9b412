//! Reminder job: tells buyers their event starts tomorrow.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::watch;

use crate::domain::{Clock, NotificationPayload};
use crate::notify::{self, Notifier};
use crate::persistence::{EventCatalog, InventoryStore, TransactionLedger};

/// Sends one reminder per paid transaction whose event starts the next day.
#[derive(Debug, Clone)]
pub struct ReminderJob {
    ledger: Arc<dyn TransactionLedger>,
    inventory: Arc<dyn InventoryStore>,
    events: Arc<dyn EventCatalog>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    start_hour: Option<u32>,
}

/// Time from `now` until the next `hour`:00 UTC, zero when `now` is exactly
/// on it. Hours past 23 are treated as 23.
#[must_use]
pub fn delay_until_hour(now: DateTime<Utc>, hour: u32) -> Duration {
    let Some(today) = now.date_naive().and_hms_opt(hour.min(23), 0, 0) else {
        return Duration::ZERO;
    };
    let mut next = today.and_utc();
    if next < now {
        next += chrono::Duration::days(1);
    }
    (next - now).to_std().unwrap_or(Duration::ZERO)
}

impl ReminderJob {
    /// Creates a job that runs every `interval`.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        inventory: Arc<dyn InventoryStore>,
        events: Arc<dyn EventCatalog>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            inventory,
            events,
            notifier,
            clock,
            interval,
            start_hour: None,
        }
    }

    /// Delays the first run to the next `hour`:00 UTC instead of running at
    /// startup. Later runs follow every `interval` from there.
    #[must_use]
    pub const fn starting_at_hour(mut self, hour: u32) -> Self {
        self.start_hour = Some(hour);
        self
    }

    fn first_run_delay(&self) -> Duration {
        self.start_hour
            .map_or(Duration::ZERO, |hour| delay_until_hour(self.clock.now(), hour))
    }

    /// Reminds buyers of events starting the day after the clock's date.
    /// Returns how many reminders were delivered.
    pub async fn remind_once(&self) -> usize {
        let Some(tomorrow) = self.clock.now().date_naive().succ_opt() else {
            return 0;
        };
        self.remind_for(tomorrow).await
    }

    /// Reminds buyers of events starting on `date`.
    pub async fn remind_for(&self, date: NaiveDate) -> usize {
        let paid = match self.ledger.find_paid_for_event_on(date).await {
            Ok(paid) => paid,
            Err(e) => {
                tracing::error!(%date, error = %e, "reminder lookup failed");
                return 0;
            }
        };

        let mut sent = 0usize;
        for transaction in paid {
            let ticket = match self.inventory.get_ticket_type(transaction.ticket_type_id).await {
                Ok(Some(ticket)) => ticket,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(transaction_id = %transaction.id, error = %e, "reminder skipped");
                    continue;
                }
            };
            let event = match self.events.get_event(ticket.event_id).await {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(transaction_id = %transaction.id, error = %e, "reminder skipped");
                    continue;
                }
            };

            let payload = NotificationPayload::Reminder {
                transaction_id: transaction.id,
                event_id: event.id,
                event_name: event.name,
                start_date: event.start_date,
                ticket_name: ticket.name,
                quantity: transaction.quantity,
            };
            if notify::deliver(self.notifier.as_ref(), transaction.user_id, &payload).await {
                sent = sent.saturating_add(1);
            }
        }

        if sent > 0 {
            tracing::info!(%date, sent, "event reminders sent");
        }
        sent
    }

    /// Runs [`Self::remind_once`] on every tick until shutdown.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let delay = self.first_run_delay();
        let mut ticker = tokio::time::interval_at(
            tokio::time::Instant::now() + delay,
            self.interval.max(Duration::from_secs(1)),
        );
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tracing::info!(
            interval_secs = self.interval.as_secs(),
            first_run_in_secs = delay.as_secs(),
            "reminder job started"
        );

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let _ = self.remind_once().await;
                }
            }
        }

        tracing::info!("reminder job stopped");
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{
        Event, EventDetails, ManualClock, NewTicketType, NotificationKind, TicketType,
        Transaction, TransactionStatus, UserId,
    };
    use crate::notify::NotificationCenter;
    use crate::persistence::Stores;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn reminds_paid_buyers_of_tomorrows_event() {
        let stores = Stores::in_memory();
        let Some(now) = Utc.with_ymd_and_hms(2027, 5, 31, 9, 0, 0).single() else {
            panic!("valid timestamp");
        };
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(now));
        let notifier = Arc::new(NotificationCenter::new(
            Arc::clone(&stores.notifications),
            Arc::clone(&clock),
        ));
        let job = ReminderJob::new(
            Arc::clone(&stores.ledger),
            Arc::clone(&stores.inventory),
            Arc::clone(&stores.events),
            notifier,
            Arc::clone(&clock),
            Duration::from_secs(60),
        );

        let Some(start) = NaiveDate::from_ymd_opt(2027, 6, 1) else {
            panic!("valid date");
        };
        let Ok(event) = Event::create(
            EventDetails {
                name: "Jazz Night".to_string(),
                description: String::new(),
                location_city: "Oslo".to_string(),
                location_state: String::new(),
                location_country: "NO".to_string(),
                start_date: start,
                end_date: start,
            },
            now,
        ) else {
            panic!("valid event");
        };
        assert!(stores.events.create_event(&event).await.is_ok());
        let Ok(ticket) = TicketType::create(
            NewTicketType {
                event_id: event.id,
                batch: 1,
                name: "Seated".to_string(),
                description: String::new(),
                price_cents: 3_500,
                quantity_available: 10,
            },
            now,
        ) else {
            panic!("valid ticket type");
        };
        assert!(stores.inventory.create_ticket_type(&ticket).await.is_ok());

        let paid_buyer = UserId::new();
        let pending_buyer = UserId::new();
        for buyer in [paid_buyer, pending_buyer] {
            let Ok(tx) =
                Transaction::pending(buyer, &ticket, 1, now, chrono::Duration::minutes(15))
            else {
                panic!("valid transaction");
            };
            assert!(stores.ledger.create_transaction(&tx).await.is_ok());
            if buyer == paid_buyer {
                assert!(
                    stores
                        .ledger
                        .close_pending(tx.id, TransactionStatus::Paid, now)
                        .await
                        .is_ok()
                );
            }
        }

        assert_eq!(job.remind_once().await, 1);
        let inbox = stores
            .notifications
            .list_for_user(paid_buyer)
            .await
            .unwrap_or_default();
        assert!(inbox.iter().all(|n| n.kind == NotificationKind::Reminder));
        assert_eq!(inbox.len(), 1);
        assert!(
            stores
                .notifications
                .list_for_user(pending_buyer)
                .await
                .unwrap_or_default()
                .is_empty()
        );
    }

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        let Some(t) = Utc.with_ymd_and_hms(2027, 5, 31, hour, minute, 0).single() else {
            panic!("valid timestamp");
        };
        t
    }

    #[test]
    fn delay_waits_for_later_today() {
        assert_eq!(delay_until_hour(at(7, 30), 9), Duration::from_secs(90 * 60));
    }

    #[test]
    fn delay_rolls_over_to_tomorrow() {
        assert_eq!(
            delay_until_hour(at(9, 1), 9),
            Duration::from_secs(23 * 3600 + 59 * 60)
        );
        assert_eq!(delay_until_hour(at(23, 0), 0), Duration::from_secs(3600));
    }

    #[test]
    fn delay_is_zero_on_the_hour() {
        assert_eq!(delay_until_hour(at(9, 0), 9), Duration::ZERO);
    }

    #[test]
    fn scheduled_job_waits_for_configured_hour() {
        let stores = Stores::in_memory();
        let clock = Arc::new(ManualClock::new(at(8, 0)));
        let job = ReminderJob::new(
            Arc::clone(&stores.ledger),
            Arc::clone(&stores.inventory),
            Arc::clone(&stores.events),
            Arc::new(NotificationCenter::new(
                Arc::clone(&stores.notifications),
                Arc::clone(&clock) as Arc<dyn Clock>,
            )),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Duration::from_secs(86_400),
        )
        .starting_at_hour(9);
        assert_eq!(job.first_run_delay(), Duration::from_secs(3600));

        let unscheduled = ReminderJob::new(
            Arc::clone(&stores.ledger),
            Arc::clone(&stores.inventory),
            Arc::clone(&stores.events),
            Arc::new(NotificationCenter::new(
                Arc::clone(&stores.notifications),
                Arc::clone(&clock) as Arc<dyn Clock>,
            )),
            Arc::clone(&clock) as Arc<dyn Clock>,
            Duration::from_secs(86_400),
        );
        assert_eq!(unscheduled.first_run_delay(), Duration::ZERO);

        clock.set(at(10, 0));
        assert_eq!(job.first_run_delay(), Duration::from_secs(23 * 3600));
    }
}
