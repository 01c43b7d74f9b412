//! Expiry sweeper: returns the units of unpaid reservations.
//!
//! A sweep closes every overdue `Pending` transaction as `Expired`, one
//! atomic close-and-release per transaction, then drains the waitlist of
//! every ticket type that got stock back. Errors never leave the sweeper:
//! a failing transaction is logged and counted, and the sweep moves on.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::domain::{
    Clock, EventBus, FeedEvent, TicketTypeId, TransactionStatus, WaitlistEntry,
};
use crate::persistence::TransactionLedger;

use super::WaitlistService;

/// Outcome of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Transactions moved to `Expired`.
    pub expired: usize,
    /// Transactions that were no longer `Pending` when closed.
    pub skipped: usize,
    /// Transactions whose close failed.
    pub failed: usize,
    /// Waitlist entries drained (and notified) after the restores.
    pub drained: Vec<WaitlistEntry>,
}

/// Periodic expiry of overdue reservations.
#[derive(Debug, Clone)]
pub struct ExpirySweeper {
    ledger: Arc<dyn TransactionLedger>,
    waitlist: Arc<WaitlistService>,
    event_bus: EventBus,
    clock: Arc<dyn Clock>,
    interval: Duration,
}

impl ExpirySweeper {
    /// Creates a sweeper that runs every `interval`.
    #[must_use]
    pub fn new(
        ledger: Arc<dyn TransactionLedger>,
        waitlist: Arc<WaitlistService>,
        event_bus: EventBus,
        clock: Arc<dyn Clock>,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            waitlist,
            event_bus,
            clock,
            interval,
        }
    }

    /// Sweeps everything overdue as of the clock's current time.
    pub async fn sweep_once(&self) -> SweepReport {
        self.sweep_at(self.clock.now()).await
    }

    /// Sweeps everything with a deadline at or before `now`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let overdue = match self.ledger.find_pending_expired(now).await {
            Ok(overdue) => overdue,
            Err(e) => {
                tracing::error!(error = %e, "sweep could not list overdue transactions");
                return report;
            }
        };

        let mut restored: BTreeSet<TicketTypeId> = BTreeSet::new();
        for transaction in overdue {
            let id = transaction.id;
            match self
                .ledger
                .close_pending(id, TransactionStatus::Expired, now)
                .await
            {
                Ok(Some(closed)) => {
                    report.expired = report.expired.saturating_add(1);
                    let ticket_type_id = closed.transaction.ticket_type_id;
                    if let Some(remaining) = closed.remaining {
                        let _ = self.event_bus.publish(FeedEvent::InventoryReleased {
                            ticket_type_id,
                            transaction_id: id,
                            quantity: closed.transaction.quantity,
                            remaining,
                            status: TransactionStatus::Expired,
                            timestamp: now,
                        });
                    }
                    restored.insert(ticket_type_id);
                    tracing::info!(
                        transaction_id = %id,
                        %ticket_type_id,
                        quantity = closed.transaction.quantity,
                        "reservation expired"
                    );
                }
                Ok(None) => {
                    report.skipped = report.skipped.saturating_add(1);
                    tracing::debug!(transaction_id = %id, "already settled, skipped");
                }
                Err(e) => {
                    report.failed = report.failed.saturating_add(1);
                    tracing::error!(transaction_id = %id, error = %e, "expiry failed");
                }
            }
        }

        for ticket_type_id in restored {
            match self.waitlist.notify_available(ticket_type_id).await {
                Ok(drained) => report.drained.extend(drained),
                Err(e) => {
                    tracing::warn!(%ticket_type_id, error = %e, "waitlist drain failed");
                }
            }
        }

        if report.expired > 0 || report.failed > 0 {
            tracing::info!(
                expired = report.expired,
                skipped = report.skipped,
                failed = report.failed,
                drained = report.drained.len(),
                "sweep finished"
            );
        }
        report
    }

    /// Sweeps on every tick until `shutdown` flips to `true` or its sender
    /// is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        tracing::info!(interval_secs = self.interval.as_secs(), "expiry sweeper started");

        loop {
            tokio::select! {
                biased;

                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }

                _ = ticker.tick() => {
                    let _ = self.sweep_once().await;
                }
            }
        }

        tracing::info!("expiry sweeper stopped");
    }
}
