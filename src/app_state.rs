//! Shared application state injected into all Axum handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::Authenticator;
use crate::domain::{Clock, EventBus};
use crate::notify::{NotificationCenter, Notifier};
use crate::persistence::Stores;
use crate::service::{
    EventService, ExpirySweeper, InventoryService, ReminderJob, ReservationService,
    WaitlistService,
};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
///
/// Every service is wired over the same [`Stores`], [`EventBus`] and
/// [`Clock`], so handlers and background jobs observe one system.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Event catalog.
    pub events: Arc<EventService>,
    /// Ticket type catalog and stock administration.
    pub inventory: Arc<InventoryService>,
    /// Purchase lifecycle.
    pub reservations: Arc<ReservationService>,
    /// Waitlist registration and draining.
    pub waitlist: Arc<WaitlistService>,
    /// Notification inbox.
    pub notifications: Arc<NotificationCenter>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
    /// Bearer token verifier.
    pub authenticator: Arc<dyn Authenticator>,
    /// Storage capabilities, shared with the background jobs.
    pub stores: Stores,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wires every service over `stores`.
    #[must_use]
    pub fn new(
        stores: Stores,
        event_bus: EventBus,
        authenticator: Arc<dyn Authenticator>,
        clock: Arc<dyn Clock>,
        reservation_window: chrono::Duration,
    ) -> Self {
        let notifications = Arc::new(NotificationCenter::new(
            Arc::clone(&stores.notifications),
            Arc::clone(&clock),
        ));
        let notifier = Arc::clone(&notifications) as Arc<dyn Notifier>;

        let waitlist = Arc::new(WaitlistService::new(
            Arc::clone(&stores.inventory),
            Arc::clone(&stores.waitlist),
            Arc::clone(&notifier),
            event_bus.clone(),
            Arc::clone(&clock),
        ));
        let inventory = Arc::new(InventoryService::new(
            Arc::clone(&stores.inventory),
            Arc::clone(&stores.events),
            Arc::clone(&waitlist),
            event_bus.clone(),
            Arc::clone(&clock),
        ));
        let reservations = Arc::new(ReservationService::new(
            Arc::clone(&stores.inventory),
            Arc::clone(&stores.ledger),
            Arc::clone(&waitlist),
            notifier,
            event_bus.clone(),
            Arc::clone(&clock),
            reservation_window,
        ));
        let events = Arc::new(EventService::new(
            Arc::clone(&stores.events),
            Arc::clone(&clock),
        ));

        Self {
            events,
            inventory,
            reservations,
            waitlist,
            notifications,
            event_bus,
            authenticator,
            stores,
            clock,
        }
    }

    /// Builds an expiry sweeper sharing this state's stores and bus.
    #[must_use]
    pub fn expiry_sweeper(&self, interval: Duration) -> ExpirySweeper {
        ExpirySweeper::new(
            Arc::clone(&self.stores.ledger),
            Arc::clone(&self.waitlist),
            self.event_bus.clone(),
            Arc::clone(&self.clock),
            interval,
        )
    }

    /// Builds a reminder job delivering through the notification center,
    /// first run at `start_hour`:00 UTC and every `interval` after.
    #[must_use]
    pub fn reminder_job(&self, interval: Duration, start_hour: u32) -> ReminderJob {
        ReminderJob::new(
            Arc::clone(&self.stores.ledger),
            Arc::clone(&self.stores.inventory),
            Arc::clone(&self.stores.events),
            Arc::clone(&self.notifications) as Arc<dyn Notifier>,
            Arc::clone(&self.clock),
            interval,
        )
        .starting_at_hour(start_hour)
    }
}
