//! Broadcast channel for domain events.
//!
//! [`EventBus`] wraps a [`tokio::sync::broadcast`] channel. Every inventory
//! mutation publishes a [`FeedEvent`] through the bus, and all WebSocket
//! connections subscribe to receive events filtered by ticket type.

use tokio::sync::broadcast;

use super::FeedEvent;

/// Broadcast bus for [`FeedEvent`]s.
///
/// Backed by a `tokio::broadcast` channel with a configurable capacity
/// (default 10 000). When the ring buffer is full, the oldest events are
/// dropped for lagging receivers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<FeedEvent>,
}

impl EventBus {
    /// Creates a new `EventBus` with the given channel capacity (at least 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of receivers that received the event.
    /// If there are no active receivers, the event is silently dropped.
    pub fn publish(&self, event: FeedEvent) -> usize {
        tracing::trace!(
            event_type = event.event_type_str(),
            ticket_type_id = %event.ticket_type_id(),
            "publishing feed event"
        );
        self.sender.send(event).unwrap_or(0)
    }

    /// Creates a new receiver that will receive all future events.
    ///
    /// Each WebSocket connection should call this once on connect.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<FeedEvent> {
        self.sender.subscribe()
    }

    /// Returns the current number of active receivers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{TicketTypeId, TransactionId, TransactionStatus};
    use chrono::Utc;
    use tokio::sync::broadcast::error::RecvError;

    fn reserved(ticket_type_id: TicketTypeId, transaction_id: TransactionId) -> FeedEvent {
        FeedEvent::InventoryReserved {
            ticket_type_id,
            transaction_id,
            quantity: 2,
            remaining: 8,
            timestamp: Utc::now(),
        }
    }

    fn restocked(ticket_type_id: TicketTypeId, remaining: u32) -> FeedEvent {
        FeedEvent::InventoryRestocked {
            ticket_type_id,
            added: 1,
            remaining,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn reservation_without_watchers_is_dropped() {
        let bus = EventBus::new(100);
        let count = bus.publish(reserved(TicketTypeId::new(), TransactionId::new()));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn expiry_sequence_arrives_in_order() {
        let bus = EventBus::new(100);
        let mut rx = bus.subscribe();
        let id = TicketTypeId::new();
        let tx = TransactionId::new();

        bus.publish(reserved(id, tx));
        bus.publish(FeedEvent::InventoryReleased {
            ticket_type_id: id,
            transaction_id: tx,
            quantity: 2,
            remaining: 10,
            status: TransactionStatus::Expired,
            timestamp: Utc::now(),
        });
        bus.publish(FeedEvent::WaitlistDrained {
            ticket_type_id: id,
            notified: 3,
            timestamp: Utc::now(),
        });

        let mut seen = Vec::new();
        for _ in 0..3 {
            let Ok(event) = rx.recv().await else {
                panic!("expected three events");
            };
            assert_eq!(event.ticket_type_id(), id);
            if let FeedEvent::InventoryReleased { status, .. } = &event {
                assert_eq!(*status, TransactionStatus::Expired);
            }
            seen.push(event.event_type_str());
        }
        assert_eq!(
            seen,
            vec!["inventory_reserved", "inventory_released", "waitlist_drained"]
        );
    }

    #[tokio::test]
    async fn payment_reaches_every_watcher() {
        let bus = EventBus::new(100);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        let tx = TransactionId::new();

        let sent = bus.publish(FeedEvent::PaymentConfirmed {
            ticket_type_id: TicketTypeId::new(),
            transaction_id: tx,
            timestamp: Utc::now(),
        });
        assert_eq!(sent, 2);

        for rx in [&mut rx1, &mut rx2] {
            let Ok(FeedEvent::PaymentConfirmed { transaction_id, .. }) = rx.recv().await else {
                panic!("expected payment confirmation");
            };
            assert_eq!(transaction_id, tx);
        }
    }

    #[tokio::test]
    async fn late_watcher_only_sees_later_events() {
        let bus = EventBus::new(100);
        let id = TicketTypeId::new();
        bus.publish(reserved(id, TransactionId::new()));

        let mut rx = bus.subscribe();
        bus.publish(restocked(id, 4));

        let Ok(event) = rx.recv().await else {
            panic!("expected restock");
        };
        assert_eq!(event.event_type_str(), "inventory_restocked");
    }

    #[tokio::test]
    async fn zero_capacity_still_delivers() {
        let bus = EventBus::new(0);
        let mut rx = bus.subscribe();
        let id = TicketTypeId::new();
        assert_eq!(bus.publish(restocked(id, 1)), 1);

        let Ok(event) = rx.recv().await else {
            panic!("expected event");
        };
        assert_eq!(event.ticket_type_id(), id);
    }

    #[tokio::test]
    async fn slow_watcher_skips_to_latest_stock() {
        let bus = EventBus::new(1);
        let mut rx = bus.subscribe();
        let id = TicketTypeId::new();
        bus.publish(restocked(id, 1));
        bus.publish(restocked(id, 2));

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(1))));
        let Ok(FeedEvent::InventoryRestocked { remaining, .. }) = rx.recv().await else {
            panic!("expected latest restock");
        };
        assert_eq!(remaining, 2);
    }

    #[test]
    fn closed_connections_stop_counting() {
        let bus = EventBus::new(100);
        assert_eq!(bus.receiver_count(), 0);

        let first = bus.subscribe();
        let _second = bus.subscribe();
        assert_eq!(bus.receiver_count(), 2);

        drop(first);
        assert_eq!(bus.receiver_count(), 1);
    }
}
