//! Per-connection subscription manager.
//!
//! Tracks which ticket types a WebSocket client follows and filters feed
//! events server-side.

use std::collections::HashSet;

use crate::domain::TicketTypeId;

/// Ticket type subscriptions of a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Followed ticket types. Ignored while `subscribe_all` is set.
    ticket_type_ids: HashSet<TicketTypeId>,
    /// Wildcard `"*"` subscription.
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds ticket types to the subscription set.
    pub fn subscribe(&mut self, ids: &[TicketTypeId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.ticket_type_ids.extend(ids.iter().copied());
    }

    /// Removes ticket types. Unsubscribing from `"*"` clears the wildcard.
    pub fn unsubscribe(&mut self, ids: &[TicketTypeId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for id in ids {
            self.ticket_type_ids.remove(id);
        }
    }

    /// Returns `true` if events for `ticket_type_id` should be forwarded.
    #[must_use]
    pub fn matches(&self, ticket_type_id: TicketTypeId) -> bool {
        self.subscribe_all || self.ticket_type_ids.contains(&ticket_type_id)
    }

    /// Number of explicitly followed ticket types.
    #[must_use]
    pub fn count(&self) -> usize {
        self.ticket_type_ids.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}

/// Splits raw ids into parsed ticket type ids and the wildcard flag.
/// Unparseable ids are dropped.
#[must_use]
pub fn parse_ids(raw: &[String]) -> (Vec<TicketTypeId>, bool) {
    let mut ids = Vec::with_capacity(raw.len());
    let mut wildcard = false;
    for s in raw {
        if s == "*" {
            wildcard = true;
        } else if let Ok(uuid) = s.parse::<uuid::Uuid>() {
            ids.push(TicketTypeId::from_uuid(uuid));
        }
    }
    (ids, wildcard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_matches_nothing() {
        let mgr = SubscriptionManager::new();
        assert!(!mgr.matches(TicketTypeId::new()));
    }

    #[test]
    fn specific_subscription_filters_others() {
        let mut mgr = SubscriptionManager::new();
        let id = TicketTypeId::new();
        mgr.subscribe(&[id], false);
        assert!(mgr.matches(id));
        assert!(!mgr.matches(TicketTypeId::new()));
        mgr.unsubscribe(&[id], false);
        assert!(!mgr.matches(id));
    }

    #[test]
    fn wildcard_can_be_dropped() {
        let mut mgr = SubscriptionManager::new();
        mgr.subscribe(&[], true);
        assert!(mgr.matches(TicketTypeId::new()));
        mgr.unsubscribe(&[], true);
        assert!(!mgr.matches(TicketTypeId::new()));
    }

    #[test]
    fn parse_ids_skips_garbage() {
        let id = TicketTypeId::new();
        let (ids, wildcard) = parse_ids(&[id.to_string(), "nope".to_string(), "*".to_string()]);
        assert_eq!(ids, vec![id]);
        assert!(wildcard);
    }
}
