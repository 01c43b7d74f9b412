//! Event catalog service.

use std::sync::Arc;

use crate::domain::{Clock, Event, EventDetails, EventId};
use crate::error::BoxOfficeError;
use crate::persistence::EventCatalog;

/// Creates, edits and lists events.
#[derive(Debug, Clone)]
pub struct EventService {
    events: Arc<dyn EventCatalog>,
    clock: Arc<dyn Clock>,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(events: Arc<dyn EventCatalog>, clock: Arc<dyn Clock>) -> Self {
        Self { events, clock }
    }

    /// Creates an event.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::InvalidRequest`] on invalid details.
    pub async fn create(&self, details: EventDetails) -> Result<Event, BoxOfficeError> {
        let event = Event::create(details, self.clock.now())?;
        self.events.create_event(&event).await?;
        tracing::info!(event_id = %event.id, name = %event.name, "event created");
        Ok(event)
    }

    /// Loads an event.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::EventNotFound`] if missing.
    pub async fn get(&self, id: EventId) -> Result<Event, BoxOfficeError> {
        self.events
            .get_event(id)
            .await?
            .ok_or(BoxOfficeError::EventNotFound(id))
    }

    /// All events by start date.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::PersistenceFailure`] on storage failure.
    pub async fn list(&self) -> Result<Vec<Event>, BoxOfficeError> {
        self.events.list_events().await
    }

    /// Replaces the descriptive fields of an event.
    ///
    /// # Errors
    ///
    /// - [`BoxOfficeError::EventNotFound`] if missing.
    /// - [`BoxOfficeError::InvalidRequest`] on invalid details.
    pub async fn update(&self, id: EventId, details: EventDetails) -> Result<Event, BoxOfficeError> {
        let mut event = self.get(id).await?;
        event.replace(details, self.clock.now())?;
        self.events.save_event(&event).await?;
        tracing::info!(event_id = %id, "event updated");
        Ok(event)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SystemClock;
    use crate::persistence::MemoryStore;
    use chrono::NaiveDate;

    fn details(name: &str, day: u32) -> EventDetails {
        let Some(date) = NaiveDate::from_ymd_opt(2027, 3, day) else {
            panic!("valid date");
        };
        EventDetails {
            name: name.to_string(),
            description: String::new(),
            location_city: "Lisbon".to_string(),
            location_state: String::new(),
            location_country: "PT".to_string(),
            start_date: date,
            end_date: date,
        }
    }

    #[tokio::test]
    async fn update_replaces_details() {
        let service = EventService::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
        let Ok(event) = service.create(details("Opening", 3)).await else {
            panic!("create failed");
        };
        let Ok(updated) = service.update(event.id, details("Premiere", 4)).await else {
            panic!("update failed");
        };
        assert_eq!(updated.name, "Premiere");
        let Ok(stored) = service.get(event.id).await else {
            panic!("event vanished");
        };
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn missing_event_is_not_found() {
        let service = EventService::new(Arc::new(MemoryStore::new()), Arc::new(SystemClock));
        let result = service.update(EventId::new(), details("Ghost", 5)).await;
        assert!(matches!(result, Err(BoxOfficeError::EventNotFound(_))));
    }
}
