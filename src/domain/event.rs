//! Events (festivals, concerts) that ticket types are sold for.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::EventId;
use crate::error::BoxOfficeError;

/// A ticketed event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// City.
    pub location_city: String,
    /// State or region.
    pub location_state: String,
    /// Country.
    pub location_country: String,
    /// First day of the event.
    pub start_date: NaiveDate,
    /// Last day of the event.
    pub end_date: NaiveDate,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Create / replace payload for an event.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EventDetails {
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// City.
    #[serde(default)]
    pub location_city: String,
    /// State or region.
    #[serde(default)]
    pub location_state: String,
    /// Country.
    #[serde(default)]
    pub location_country: String,
    /// First day.
    pub start_date: NaiveDate,
    /// Last day.
    pub end_date: NaiveDate,
}

impl EventDetails {
    /// Validates name and date range.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::InvalidRequest`] on an empty name or an
    /// end date before the start date.
    pub fn validate(&self) -> Result<(), BoxOfficeError> {
        if self.name.trim().is_empty() {
            return Err(BoxOfficeError::InvalidRequest(
                "event name must not be empty".to_string(),
            ));
        }
        if self.end_date < self.start_date {
            return Err(BoxOfficeError::InvalidRequest(
                "end_date is before start_date".to_string(),
            ));
        }
        Ok(())
    }
}

impl Event {
    /// Builds a new event from validated details.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::InvalidRequest`] if the details are invalid.
    pub fn create(details: EventDetails, now: DateTime<Utc>) -> Result<Self, BoxOfficeError> {
        details.validate()?;
        Ok(Self {
            id: EventId::new(),
            name: details.name,
            description: details.description,
            location_city: details.location_city,
            location_state: details.location_state,
            location_country: details.location_country,
            start_date: details.start_date,
            end_date: details.end_date,
            created_at: now,
            updated_at: now,
        })
    }

    /// Replaces every descriptive field.
    ///
    /// # Errors
    ///
    /// Returns [`BoxOfficeError::InvalidRequest`] if the details are invalid.
    pub fn replace(&mut self, details: EventDetails, now: DateTime<Utc>) -> Result<(), BoxOfficeError> {
        details.validate()?;
        self.name = details.name;
        self.description = details.description;
        self.location_city = details.location_city;
        self.location_state = details.location_state;
        self.location_country = details.location_country;
        self.start_date = details.start_date;
        self.end_date = details.end_date;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn details(start: NaiveDate, end: NaiveDate) -> EventDetails {
        EventDetails {
            name: "Coachella".to_string(),
            description: String::new(),
            location_city: "Indio".to_string(),
            location_state: "CA".to_string(),
            location_country: "US".to_string(),
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn end_before_start_is_rejected() {
        let start = NaiveDate::from_ymd_opt(2026, 4, 10);
        let end = NaiveDate::from_ymd_opt(2026, 4, 9);
        let (Some(start), Some(end)) = (start, end) else {
            return;
        };
        assert!(Event::create(details(start, end), Utc::now()).is_err());
    }

    #[test]
    fn single_day_event_is_valid() {
        let Some(day) = NaiveDate::from_ymd_opt(2026, 4, 10) else {
            return;
        };
        let event = Event::create(details(day, day), Utc::now());
        assert!(event.is_ok());
    }
}
