//! # boxoffice
//!
//! Event-ticketing backend: inventory reservation with payment deadlines,
//! expiry sweeping, waitlists and user notifications, served over REST and
//! a WebSocket feed.
//!
//! Stock is only ever decremented by an atomic conditional reserve and only
//! ever returned by the single close-and-release of a `Pending`
//! transaction, so concurrent buyers can never oversell a ticket type and
//! a reservation's units come back exactly once.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/)         ── auth/ (JWT bearer extractors)
//!     ├── WS Feed (ws/)
//!     │
//!     ├── ReservationService, InventoryService, WaitlistService,
//!     │   EventService (service/)
//!     ├── ExpirySweeper, ReminderJob (service/, background)
//!     ├── NotificationCenter (notify/)
//!     ├── EventBus (domain/)
//!     │
//!     └── Stores (persistence/): PostgreSQL or in-memory
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod notify;
pub mod persistence;
pub mod service;
pub mod ws;
