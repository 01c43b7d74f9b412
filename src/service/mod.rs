//! Service layer: business logic orchestration.
//!
//! Services hold the persistence capabilities they need, emit
//! [`crate::domain::FeedEvent`]s through the [`crate::domain::EventBus`]
//! and notify users through [`crate::notify::Notifier`].
//! [`ReservationService`] owns the purchase lifecycle, [`ExpirySweeper`]
//! and [`ReminderJob`] are the two background tasks.

pub mod event_service;
pub mod expiry_sweeper;
pub mod inventory_service;
pub mod reminder;
pub mod reservation_service;
pub mod waitlist_service;

pub use event_service::EventService;
pub use expiry_sweeper::{ExpirySweeper, SweepReport};
pub use inventory_service::InventoryService;
pub use reminder::ReminderJob;
pub use reservation_service::ReservationService;
pub use waitlist_service::WaitlistService;
