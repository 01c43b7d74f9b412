//! Domain layer: entities, identifiers, clock, and event system.
//!
//! This module contains the ticketing domain model: ticket types and their
//! stock, purchase transactions and their status lifecycle, waitlist
//! entries, events, notifications, and the event bus that broadcasts
//! inventory changes.

pub mod clock;
pub mod event;
pub mod event_bus;
pub mod feed_event;
pub mod identity;
pub mod ids;
pub mod notification;
pub mod ticket_type;
pub mod transaction;
pub mod waitlist;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{Event, EventDetails};
pub use event_bus::EventBus;
pub use feed_event::FeedEvent;
pub use identity::{Identity, Role};
pub use ids::{EventId, NotificationId, TicketTypeId, TransactionId, UserId, WaitlistEntryId};
pub use notification::{Notification, NotificationKind, NotificationPayload};
pub use ticket_type::{NewTicketType, TicketType, TicketTypePatch};
pub use transaction::{Transaction, TransactionStatus};
pub use waitlist::WaitlistEntry;
