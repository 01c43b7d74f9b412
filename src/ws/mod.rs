//! WebSocket layer: live inventory feed.
//!
//! The endpoint at `/ws` pushes [`crate::domain::FeedEvent`]s for the
//! ticket types a client subscribes to and answers availability queries.

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
