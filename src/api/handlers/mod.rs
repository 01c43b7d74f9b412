//! REST endpoint handlers organized by resource.
//!
//! Public reads need no token, `/user/*`, `/waitlist` and
//! `/notifications` need any bearer token, and `/admin/*` needs the admin
//! role.

pub mod events;
pub mod notifications;
pub mod system;
pub mod tickets;
pub mod transactions;
pub mod waitlist;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(events::routes())
        .merge(tickets::routes())
        .merge(transactions::routes())
        .merge(waitlist::routes())
        .merge(notifications::routes())
}
