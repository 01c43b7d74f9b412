//! OpenAPI document for the REST surface.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use super::dto::{
    JoinWaitlistRequest, JoinWaitlistResponse, PaginationMeta, RestockRequest, ReserveRequest,
    TransactionListResponse,
};
use super::handlers::{events, notifications, system, tickets, transactions, waitlist};
use crate::domain::{
    Event, EventDetails, NewTicketType, Notification, NotificationKind, TicketType,
    TicketTypePatch, Transaction, TransactionStatus, WaitlistEntry,
};
use crate::error::{ErrorBody, ErrorResponse};

/// Registers the `bearer` JWT security scheme referenced by handlers.
#[derive(Debug)]
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

/// Aggregated OpenAPI document, served at `/api/docs/openapi.json` when
/// the `swagger-ui` feature is enabled.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "Box Office", description = "Ticket reservation, waitlist and notification API"),
    paths(
        system::health_handler,
        events::list_events,
        events::get_event,
        events::create_event,
        events::update_event,
        tickets::list_tickets,
        tickets::get_ticket,
        tickets::create_ticket,
        tickets::update_ticket,
        tickets::delete_ticket,
        tickets::restock_ticket,
        transactions::reserve,
        transactions::list_own,
        transactions::cancel,
        transactions::list_all,
        transactions::get_transaction,
        transactions::confirm,
        transactions::decline,
        waitlist::join_waitlist,
        waitlist::list_waitlist,
        notifications::list_notifications,
        notifications::mark_read,
    ),
    components(schemas(
        Event,
        EventDetails,
        TicketType,
        NewTicketType,
        TicketTypePatch,
        Transaction,
        TransactionStatus,
        WaitlistEntry,
        Notification,
        NotificationKind,
        ReserveRequest,
        RestockRequest,
        JoinWaitlistRequest,
        JoinWaitlistResponse,
        TransactionListResponse,
        PaginationMeta,
        ErrorResponse,
        ErrorBody,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "System", description = "Health"),
        (name = "Events", description = "Public event catalog"),
        (name = "Tickets", description = "Public ticket type catalog"),
        (name = "Transactions", description = "Reservations and the caller's purchases"),
        (name = "Waitlist", description = "Sold-out ticket type waitlists"),
        (name = "Notifications", description = "The caller's inbox"),
        (name = "Admin", description = "Catalog, stock and settlement administration"),
    )
)]
pub struct ApiDoc;
