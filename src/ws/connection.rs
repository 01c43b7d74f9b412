//! WebSocket connection state machine.
//!
//! Handles the read/write loop for a single WebSocket connection,
//! dispatching incoming commands and forwarding filtered feed events.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{WsCommand, WsMessage, WsMessageType};
use super::subscription::{SubscriptionManager, parse_ids};
use crate::domain::{FeedEvent, TicketTypeId};
use crate::service::InventoryService;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Reads commands from the client and answers them.
/// - Forwards feed events for subscribed ticket types.
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<FeedEvent>,
    inventory: Arc<InventoryService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut subs = SubscriptionManager::new();

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(&text, &mut subs, &inventory).await;
                        if let Some(json) = encode(&reply)
                            && ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(feed_event) => {
                        if !subs.matches(feed_event.ticket_type_id()) {
                            continue;
                        }
                        let Ok(payload) = serde_json::to_value(&feed_event) else {
                            continue;
                        };
                        if let Some(json) = encode(&WsMessage::event(payload))
                            && ws_tx.send(Message::text(json)).await.is_err() {
                                break;
                            }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::debug!("ws connection closed");
}

fn encode(msg: &WsMessage) -> Option<String> {
    serde_json::to_string(msg).ok()
}

/// Answers one text frame from the client.
async fn handle_text_message(
    text: &str,
    subs: &mut SubscriptionManager,
    inventory: &InventoryService,
) -> WsMessage {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return WsMessage::error(String::new(), 400, "malformed JSON");
    };
    if msg.msg_type != WsMessageType::Command {
        return WsMessage::error(msg.id, 400, "expected a command message");
    }
    let Ok(command) = serde_json::from_value::<WsCommand>(msg.payload) else {
        return WsMessage::error(msg.id, 404, "unknown command");
    };

    match command {
        WsCommand::Subscribe { ticket_type_ids } => {
            let (ids, wildcard) = parse_ids(&ticket_type_ids);
            subs.subscribe(&ids, wildcard);
            WsMessage::response(
                msg.id,
                serde_json::json!({
                    "subscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::Unsubscribe { ticket_type_ids } => {
            let (ids, wildcard) = parse_ids(&ticket_type_ids);
            subs.unsubscribe(&ids, wildcard);
            WsMessage::response(
                msg.id,
                serde_json::json!({
                    "unsubscribed": ids.iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "remaining_count": subs.count(),
                    "wildcard": subs.is_subscribed_all(),
                }),
            )
        }
        WsCommand::GetAvailability { ticket_type_id } => {
            let Ok(uuid) = ticket_type_id.parse::<uuid::Uuid>() else {
                return WsMessage::error(msg.id, 400, "invalid ticket type id");
            };
            match inventory.get(TicketTypeId::from_uuid(uuid)).await {
                Ok(ticket) => WsMessage::response(
                    msg.id,
                    serde_json::json!({
                        "ticket_type_id": ticket.id,
                        "quantity_available": ticket.quantity_available,
                        "sold_out": ticket.is_sold_out(),
                    }),
                ),
                Err(e) => WsMessage::error(msg.id, e.error_code(), &e.to_string()),
            }
        }
    }
}
