//! End-to-end REST flows against an in-memory server.

#![allow(clippy::panic)]

mod common;

use boxoffice::domain::Role;
use reqwest::Method;
use serde_json::{Value, json};

use common::{TestServer, text};

#[tokio::test]
async fn reserve_sell_out_waitlist_and_decline() {
    let server = TestServer::spawn().await;
    let (_, admin) = server.token(Role::Admin);
    let (_, alice) = server.token(Role::User);
    let (_, bob) = server.token(Role::User);
    let ticket_id = server.seed_ticket_type(&admin, 2).await;

    let (status, reservation) = server
        .send(
            Method::POST,
            "/api/v1/user/transactions",
            Some(&alice),
            Some(json!({ "ticket_type_id": ticket_id, "quantity": 2 })),
        )
        .await;
    assert_eq!(status, 201, "{reservation}");
    assert_eq!(text(&reservation, "status"), "pending");

    let (status, error) = server
        .send(
            Method::POST,
            "/api/v1/user/transactions",
            Some(&bob),
            Some(json!({ "ticket_type_id": ticket_id, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, 422);
    assert_eq!(
        error.pointer("/error/code").and_then(Value::as_u64),
        Some(4001)
    );

    let join = json!({ "ticket_type_id": ticket_id });
    let (status, _) = server
        .send(Method::POST, "/api/v1/waitlist", Some(&bob), Some(join.clone()))
        .await;
    assert_eq!(status, 201);
    let (status, again) = server
        .send(Method::POST, "/api/v1/waitlist", Some(&bob), Some(join))
        .await;
    assert_eq!(status, 200);
    assert_eq!(again.get("created").and_then(Value::as_bool), Some(false));

    let decline = format!(
        "/api/v1/admin/transactions/{}/decline",
        text(&reservation, "id")
    );
    let (status, declined) = server.send(Method::POST, &decline, Some(&admin), None).await;
    assert_eq!(status, 200);
    assert_eq!(text(&declined, "status"), "failed");

    let (_, ticket) = server
        .send(Method::GET, &format!("/api/v1/tickets/{ticket_id}"), None, None)
        .await;
    assert_eq!(
        ticket.get("quantity_available").and_then(Value::as_u64),
        Some(2)
    );

    let (_, inbox) = server
        .send(Method::GET, "/api/v1/notifications", Some(&bob), None)
        .await;
    let kinds: Vec<String> = inbox
        .as_array()
        .map(|items| items.iter().map(|n| text(n, "kind")).collect())
        .unwrap_or_default();
    assert_eq!(kinds, vec!["waitlist_available".to_string()]);

    let (status, _) = server.send(Method::POST, &decline, Some(&admin), None).await;
    assert_eq!(status, 409, "a settled transaction never changes again");
}

#[tokio::test]
async fn reservation_sends_confirmation_that_can_be_marked_read() {
    let server = TestServer::spawn().await;
    let (_, admin) = server.token(Role::Admin);
    let (_, alice) = server.token(Role::User);
    let (_, mallory) = server.token(Role::User);
    let ticket_id = server.seed_ticket_type(&admin, 5).await;

    let (status, _) = server
        .send(
            Method::POST,
            "/api/v1/user/transactions",
            Some(&alice),
            Some(json!({ "ticket_type_id": ticket_id, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, 201);

    let (_, inbox) = server
        .send(Method::GET, "/api/v1/notifications", Some(&alice), None)
        .await;
    let Some(first) = inbox.as_array().and_then(|items| items.first()).cloned() else {
        panic!("confirmation missing: {inbox}");
    };
    assert_eq!(text(&first, "kind"), "confirmation");

    let path = format!("/api/v1/notifications/{}", text(&first, "id"));
    let (status, _) = server.send(Method::PATCH, &path, Some(&mallory), None).await;
    assert_eq!(status, 404, "only the recipient can mark a notification");

    let (status, read) = server.send(Method::PATCH, &path, Some(&alice), None).await;
    assert_eq!(status, 200);
    assert!(read.get("read_at").is_some_and(|v| !v.is_null()));
}

#[tokio::test]
async fn expired_reservation_returns_stock_after_sweep() {
    let server = TestServer::spawn().await;
    let (_, admin) = server.token(Role::Admin);
    let (_, alice) = server.token(Role::User);
    let ticket_id = server.seed_ticket_type(&admin, 3).await;

    let (status, reservation) = server
        .send(
            Method::POST,
            "/api/v1/user/transactions",
            Some(&alice),
            Some(json!({ "ticket_type_id": ticket_id, "quantity": 3 })),
        )
        .await;
    assert_eq!(status, 201);

    server.clock.advance(chrono::Duration::minutes(16));
    let report = server
        .state
        .expiry_sweeper(std::time::Duration::from_secs(60))
        .sweep_once()
        .await;
    assert_eq!(report.expired, 1);

    let (_, transactions) = server
        .send(Method::GET, "/api/v1/user/transactions", Some(&alice), None)
        .await;
    let Some(expired) = transactions
        .get("data")
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .cloned()
    else {
        panic!("transaction missing: {transactions}");
    };
    assert_eq!(text(&expired, "id"), text(&reservation, "id"));
    assert_eq!(text(&expired, "status"), "expired");

    let (_, ticket) = server
        .send(Method::GET, &format!("/api/v1/tickets/{ticket_id}"), None, None)
        .await;
    assert_eq!(
        ticket.get("quantity_available").and_then(Value::as_u64),
        Some(3)
    );
}

#[tokio::test]
async fn cancel_is_limited_to_the_owner() {
    let server = TestServer::spawn().await;
    let (_, admin) = server.token(Role::Admin);
    let (_, alice) = server.token(Role::User);
    let (_, bob) = server.token(Role::User);
    let ticket_id = server.seed_ticket_type(&admin, 4).await;

    let (_, reservation) = server
        .send(
            Method::POST,
            "/api/v1/user/transactions",
            Some(&alice),
            Some(json!({ "ticket_type_id": ticket_id, "quantity": 2 })),
        )
        .await;
    let cancel = format!(
        "/api/v1/user/transactions/{}/cancel",
        text(&reservation, "id")
    );

    let (status, _) = server.send(Method::POST, &cancel, Some(&bob), None).await;
    assert_eq!(status, 404);

    let (status, cancelled) = server.send(Method::POST, &cancel, Some(&alice), None).await;
    assert_eq!(status, 200);
    assert_eq!(text(&cancelled, "status"), "failed");
}

#[tokio::test]
async fn auth_is_enforced() {
    let server = TestServer::spawn().await;
    let (_, user) = server.token(Role::User);

    let (status, _) = server
        .send(Method::GET, "/api/v1/user/transactions", None, None)
        .await;
    assert_eq!(status, 401);

    let (status, _) = server
        .send(
            Method::GET,
            "/api/v1/user/transactions",
            Some("not-a-token"),
            None,
        )
        .await;
    assert_eq!(status, 401);

    let (status, _) = server
        .send(Method::GET, "/api/v1/admin/transactions", Some(&user), None)
        .await;
    assert_eq!(status, 403);

    let (status, _) = server.send(Method::GET, "/api/v1/events", None, None).await;
    assert_eq!(status, 200, "catalog reads are public");
}

#[tokio::test]
async fn admin_restock_and_delete() {
    let server = TestServer::spawn().await;
    let (_, admin) = server.token(Role::Admin);
    let ticket_id = server.seed_ticket_type(&admin, 1).await;

    let (status, restocked) = server
        .send(
            Method::POST,
            &format!("/api/v1/admin/tickets/{ticket_id}/restock"),
            Some(&admin),
            Some(json!({ "quantity": 9 })),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(
        restocked.get("quantity_available").and_then(Value::as_u64),
        Some(10)
    );

    let path = format!("/api/v1/admin/tickets/{ticket_id}");
    let (status, _) = server.send(Method::DELETE, &path, Some(&admin), None).await;
    assert_eq!(status, 204);

    let (status, _) = server
        .send(Method::GET, &format!("/api/v1/tickets/{ticket_id}"), None, None)
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn health_reports_version() {
    let server = TestServer::spawn().await;
    let (status, body) = server.send(Method::GET, "/health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(text(&body, "status"), "healthy");
    assert_eq!(text(&body, "version"), env!("CARGO_PKG_VERSION"));
}
