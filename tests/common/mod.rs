//! Shared harness: an in-memory server on an ephemeral port.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use boxoffice::api;
use boxoffice::app_state::AppState;
use boxoffice::auth::JwtAuthenticator;
use boxoffice::domain::{Clock, EventBus, Identity, ManualClock, Role, UserId};
use boxoffice::persistence::Stores;
use chrono::{Duration, TimeZone, Utc};
use serde_json::{Value, json};

pub const SECRET: &[u8] = b"integration-secret";

pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub clock: Arc<ManualClock>,
    pub client: reqwest::Client,
    auth: JwtAuthenticator,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let Some(start) = Utc.with_ymd_and_hms(2027, 4, 1, 12, 0, 0).single() else {
            panic!("valid start time");
        };
        let clock = Arc::new(ManualClock::new(start));
        let shared: Arc<dyn Clock> = Arc::clone(&clock) as Arc<dyn Clock>;
        let state = AppState::new(
            Stores::in_memory(),
            EventBus::new(1_024),
            Arc::new(JwtAuthenticator::new(SECRET)),
            shared,
            Duration::minutes(15),
        );

        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("bind failed");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local addr");
        };
        let app = api::build_app(state.clone());
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            addr,
            state,
            clock,
            client: reqwest::Client::new(),
            auth: JwtAuthenticator::new(SECRET),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn token(&self, role: Role) -> (UserId, String) {
        let user_id = UserId::new();
        let Ok(token) = self.auth.issue(Identity { user_id, role }, Duration::hours(1)) else {
            panic!("token signing failed");
        };
        (user_id, token)
    }

    pub async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (u16, Value) {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let Ok(response) = request.send().await else {
            panic!("request to {path} failed");
        };
        let status = response.status().as_u16();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    /// Creates an event and a ticket type with `quantity` units; returns
    /// the ticket type id.
    pub async fn seed_ticket_type(&self, admin: &str, quantity: u32) -> String {
        let (status, event) = self
            .send(
                reqwest::Method::POST,
                "/api/v1/admin/events",
                Some(admin),
                Some(json!({
                    "name": "Harbour Festival",
                    "location_city": "Bergen",
                    "location_country": "NO",
                    "start_date": "2027-06-01",
                    "end_date": "2027-06-02",
                })),
            )
            .await;
        assert_eq!(status, 201, "event creation: {event}");

        let (status, ticket) = self
            .send(
                reqwest::Method::POST,
                "/api/v1/admin/tickets",
                Some(admin),
                Some(json!({
                    "event_id": event.get("id"),
                    "batch": 1,
                    "name": "General",
                    "description": "Standing",
                    "price_cents": 4_500,
                    "quantity_available": quantity,
                })),
            )
            .await;
        assert_eq!(status, 201, "ticket type creation: {ticket}");
        text(&ticket, "id")
    }
}

/// String field of a JSON object, empty if missing.
pub fn text(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_default()
}
