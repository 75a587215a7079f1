//! In-process fake of the messaging bridge, served by axum on an ephemeral port.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use countdown_notifier::daemon::config::GatewayConfig;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

pub const KNOWN_LINK: &str = "https://chat.whatsapp.com/JU0uMNWKCSI3v0ZCqp2hKu";
pub const GROUP_ID: &str = "120363040000000000@g.us";

#[derive(Debug, Default)]
pub struct BridgeState {
    pub connected: bool,
    pub logged_in: bool,
    /// Connect calls left before pairing completes.
    pub pair_after_connects: usize,
    pub connect_calls: usize,
    pub disconnect_calls: usize,
    pub links: HashMap<String, String>,
    pub sent: Vec<(String, String)>,
    pub fail_send: bool,
    /// Accept sends with an empty `200 OK` body.
    pub empty_send_reply: bool,
    pub token: Option<String>,
}

pub type Shared = Arc<Mutex<BridgeState>>;

pub struct FakeBridge {
    pub addr: SocketAddr,
    pub state: Shared,
}

impl FakeBridge {
    /// A bridge that already has a paired session and knows [`KNOWN_LINK`].
    pub async fn paired() -> Self {
        Self::start(BridgeState {
            logged_in: true,
            ..Default::default()
        })
        .await
    }

    pub async fn start(mut state: BridgeState) -> Self {
        state
            .links
            .entry(KNOWN_LINK.to_owned())
            .or_insert_with(|| GROUP_ID.to_owned());
        let state = Arc::new(Mutex::new(state));

        let app = Router::new()
            .route("/session/status", get(status))
            .route("/session/connect", post(connect))
            .route("/session/disconnect", post(disconnect))
            .route("/groups/resolve", get(resolve))
            .route("/messages/text", post(send))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.base_url(),
            token: None,
            pairing_poll_secs: 1,
            request_timeout_secs: 5,
        }
    }

    pub fn sent(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().sent.clone()
    }
}

fn authorized(state: &BridgeState, headers: &HeaderMap) -> bool {
    match &state.token {
        None => true,
        Some(token) => headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == format!("Bearer {token}")),
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "missing or invalid token"})),
    )
        .into_response()
}

async fn status(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let s = state.lock().unwrap();
    if !authorized(&s, &headers) {
        return unauthorized();
    }
    Json(json!({"connected": s.connected, "logged_in": s.logged_in})).into_response()
}

async fn connect(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut s = state.lock().unwrap();
    if !authorized(&s, &headers) {
        return unauthorized();
    }
    s.connect_calls += 1;
    if !s.logged_in {
        if s.pair_after_connects == 0 {
            s.logged_in = true;
        } else {
            s.pair_after_connects -= 1;
            let qr = format!("2@pairing-code-{}", s.connect_calls);
            return Json(json!({"connected": false, "logged_in": false, "qr": qr}))
                .into_response();
        }
    }
    s.connected = true;
    Json(json!({"connected": true, "logged_in": true})).into_response()
}

async fn disconnect(State(state): State<Shared>) -> Response {
    let mut s = state.lock().unwrap();
    s.disconnect_calls += 1;
    s.connected = false;
    Json(json!({})).into_response()
}

#[derive(Deserialize)]
struct ResolveQuery {
    link: String,
}

async fn resolve(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(q): Query<ResolveQuery>,
) -> Response {
    let s = state.lock().unwrap();
    if !authorized(&s, &headers) {
        return unauthorized();
    }
    match s.links.get(&q.link) {
        Some(id) => Json(json!({"id": id})).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "invite link not found"})),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
struct SendBody {
    to: String,
    text: String,
}

async fn send(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<SendBody>,
) -> Response {
    let mut s = state.lock().unwrap();
    if !authorized(&s, &headers) {
        return unauthorized();
    }
    if s.fail_send || !s.connected {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"error": "websocket not connected"})),
        )
            .into_response();
    }
    s.sent.push((body.to, body.text));
    if s.empty_send_reply {
        return StatusCode::OK.into_response();
    }
    Json(json!({"id": format!("msg-{}", s.sent.len())})).into_response()
}
