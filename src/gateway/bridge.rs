//! Messaging bridge client using raw reqwest.
//!
//! The bridge is a companion process that owns the real messaging session and
//! its session store. We talk to it over a small JSON/HTTP protocol:
//!
//! - `GET  /session/status` → `{"connected": bool, "logged_in": bool}`
//! - `POST /session/connect` → same, plus `"qr"` while a pairing is pending
//! - `GET  /groups/resolve?link=<invite link>` → `{"id": "<group id>"}`
//! - `POST /messages/text` with `{"to": "<group id>", "text": "..."}`
//! - `POST /session/disconnect`
//!
//! Error responses are non-2xx with `{"error": "..."}`.

use super::{ChatGateway, ConnectError, GroupId, OutboundMessage, ResolveError, SendError};
use crate::daemon::config::GatewayConfig;
use async_trait::async_trait;
use color_eyre::eyre::{Result, WrapErr};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bridge HTTP client.
pub struct BridgeGateway {
    base_url: String,
    token: Option<String>,
    pairing_poll: Duration,
    client: reqwest::Client,
}

// --- Bridge response types ---

#[derive(Debug, Default, Deserialize)]
struct SessionReply {
    #[serde(default)]
    connected: bool,
    #[serde(default)]
    logged_in: bool,
    #[serde(default)]
    qr: Option<String>,
}

impl SessionReply {
    fn is_ready(&self) -> bool {
        self.connected && self.logged_in
    }
}

#[derive(Debug, Deserialize)]
struct GroupReply {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    error: String,
}

impl BridgeGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .wrap_err("failed to build bridge HTTP client")?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_owned(),
            token: config.token.clone(),
            pairing_poll: Duration::from_secs(config.pairing_poll_secs.max(1)),
            client,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.api_url(path));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn status(&self) -> Result<SessionReply, String> {
        let resp = self
            .request(reqwest::Method::GET, "/session/status")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        read_json(resp).await
    }

    async fn request_connect(&self) -> Result<SessionReply, String> {
        let resp = self
            .request(reqwest::Method::POST, "/session/connect")
            .send()
            .await
            .map_err(|e| e.to_string())?;
        read_json(resp).await
    }
}

/// Turn an error response into a reason string. Success bodies are left unread.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, String> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let reason = match resp.json::<ErrorReply>().await {
        Ok(body) => body.error,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_owned(),
    };
    Err(format!("bridge returned {}: {reason}", status.as_u16()))
}

/// Decode a successful response body, or turn an error response into a reason string.
async fn read_json<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, String> {
    check_status(resp)
        .await?
        .json::<T>()
        .await
        .map_err(|e| format!("invalid bridge response: {e}"))
}

#[async_trait]
impl ChatGateway for BridgeGateway {
    fn name(&self) -> &str {
        "bridge"
    }

    async fn connect(&self) -> Result<(), ConnectError> {
        let mut reply = self
            .request_connect()
            .await
            .map_err(ConnectError::Transport)?;
        let mut last_qr: Option<String> = None;

        loop {
            if reply.is_ready() {
                info!(base_url = %self.base_url, "chat session connected");
                return Ok(());
            }

            match reply.qr.take() {
                Some(qr) if last_qr.as_deref() != Some(qr.as_str()) => {
                    info!(qr = %qr, "no paired session, scan this QR code to pair");
                    last_qr = Some(qr);
                }
                Some(_) => {}
                None if !reply.logged_in => {
                    debug!("waiting for the bridge to offer a pairing code");
                }
                None => debug!("paired, waiting for the session to come up"),
            }

            tokio::time::sleep(self.pairing_poll).await;

            let status = self.status().await.map_err(ConnectError::Transport)?;
            reply = if status.is_ready() {
                status
            } else {
                // Re-issue connect to pick up a refreshed QR code.
                self.request_connect()
                    .await
                    .map_err(ConnectError::Rejected)?
            };
        }
    }

    async fn is_connected(&self) -> bool {
        match self.status().await {
            Ok(status) => status.is_ready(),
            Err(e) => {
                warn!(error = %e, "bridge status check failed");
                false
            }
        }
    }

    async fn resolve_group_by_invite_link(&self, link: &str) -> Result<GroupId, ResolveError> {
        let fail = |reason: String| ResolveError {
            link: link.to_owned(),
            reason,
        };

        let resp = self
            .request(reqwest::Method::GET, "/groups/resolve")
            .query(&[("link", link)])
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        let body: GroupReply = read_json(resp).await.map_err(fail)?;

        if body.id.trim().is_empty() {
            return Err(fail("bridge returned an empty group id".into()));
        }
        Ok(GroupId(body.id))
    }

    async fn send_text(&self, msg: &OutboundMessage) -> Result<(), SendError> {
        let fail = |reason: String| SendError {
            group: msg.group.clone(),
            reason,
        };

        let resp = self
            .request(reqwest::Method::POST, "/messages/text")
            .json(&serde_json::json!({
                "to": msg.group.0,
                "text": msg.text,
            }))
            .send()
            .await
            .map_err(|e| fail(e.to_string()))?;
        // Any 2xx means the bridge accepted the message; the body is informational.
        check_status(resp).await.map_err(fail)?;

        debug!(group = %msg.group, "message delivered to bridge");
        Ok(())
    }

    async fn disconnect(&self) {
        let resp = self
            .request(reqwest::Method::POST, "/session/disconnect")
            .send()
            .await;
        match resp {
            Ok(r) if r.status().is_success() => info!("chat session disconnected"),
            Ok(r) => warn!(status = r.status().as_u16(), "bridge refused disconnect"),
            Err(e) => warn!(error = %e, "bridge disconnect failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_url: &str) -> GatewayConfig {
        GatewayConfig {
            base_url: base_url.into(),
            token: None,
            pairing_poll_secs: 0,
            request_timeout_secs: 5,
        }
    }

    #[test]
    fn test_api_url_strips_trailing_slash() {
        let gw = BridgeGateway::new(&config("http://127.0.0.1:3000/")).unwrap();
        assert_eq!(gw.api_url("/session/status"), "http://127.0.0.1:3000/session/status");
    }

    #[test]
    fn test_pairing_poll_has_floor() {
        let gw = BridgeGateway::new(&config("http://bridge")).unwrap();
        assert_eq!(gw.pairing_poll, Duration::from_secs(1));
    }

    #[test]
    fn test_session_reply_defaults() {
        let reply: SessionReply = serde_json::from_str("{}").unwrap();
        assert!(!reply.is_ready());
        assert!(reply.qr.is_none());

        let reply: SessionReply =
            serde_json::from_str(r#"{"connected": true, "logged_in": true}"#).unwrap();
        assert!(reply.is_ready());
    }
}
