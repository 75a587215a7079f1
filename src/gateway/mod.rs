//! Chat gateway abstraction: the narrow interface to the messaging session.
//!
//! The session itself (pairing, encryption, wire protocol, session store) lives
//! behind this trait. The rest of the crate only connects, checks liveness,
//! resolves a group invite link and sends text.

pub mod bridge;

use async_trait::async_trait;
use thiserror::Error;

/// Opaque identifier of a group chat, as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupId(pub String);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A text message addressed to a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub group: GroupId,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("gateway unreachable: {0}")]
    Transport(String),
    #[error("gateway rejected connect: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
#[error("failed to resolve group from invite link {link}: {reason}")]
pub struct ResolveError {
    pub link: String,
    pub reason: String,
}

#[derive(Debug, Error)]
#[error("failed to send message to {group}: {reason}")]
pub struct SendError {
    pub group: GroupId,
    pub reason: String,
}

/// Trait for messaging session integrations.
///
/// Implementations are shared across tasks behind an `Arc` and must handle
/// concurrent calls themselves.
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Establish or resume the session.
    ///
    /// When no paired session exists, the implementation surfaces a pairing
    /// challenge to the operator and waits until pairing completes.
    async fn connect(&self) -> Result<(), ConnectError>;

    /// Whether the session is currently usable. Transport failures count as `false`.
    async fn is_connected(&self) -> bool;

    async fn resolve_group_by_invite_link(&self, link: &str) -> Result<GroupId, ResolveError>;

    async fn send_text(&self, msg: &OutboundMessage) -> Result<(), SendError>;

    /// Close the session. Best effort; failures are logged, not returned.
    async fn disconnect(&self);
}
