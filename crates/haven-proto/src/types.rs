//! Identifier and message record types shared by both frame directions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque user identifier assigned by the relay's account store.
///
/// The engine never inspects the contents; it is only used as a map key and
/// echoed back on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Wrap a raw identifier string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

/// Bearer token issued by the credential verifier at login.
///
/// # Security
///
/// The `Debug` impl redacts the token so connection logs never leak
/// credentials.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken(String);

impl AuthToken {
    /// Wrap a raw token string.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<redacted {} bytes>", self.0.len())
    }
}

/// Payload kind of a message.
///
/// Non-text kinds carry their payload out of band as a `file_url` blob
/// reference; `content` then holds a display name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Plain text, inlined in `content`.
    #[default]
    Text,
    /// Image blob reference.
    Image,
    /// Generic file blob reference.
    File,
    /// Recorded voice clip blob reference.
    Voice,
}

/// One message record as the relay represents it.
///
/// Immutable once accepted. `created_at` is stamped by the relay's store for
/// inbound messages and by the sender's clock for optimistic local echoes;
/// history replays may omit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    /// Originating user.
    pub sender_id: UserId,
    /// Destination user.
    pub receiver_id: UserId,
    /// Text body, or the display name for blob payloads.
    #[serde(default)]
    pub content: Option<String>,
    /// Payload kind. Absent means `text` (relay default).
    #[serde(default)]
    pub message_type: MessageKind,
    /// Public blob reference for non-text payloads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Creation timestamp, RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}
