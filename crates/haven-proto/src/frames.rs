//! Frame enums for both wire directions, plus the JSON codec.
//!
//! Frames are internally tagged on `type`, matching the relay contract.
//! Decoding tolerates unknown fields inside a known frame (the relay may
//! grow its payloads), but an unknown `type` tag fails decode and the frame
//! is discarded by the caller.

use serde::{Deserialize, Serialize};

use crate::{
    error::FrameError,
    types::{AuthToken, UserId, WireMessage},
};

/// Frames sent from the client to the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Authentication handshake, sent once immediately after connect.
    Auth {
        /// Bearer token from the credential verifier.
        token: AuthToken,
        /// Local user's identifier.
        user_id: UserId,
        /// Local user's display name.
        username: String,
    },

    /// Request a full conversation replay for one peer.
    GetHistory {
        /// The peer whose conversation to replay.
        with_user_id: UserId,
    },

    /// Outbound text message.
    Text {
        /// Destination user.
        receiver_id: UserId,
        /// Message body.
        content: String,
    },

    /// Outbound image message (blob uploaded beforehand).
    Image {
        /// Destination user.
        receiver_id: UserId,
        /// Display name of the image.
        content: String,
        /// Public blob reference.
        file_url: String,
    },

    /// Outbound file message (blob uploaded beforehand).
    File {
        /// Destination user.
        receiver_id: UserId,
        /// Display name of the file.
        content: String,
        /// Public blob reference.
        file_url: String,
    },

    /// Outbound voice clip (blob uploaded beforehand).
    Voice {
        /// Destination user.
        receiver_id: UserId,
        /// Display name of the clip.
        content: String,
        /// Public blob reference.
        file_url: String,
    },
}

/// One entry of a `users_list` directory snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    /// Peer identifier.
    pub id: UserId,
    /// Peer display name.
    pub username: String,
    /// Whether the peer currently holds a relay connection.
    pub online: bool,
}

/// Frames pushed from the relay to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Handshake acknowledgement; the session is authenticated.
    Connected {
        /// Identifier the relay resolved for this session.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user_id: Option<UserId>,
        /// Display name the relay resolved for this session.
        username: String,
    },

    /// Full or partial directory snapshot. Merged, never authoritative for
    /// removal.
    UsersList {
        /// Known peers with their presence flags.
        users: Vec<UserEntry>,
    },

    /// A peer connected to the relay.
    UserOnline {
        /// The peer that came online.
        user_id: UserId,
        /// The peer's display name.
        username: String,
    },

    /// A peer disconnected from the relay.
    UserOffline {
        /// The peer that went offline.
        user_id: UserId,
    },

    /// Authoritative conversation replay; replaces local state wholesale.
    History {
        /// The peer this conversation is with.
        with_user_id: UserId,
        /// Ordered message list, oldest first.
        #[serde(default)]
        messages: Vec<WireMessage>,
    },

    /// A newly routed message.
    Message {
        /// The message record.
        #[serde(flatten)]
        message: WireMessage,
        /// Sender display name, for peers not yet in the directory.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_username: Option<String>,
    },

    /// Protocol-level error report. Logged, never fatal.
    Error {
        /// Human-readable description from the relay.
        message: String,
    },
}

impl ClientFrame {
    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String, FrameError> {
        serde_json::to_string(self).map_err(FrameError::Encode)
    }

    /// Decode a JSON text frame.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(FrameError::Decode)
    }
}

impl ServerFrame {
    /// Serialize to a JSON text frame.
    pub fn encode(&self) -> Result<String, FrameError> {
        serde_json::to_string(self).map_err(FrameError::Encode)
    }

    /// Decode a JSON text frame.
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        serde_json::from_str(text).map_err(FrameError::Decode)
    }
}
