//! Operations for model-based testing.
//!
//! Operations represent everything that can happen to a session: relay
//! pushes, user intents, and link transitions. They are generated randomly
//! (by proptest or a fuzzer) and applied to both the reference model and
//! the real session, which must stay observably identical.

use arbitrary::Arbitrary;
use chrono::{DateTime, TimeZone, Utc};
use haven_proto::{MessageKind, UserId, WireMessage};

/// Compact peer handle, expanded to a stable identifier/name pair.
///
/// A small space keeps generated sequences likely to revisit the same peer.
pub type PeerNo = u8;

/// The local user's identifier in every harness run.
pub const LOCAL_ID: &str = "me";

/// Operations that can be applied to a session.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Relay pushes a directory snapshot.
    UsersList {
        /// Listed peers with their presence flags.
        users: Vec<(PeerNo, bool)>,
    },

    /// A peer came online.
    UserOnline {
        /// The peer.
        peer: PeerNo,
    },

    /// A peer went offline.
    UserOffline {
        /// The peer.
        peer: PeerNo,
    },

    /// Relay replays a conversation wholesale.
    History {
        /// The peer the conversation is with.
        peer: PeerNo,
        /// Replay length hint (reduced modulo a small bound).
        count: u8,
    },

    /// A peer sent the local user a message.
    Inbound {
        /// The sending peer.
        peer: PeerNo,
        /// Deterministic content seed.
        seed: u8,
    },

    /// The local user selected a conversation.
    Select {
        /// The peer to select.
        peer: PeerNo,
    },

    /// The local user submitted a text message.
    SendText {
        /// Deterministic content seed.
        seed: u8,
    },

    /// The local user sent a media message.
    SendMedia {
        /// Deterministic content seed; also picks the kind.
        seed: u8,
    },

    /// The transport opened.
    LinkOpen,

    /// The transport dropped.
    LinkClose,
}

/// Stable identifier for a peer handle.
pub fn peer_id(peer: PeerNo) -> UserId {
    UserId::new(format!("u{peer}"))
}

/// Stable display name for a peer handle.
pub fn peer_name(peer: PeerNo) -> String {
    format!("user{peer}")
}

/// Deterministic message body for a seed.
pub fn body(seed: u8) -> String {
    format!("msg-{seed}")
}

/// Deterministic blob reference for a seed.
pub fn blob_url(seed: u8) -> String {
    format!("https://blobs/b{seed}")
}

/// Deterministic media kind for a seed.
pub fn media_kind(seed: u8) -> MessageKind {
    match seed % 3 {
        0 => MessageKind::Image,
        1 => MessageKind::File,
        _ => MessageKind::Voice,
    }
}

/// Deterministic timestamp for a seed.
pub fn stamp(seed: u8) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + i64::from(seed), 0)
        .single()
        .unwrap_or_else(Utc::now)
}

/// The message list a `History` operation replays.
///
/// Alternates direction so conversations contain both sides.
pub fn history_messages(peer: PeerNo, count: u8) -> Vec<WireMessage> {
    (0..count % 4)
        .map(|i| {
            let (sender, receiver) = if i % 2 == 0 {
                (peer_id(peer), UserId::new(LOCAL_ID))
            } else {
                (UserId::new(LOCAL_ID), peer_id(peer))
            };
            WireMessage {
                sender_id: sender,
                receiver_id: receiver,
                content: Some(format!("h{i}")),
                message_type: MessageKind::Text,
                file_url: None,
                created_at: Some(stamp(i)),
            }
        })
        .collect()
}
