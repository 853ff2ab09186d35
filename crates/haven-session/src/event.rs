//! Events fed into the session and actions it produces.

use chrono::{DateTime, Utc};
use haven_proto::{ClientFrame, MessageKind, ServerFrame, UserId};

/// Events fed into the [`crate::Session`] state machine.
///
/// Frame events arrive in connection receipt order; the driver never
/// interleaves two `handle` calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The transport opened and the authentication frame was transmitted.
    LinkOpened,

    /// The transport was lost; sends are suppressed until it reopens.
    LinkClosed,

    /// A decoded frame arrived from the relay.
    Frame(ServerFrame),

    /// The local user selected a conversation partner.
    Select(UserId),

    /// The local user submitted a text message.
    SendText {
        /// Raw input; leading/trailing whitespace is not a message.
        body: String,
        /// Send time, stamped by the driver's clock.
        sent_at: DateTime<Utc>,
    },

    /// The local user sent a media message whose blob is already uploaded.
    SendMedia {
        /// `image`, `file`, or `voice`.
        kind: MessageKind,
        /// Public blob reference from the upload collaborator.
        file_url: String,
        /// Display name shown in the conversation.
        name: String,
        /// Send time, stamped by the driver's clock.
        sent_at: DateTime<Utc>,
    },

    /// The local user logged out.
    Logout,
}

/// Which part of the presentation must be refreshed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderScope {
    /// The contact list: names, presence flags, unread badges.
    Contacts,

    /// The message log of one conversation.
    Conversation(UserId),

    /// The selected peer's name and presence header.
    PeerHeader(UserId),
}

/// Side effects for the driver to execute, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Transmit a frame. Dropped silently if the link is not open.
    Send(ClientFrame),

    /// Re-render part of the presentation from the state store.
    Render(RenderScope),

    /// Play the inbound-message notification sound.
    PlayNotification,

    /// Clear the persisted credential slot.
    ClearCredentials,

    /// Tear down the transport and suppress reconnection.
    CloseLink,
}
