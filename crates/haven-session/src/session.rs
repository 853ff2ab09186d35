//! The session state machine.
//!
//! Dispatches decoded relay frames into the [`StateStore`] and composes
//! outbound sends with an immediate optimistic echo. Every handler is
//! infallible: the protocol defines no fatal outcome, so guard violations
//! and relay error reports shrink the action list instead of returning
//! errors.

use chrono::{DateTime, Utc};
use haven_proto::{AuthToken, ClientFrame, MessageKind, ServerFrame, UserId, WireMessage};
use serde::{Deserialize, Serialize};

use crate::{
    event::{RenderScope, SessionAction, SessionEvent},
    store::{Entry, StateStore},
};

/// Identity of the local user, held for the process lifetime.
///
/// Created at login, persisted by the session store collaborator so a
/// restart can skip re-verification, destroyed on explicit logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Opaque identifier from the credential verifier.
    pub user_id: UserId,
    /// Display name.
    pub username: String,
    /// Bearer token presented in the authentication frame.
    pub token: AuthToken,
}

/// Session state machine.
///
/// Owns the state store and tracks the link's transmit gate and the relay's
/// handshake acknowledgement. Pure: the driver executes the returned
/// [`SessionAction`]s.
#[derive(Debug)]
pub struct Session {
    /// Local identity.
    credentials: Credentials,
    /// Directory, conversations, counters, selection.
    store: StateStore,
    /// Whether the transport is currently open (transmit gate).
    link_open: bool,
    /// Whether the relay acknowledged the authentication frame.
    authenticated: bool,
}

impl Session {
    /// Create a session for the given identity with empty state.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials, store: StateStore::new(), link_open: false, authenticated: false }
    }

    /// The local identity.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// The local user's identifier.
    pub fn local_user(&self) -> &UserId {
        &self.credentials.user_id
    }

    /// Read access to the state store for rendering.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// Whether the relay has acknowledged the handshake.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The authentication frame for this identity.
    ///
    /// Transmitted by the driver as the first frame on every new connection.
    pub fn auth_frame(&self) -> ClientFrame {
        ClientFrame::Auth {
            token: self.credentials.token.clone(),
            user_id: self.credentials.user_id.clone(),
            username: self.credentials.username.clone(),
        }
    }

    /// Process one event and return the resulting actions.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionAction> {
        match event {
            SessionEvent::LinkOpened => {
                self.link_open = true;
                self.authenticated = false;
                Vec::new()
            },
            SessionEvent::LinkClosed => {
                self.link_open = false;
                self.authenticated = false;
                Vec::new()
            },
            SessionEvent::Frame(frame) => self.handle_frame(frame),
            SessionEvent::Select(peer_id) => self.handle_select(peer_id),
            SessionEvent::SendText { body, sent_at } => self.handle_send_text(&body, sent_at),
            SessionEvent::SendMedia { kind, file_url, name, sent_at } => {
                self.handle_send_media(kind, file_url, name, sent_at)
            },
            SessionEvent::Logout => {
                vec![SessionAction::ClearCredentials, SessionAction::CloseLink]
            },
        }
    }

    /// Dispatch one inbound frame.
    fn handle_frame(&mut self, frame: ServerFrame) -> Vec<SessionAction> {
        match frame {
            ServerFrame::Connected { username, .. } => {
                self.authenticated = true;
                tracing::debug!(%username, "authenticated with relay");
                Vec::new()
            },

            ServerFrame::UsersList { users } => {
                self.store.merge_peers(&users);
                vec![SessionAction::Render(RenderScope::Contacts)]
            },

            ServerFrame::UserOnline { user_id, username } => {
                self.apply_presence(user_id, Some(username), true)
            },

            ServerFrame::UserOffline { user_id } => self.apply_presence(user_id, None, false),

            ServerFrame::History { with_user_id, messages } => {
                self.store.ensure_peer(&with_user_id, None);
                self.store.replace_history(&with_user_id, messages);
                if self.store.is_selected(&with_user_id) {
                    vec![SessionAction::Render(RenderScope::Conversation(with_user_id))]
                } else {
                    Vec::new()
                }
            },

            ServerFrame::Message { message, sender_username } => {
                self.handle_inbound_message(message, sender_username)
            },

            ServerFrame::Error { message } => {
                tracing::warn!(%message, "relay reported an error");
                Vec::new()
            },
        }
    }

    /// Upsert one peer's presence flag and refresh affected surfaces.
    fn apply_presence(
        &mut self,
        user_id: UserId,
        username: Option<String>,
        online: bool,
    ) -> Vec<SessionAction> {
        if !self.store.set_presence(&user_id, username.as_deref(), online) {
            return Vec::new();
        }

        let mut actions = vec![SessionAction::Render(RenderScope::Contacts)];
        if self.store.is_selected(&user_id) {
            actions.push(SessionAction::Render(RenderScope::PeerHeader(user_id)));
        }
        actions
    }

    /// Apply a newly routed message.
    ///
    /// Messages from peers are appended to the sender's conversation; a
    /// message bearing our own sender id is the relay echoing one of our
    /// sends and goes through reconciliation instead.
    fn handle_inbound_message(
        &mut self,
        message: WireMessage,
        sender_username: Option<String>,
    ) -> Vec<SessionAction> {
        if message.sender_id == self.credentials.user_id {
            return self.reconcile_echo(message);
        }

        let peer_id = message.sender_id.clone();
        self.store.ensure_peer(&peer_id, sender_username.as_deref());
        self.store.append(&peer_id, Entry::confirmed(message));

        let mut actions = Vec::new();
        if self.store.is_selected(&peer_id) {
            actions.push(SessionAction::Render(RenderScope::Conversation(peer_id)));
        } else {
            self.store.increment_unread(&peer_id);
            actions.push(SessionAction::Render(RenderScope::Contacts));
        }
        actions.push(SessionAction::PlayNotification);
        actions
    }

    /// Reconcile a relay echo of one of our own sends.
    ///
    /// The oldest matching pending echo flips to confirmed in place; with no
    /// match (a send from another connection of the same account) the
    /// message is appended as confirmed. Either way the conversation key is
    /// the receiver, our own sends never count as unread, and no
    /// notification fires.
    fn reconcile_echo(&mut self, message: WireMessage) -> Vec<SessionAction> {
        let peer_id = message.receiver_id.clone();

        if !self.store.confirm_pending(&peer_id, &message) {
            self.store.ensure_peer(&peer_id, None);
            self.store.append(&peer_id, Entry::confirmed(message));
        }

        if self.store.is_selected(&peer_id) {
            vec![SessionAction::Render(RenderScope::Conversation(peer_id))]
        } else {
            Vec::new()
        }
    }

    /// Select a conversation partner.
    ///
    /// Zeroes the peer's unread counter with the selection, refreshes every
    /// affected surface, and requests an authoritative history replay when
    /// the link is open.
    fn handle_select(&mut self, peer_id: UserId) -> Vec<SessionAction> {
        self.store.select(peer_id.clone());

        let mut actions = vec![
            SessionAction::Render(RenderScope::Contacts),
            SessionAction::Render(RenderScope::PeerHeader(peer_id.clone())),
        ];
        if self.link_open {
            actions.push(SessionAction::Send(ClientFrame::GetHistory {
                with_user_id: peer_id.clone(),
            }));
        }
        actions.push(SessionAction::Render(RenderScope::Conversation(peer_id)));
        actions
    }

    /// Compose an outbound text message with optimistic local echo.
    ///
    /// No-op unless a peer is selected, the trimmed body is non-empty, and
    /// the link is open. The echo is appended regardless of whether the
    /// transmit later succeeds; the transport contract is fire-and-forget.
    fn handle_send_text(&mut self, body: &str, sent_at: DateTime<Utc>) -> Vec<SessionAction> {
        let body = body.trim();
        if body.is_empty() || !self.link_open {
            return Vec::new();
        }
        let Some(peer_id) = self.store.selected().cloned() else {
            return Vec::new();
        };

        let frame =
            ClientFrame::Text { receiver_id: peer_id.clone(), content: body.to_owned() };
        let echo = WireMessage {
            sender_id: self.credentials.user_id.clone(),
            receiver_id: peer_id.clone(),
            content: Some(body.to_owned()),
            message_type: MessageKind::Text,
            file_url: None,
            created_at: Some(sent_at),
        };
        self.store.ensure_peer(&peer_id, None);
        self.store.append(&peer_id, Entry::pending(echo));

        vec![
            SessionAction::Send(frame),
            SessionAction::Render(RenderScope::Conversation(peer_id)),
        ]
    }

    /// Compose an outbound media message with optimistic local echo.
    ///
    /// Same guards and echo contract as text; the payload is the blob
    /// reference produced by the upload collaborator beforehand.
    fn handle_send_media(
        &mut self,
        kind: MessageKind,
        file_url: String,
        name: String,
        sent_at: DateTime<Utc>,
    ) -> Vec<SessionAction> {
        if file_url.is_empty() || !self.link_open {
            return Vec::new();
        }
        let Some(peer_id) = self.store.selected().cloned() else {
            return Vec::new();
        };

        let frame = match kind {
            MessageKind::Image => ClientFrame::Image {
                receiver_id: peer_id.clone(),
                content: name.clone(),
                file_url: file_url.clone(),
            },
            MessageKind::File => ClientFrame::File {
                receiver_id: peer_id.clone(),
                content: name.clone(),
                file_url: file_url.clone(),
            },
            MessageKind::Voice => ClientFrame::Voice {
                receiver_id: peer_id.clone(),
                content: name.clone(),
                file_url: file_url.clone(),
            },
            MessageKind::Text => {
                tracing::debug!("media send with text kind ignored");
                return Vec::new();
            },
        };

        let echo = WireMessage {
            sender_id: self.credentials.user_id.clone(),
            receiver_id: peer_id.clone(),
            content: Some(name),
            message_type: kind,
            file_url: Some(file_url),
            created_at: Some(sent_at),
        };
        self.store.ensure_peer(&peer_id, None);
        self.store.append(&peer_id, Entry::pending(echo));

        vec![
            SessionAction::Send(frame),
            SessionAction::Render(RenderScope::Conversation(peer_id)),
        ]
    }
}
