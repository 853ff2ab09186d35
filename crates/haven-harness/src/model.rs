//! Reference model of the client state.
//!
//! A simplified implementation that captures WHAT the engine must do — the
//! directory, conversation, unread, and selection rules — with none of the
//! action plumbing. It is the oracle against which the real session is
//! verified.
//!
//! # Design principles
//!
//! - Simplicity: the model should be obviously correct
//! - Determinism: same operations produce the same state

use std::collections::BTreeMap;

use haven_proto::{MessageKind, WireMessage};
use haven_session::{Session, SessionEvent};

use crate::operation::{
    LOCAL_ID, Operation, blob_url, body, history_messages, media_kind, peer_id, peer_name, stamp,
};

/// A message reduced to its observable fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimpleMessage {
    /// Sender identifier.
    pub sender: String,
    /// Body or display name.
    pub content: Option<String>,
    /// Payload kind.
    pub kind: MessageKind,
    /// Blob reference, for media.
    pub file_url: Option<String>,
}

impl From<&WireMessage> for SimpleMessage {
    fn from(message: &WireMessage) -> Self {
        Self {
            sender: message.sender_id.as_str().to_owned(),
            content: message.content.clone(),
            kind: message.message_type,
            file_url: message.file_url.clone(),
        }
    }
}

/// The subset of state that model and real session must agree on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableState {
    /// `(id, username, online)` for every directory entry, sorted by id.
    pub peers: Vec<(String, String, bool)>,
    /// Conversation logs keyed by peer id, sorted by id.
    pub conversations: Vec<(String, Vec<SimpleMessage>)>,
    /// Nonzero unread counters, sorted by peer id.
    pub unread: Vec<(String, u64)>,
    /// The selected peer, if any.
    pub selected: Option<String>,
}

/// Reference model state: the plain maps behind the engine's behaviour.
#[derive(Debug, Clone, Default)]
pub struct ModelState {
    peers: BTreeMap<String, (String, bool)>,
    conversations: BTreeMap<String, Vec<SimpleMessage>>,
    unread: BTreeMap<String, u64>,
    selected: Option<String>,
    link_open: bool,
}

impl ModelState {
    /// Fresh model with an empty directory and a closed link.
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one operation.
    pub fn apply(&mut self, operation: &Operation) {
        match operation {
            Operation::UsersList { users } => {
                for (peer, online) in users {
                    self.peers
                        .insert(peer_id(*peer).as_str().to_owned(), (peer_name(*peer), *online));
                }
            },

            Operation::UserOnline { peer } => {
                let id = peer_id(*peer).as_str().to_owned();
                let entry = self.peers.entry(id).or_insert_with(|| (peer_name(*peer), true));
                entry.0 = peer_name(*peer);
                entry.1 = true;
            },

            Operation::UserOffline { peer } => {
                // Offline reports for unknown peers carry nothing to store.
                if let Some(entry) = self.peers.get_mut(peer_id(*peer).as_str()) {
                    entry.1 = false;
                }
            },

            Operation::History { peer, count } => {
                let id = peer_id(*peer).as_str().to_owned();
                // The identifier stands in for the name until a snapshot or
                // presence event supplies one.
                self.peers.entry(id.clone()).or_insert_with(|| (id.clone(), false));
                let messages =
                    history_messages(*peer, *count).iter().map(SimpleMessage::from).collect();
                self.conversations.insert(id, messages);
            },

            Operation::Inbound { peer, seed } => {
                let id = peer_id(*peer).as_str().to_owned();
                self.peers.entry(id.clone()).or_insert_with(|| (peer_name(*peer), false));
                self.conversations.entry(id.clone()).or_default().push(SimpleMessage {
                    sender: id.clone(),
                    content: Some(body(*seed)),
                    kind: MessageKind::Text,
                    file_url: None,
                });
                if self.selected.as_deref() != Some(id.as_str()) {
                    *self.unread.entry(id).or_insert(0) += 1;
                }
            },

            Operation::Select { peer } => {
                let id = peer_id(*peer).as_str().to_owned();
                self.unread.remove(&id);
                self.selected = Some(id);
            },

            Operation::SendText { seed } => {
                if !self.link_open {
                    return;
                }
                let Some(id) = self.selected.clone() else {
                    return;
                };
                self.peers.entry(id.clone()).or_insert_with(|| (id.clone(), false));
                self.conversations.entry(id).or_default().push(SimpleMessage {
                    sender: LOCAL_ID.to_owned(),
                    content: Some(body(*seed)),
                    kind: MessageKind::Text,
                    file_url: None,
                });
            },

            Operation::SendMedia { seed } => {
                if !self.link_open {
                    return;
                }
                let Some(id) = self.selected.clone() else {
                    return;
                };
                self.peers.entry(id.clone()).or_insert_with(|| (id.clone(), false));
                self.conversations.entry(id).or_default().push(SimpleMessage {
                    sender: LOCAL_ID.to_owned(),
                    content: Some(format!("blob-{seed}")),
                    kind: media_kind(*seed),
                    file_url: Some(blob_url(*seed)),
                });
            },

            Operation::LinkOpen => self.link_open = true,
            Operation::LinkClose => self.link_open = false,
        }
    }

    /// Extract the observable state.
    pub fn observable(&self) -> ObservableState {
        ObservableState {
            peers: self
                .peers
                .iter()
                .map(|(id, (name, online))| (id.clone(), name.clone(), *online))
                .collect(),
            conversations: self
                .conversations
                .iter()
                .map(|(id, messages)| (id.clone(), messages.clone()))
                .collect(),
            unread: self
                .unread
                .iter()
                .filter(|(_, &count)| count > 0)
                .map(|(id, &count)| (id.clone(), count))
                .collect(),
            selected: self.selected.clone(),
        }
    }
}

/// Extract comparable state from a real session.
pub fn observe_session(session: &Session) -> ObservableState {
    let store = session.store();

    let mut peers: Vec<(String, String, bool)> = store
        .peers()
        .map(|(id, peer)| (id.as_str().to_owned(), peer.username.clone(), peer.online))
        .collect();
    peers.sort();

    let mut conversations: Vec<(String, Vec<SimpleMessage>)> = store
        .conversations()
        .map(|(id, entries)| {
            (
                id.as_str().to_owned(),
                entries.iter().map(|entry| SimpleMessage::from(&entry.message)).collect(),
            )
        })
        .collect();
    conversations.sort_by(|a, b| a.0.cmp(&b.0));

    let mut unread: Vec<(String, u64)> =
        store.unread_peers().map(|(id, count)| (id.as_str().to_owned(), count)).collect();
    unread.sort();

    ObservableState {
        peers,
        conversations,
        unread,
        selected: store.selected().map(|id| id.as_str().to_owned()),
    }
}

/// Translate one operation into the session event it stands for.
pub fn operation_event(operation: &Operation) -> SessionEvent {
    use haven_proto::{ServerFrame, UserEntry, UserId};

    match operation {
        Operation::UsersList { users } => SessionEvent::Frame(ServerFrame::UsersList {
            users: users
                .iter()
                .map(|(peer, online)| UserEntry {
                    id: peer_id(*peer),
                    username: peer_name(*peer),
                    online: *online,
                })
                .collect(),
        }),

        Operation::UserOnline { peer } => SessionEvent::Frame(ServerFrame::UserOnline {
            user_id: peer_id(*peer),
            username: peer_name(*peer),
        }),

        Operation::UserOffline { peer } => {
            SessionEvent::Frame(ServerFrame::UserOffline { user_id: peer_id(*peer) })
        },

        Operation::History { peer, count } => SessionEvent::Frame(ServerFrame::History {
            with_user_id: peer_id(*peer),
            messages: history_messages(*peer, *count),
        }),

        Operation::Inbound { peer, seed } => SessionEvent::Frame(ServerFrame::Message {
            message: WireMessage {
                sender_id: peer_id(*peer),
                receiver_id: UserId::new(LOCAL_ID),
                content: Some(body(*seed)),
                message_type: MessageKind::Text,
                file_url: None,
                created_at: Some(stamp(*seed)),
            },
            sender_username: Some(peer_name(*peer)),
        }),

        Operation::Select { peer } => SessionEvent::Select(peer_id(*peer)),

        Operation::SendText { seed } => {
            SessionEvent::SendText { body: body(*seed), sent_at: stamp(*seed) }
        },

        Operation::SendMedia { seed } => SessionEvent::SendMedia {
            kind: media_kind(*seed),
            file_url: blob_url(*seed),
            name: format!("blob-{seed}"),
            sent_at: stamp(*seed),
        },

        Operation::LinkOpen => SessionEvent::LinkOpened,
        Operation::LinkClose => SessionEvent::LinkClosed,
    }
}
