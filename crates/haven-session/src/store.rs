//! Local state: peer directory, conversation logs, unread counters,
//! selection.
//!
//! The store is the single source of truth for the presentation layer. It is
//! mutated only by the session state machine, one event at a time, so no
//! internal locking is needed; a multi-threaded host must serialize access
//! to the owning session instead.
//!
//! # Invariants
//!
//! - The peer directory is append-only: snapshots and presence events upsert
//!   but never remove.
//! - Every entry in the conversation keyed by peer `P` has `P` as its sender
//!   or receiver (the other side being the local user).
//! - The selected peer's unread counter is always zero: selection and the
//!   counter reset are one operation.

use std::collections::HashMap;

use haven_proto::{UserEntry, UserId, WireMessage};

/// Delivery status of a conversation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Inserted optimistically at send time; the relay has not echoed it.
    Pending,
    /// Received from the relay, replayed from history, or echo-confirmed.
    Confirmed,
}

/// One message in a conversation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// The message record.
    pub message: WireMessage,
    /// Local delivery status.
    pub delivery: Delivery,
}

impl Entry {
    /// A confirmed entry, as produced for every relay-originated message.
    pub fn confirmed(message: WireMessage) -> Self {
        Self { message, delivery: Delivery::Confirmed }
    }

    /// A pending entry, as produced by the optimistic local echo.
    pub fn pending(message: WireMessage) -> Self {
        Self { message, delivery: Delivery::Pending }
    }
}

/// A peer known to this session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Display name.
    pub username: String,
    /// Whether the peer currently holds a relay connection.
    pub online: bool,
}

/// Mutable session state behind the presentation layer.
#[derive(Debug, Default)]
pub struct StateStore {
    peers: HashMap<UserId, Peer>,
    conversations: HashMap<UserId, Vec<Entry>>,
    unread: HashMap<UserId, u64>,
    selected: Option<UserId>,
}

impl StateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a directory snapshot: insert-or-update every listed peer.
    ///
    /// Peers absent from the snapshot are untouched; the directory never
    /// shrinks.
    pub fn merge_peers(&mut self, entries: &[UserEntry]) {
        for entry in entries {
            self.peers.insert(
                entry.id.clone(),
                Peer { username: entry.username.clone(), online: entry.online },
            );
        }
    }

    /// Upsert one peer's presence flag.
    ///
    /// An unknown peer is created when a display name is available (the
    /// `user_online` case). An offline report for a peer we have never seen
    /// carries nothing worth storing and is dropped; returns `false` so the
    /// caller can skip re-rendering.
    pub fn set_presence(&mut self, user_id: &UserId, username: Option<&str>, online: bool) -> bool {
        if let Some(peer) = self.peers.get_mut(user_id) {
            peer.online = online;
            if let Some(name) = username {
                peer.username = name.to_owned();
            }
            return true;
        }

        match username {
            Some(name) => {
                self.peers.insert(user_id.clone(), Peer { username: name.to_owned(), online });
                true
            },
            None => false,
        }
    }

    /// Insert a peer into the directory if absent, without touching presence.
    ///
    /// Keeps the directory a superset of every conversation key when a
    /// message arrives from a peer no snapshot has mentioned yet. The raw
    /// identifier stands in for the name until the directory learns better.
    pub fn ensure_peer(&mut self, user_id: &UserId, username: Option<&str>) {
        self.peers.entry(user_id.clone()).or_insert_with(|| Peer {
            username: username.unwrap_or(user_id.as_str()).to_owned(),
            online: false,
        });
    }

    /// Look up one peer.
    pub fn peer(&self, user_id: &UserId) -> Option<&Peer> {
        self.peers.get(user_id)
    }

    /// All known peers, unordered. Presenters sort for display.
    pub fn peers(&self) -> impl Iterator<Item = (&UserId, &Peer)> {
        self.peers.iter()
    }

    /// Append one entry to a peer's conversation, creating the log lazily.
    pub fn append(&mut self, peer_id: &UserId, entry: Entry) {
        self.conversations.entry(peer_id.clone()).or_default().push(entry);
    }

    /// Replace a peer's conversation wholesale with a history replay.
    ///
    /// Authoritative: prior contents (pending echoes included) are
    /// discarded, and an empty replay empties the conversation.
    pub fn replace_history(&mut self, peer_id: &UserId, messages: Vec<WireMessage>) {
        let entries = messages.into_iter().map(Entry::confirmed).collect();
        self.conversations.insert(peer_id.clone(), entries);
    }

    /// The conversation log for a peer; empty if none exists yet.
    pub fn conversation(&self, peer_id: &UserId) -> &[Entry] {
        self.conversations.get(peer_id).map_or(&[], Vec::as_slice)
    }

    /// All conversation logs, unordered.
    pub fn conversations(&self) -> impl Iterator<Item = (&UserId, &[Entry])> {
        self.conversations.iter().map(|(id, entries)| (id, entries.as_slice()))
    }

    /// Flip the oldest matching pending entry to confirmed.
    ///
    /// A match has the same kind, content, and blob reference as `message`.
    /// Returns whether an entry was confirmed; if not, the caller appends
    /// the message as a new confirmed entry.
    pub fn confirm_pending(&mut self, peer_id: &UserId, message: &WireMessage) -> bool {
        let Some(entries) = self.conversations.get_mut(peer_id) else {
            return false;
        };

        let matched = entries.iter_mut().find(|entry| {
            entry.delivery == Delivery::Pending
                && entry.message.message_type == message.message_type
                && entry.message.content == message.content
                && entry.message.file_url == message.file_url
        });

        match matched {
            Some(entry) => {
                entry.delivery = Delivery::Confirmed;
                true
            },
            None => false,
        }
    }

    /// A peer's unread counter.
    pub fn unread_count(&self, peer_id: &UserId) -> u64 {
        self.unread.get(peer_id).copied().unwrap_or(0)
    }

    /// Count one more unread message for a peer.
    pub fn increment_unread(&mut self, peer_id: &UserId) {
        *self.unread.entry(peer_id.clone()).or_insert(0) += 1;
    }

    /// All nonzero unread counters, unordered.
    pub fn unread_peers(&self) -> impl Iterator<Item = (&UserId, u64)> {
        self.unread.iter().filter(|(_, &count)| count > 0).map(|(id, &count)| (id, count))
    }

    /// Mark a peer as the selected conversation.
    ///
    /// Also zeroes that peer's unread counter; the two changes are one
    /// operation so no observer ever sees a selected peer with a stale
    /// counter.
    pub fn select(&mut self, peer_id: UserId) {
        self.unread.remove(&peer_id);
        self.selected = Some(peer_id);
    }

    /// The currently selected peer, if any.
    pub fn selected(&self) -> Option<&UserId> {
        self.selected.as_ref()
    }

    /// Whether the given peer is the selected conversation.
    pub fn is_selected(&self, peer_id: &UserId) -> bool {
        self.selected.as_ref() == Some(peer_id)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use haven_proto::MessageKind;

    use super::*;

    fn entry(id: &str) -> UserEntry {
        UserEntry { id: UserId::new(id), username: id.to_uppercase(), online: true }
    }

    fn text(sender: &str, receiver: &str, body: &str) -> WireMessage {
        WireMessage {
            sender_id: UserId::new(sender),
            receiver_id: UserId::new(receiver),
            content: Some(body.to_owned()),
            message_type: MessageKind::Text,
            file_url: None,
            created_at: None,
        }
    }

    #[test]
    fn merge_never_removes_peers() {
        let mut store = StateStore::new();
        store.merge_peers(&[entry("u1"), entry("u2")]);
        store.merge_peers(&[entry("u3")]);

        assert_eq!(store.peers().count(), 3);
        assert!(store.peer(&UserId::new("u1")).is_some());
    }

    #[test]
    fn merge_updates_name_and_presence() {
        let mut store = StateStore::new();
        store.merge_peers(&[entry("u1")]);
        store.merge_peers(&[UserEntry {
            id: UserId::new("u1"),
            username: "renamed".to_owned(),
            online: false,
        }]);

        let peer = store.peer(&UserId::new("u1")).unwrap();
        assert_eq!(peer.username, "renamed");
        assert!(!peer.online);
    }

    #[test]
    fn presence_upsert_creates_named_peer() {
        let mut store = StateStore::new();
        assert!(store.set_presence(&UserId::new("u5"), Some("eve"), true));

        let peer = store.peer(&UserId::new("u5")).unwrap();
        assert_eq!(peer.username, "eve");
        assert!(peer.online);
    }

    #[test]
    fn offline_for_unknown_peer_is_dropped() {
        let mut store = StateStore::new();
        assert!(!store.set_presence(&UserId::new("ghost"), None, false));
        assert_eq!(store.peers().count(), 0);
    }

    #[test]
    fn select_resets_unread_atomically() {
        let mut store = StateStore::new();
        let peer = UserId::new("u2");
        store.increment_unread(&peer);
        store.increment_unread(&peer);
        assert_eq!(store.unread_count(&peer), 2);

        store.select(peer.clone());
        assert!(store.is_selected(&peer));
        assert_eq!(store.unread_count(&peer), 0);
    }

    #[test]
    fn history_replace_is_total() {
        let mut store = StateStore::new();
        let peer = UserId::new("u2");
        store.append(&peer, Entry::confirmed(text("u2", "u1", "old")));
        store.append(&peer, Entry::pending(text("u1", "u2", "unsent")));

        store.replace_history(&peer, Vec::new());
        assert!(store.conversation(&peer).is_empty());
    }

    #[test]
    fn confirm_pending_flips_oldest_match_only() {
        let mut store = StateStore::new();
        let peer = UserId::new("u2");
        store.append(&peer, Entry::pending(text("u1", "u2", "hi")));
        store.append(&peer, Entry::pending(text("u1", "u2", "hi")));

        assert!(store.confirm_pending(&peer, &text("u1", "u2", "hi")));

        let log = store.conversation(&peer);
        assert_eq!(log[0].delivery, Delivery::Confirmed);
        assert_eq!(log[1].delivery, Delivery::Pending);
    }

    #[test]
    fn confirm_pending_ignores_confirmed_and_mismatched() {
        let mut store = StateStore::new();
        let peer = UserId::new("u2");
        store.append(&peer, Entry::confirmed(text("u1", "u2", "hi")));
        store.append(&peer, Entry::pending(text("u1", "u2", "other")));

        assert!(!store.confirm_pending(&peer, &text("u1", "u2", "hi")));
    }

    #[test]
    fn ensure_peer_falls_back_to_identifier() {
        let mut store = StateStore::new();
        let peer = UserId::new("u7");
        store.ensure_peer(&peer, None);

        assert_eq!(store.peer(&peer).unwrap().username, "u7");

        // A later ensure with a name does not clobber the existing record.
        store.ensure_peer(&peer, Some("georg"));
        assert_eq!(store.peer(&peer).unwrap().username, "u7");
    }
}
