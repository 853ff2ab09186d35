//! Behavioural properties of the session engine.
//!
//! Each test pins one guarantee of the sync engine: presence merging is
//! commutative, conversation logs preserve arrival order, history replays
//! are authoritative, the optimistic echo is deterministic, and guard
//! violations leave no trace.

use haven_harness::{
    Operation, apply_to_session, body, observe_session, peer_id, stamp, test_session,
};
use haven_proto::{ClientFrame, MessageKind, ServerFrame, UserId, WireMessage};
use haven_session::{Delivery, SessionAction, SessionEvent};
use proptest::prelude::*;

proptest! {
    /// The final presence flag equals the last event applied, regardless of
    /// how presence events interleave with an initial snapshot.
    #[test]
    fn prop_presence_last_event_wins(
        snapshot_online in any::<bool>(),
        events in prop::collection::vec(any::<bool>(), 1..8)
    ) {
        let mut session = test_session();
        let _ = apply_to_session(
            &mut session,
            &Operation::UsersList { users: vec![(1, snapshot_online)] },
        );

        for &online in &events {
            let op = if online {
                Operation::UserOnline { peer: 1 }
            } else {
                Operation::UserOffline { peer: 1 }
            };
            let _ = apply_to_session(&mut session, &op);
        }

        let last = *events.last().unwrap_or(&snapshot_online);
        let observed = observe_session(&session);
        let peer = observed.peers.iter().find(|(id, _, _)| id == "u1").unwrap();
        prop_assert_eq!(peer.2, last);
    }

    /// Two inbound messages for the same peer always land in arrival order.
    #[test]
    fn prop_append_order_is_preserved(
        prefix in prop::collection::vec(any::<u8>(), 0..5),
        first in any::<u8>(),
        second in any::<u8>()
    ) {
        let mut session = test_session();
        for seed in &prefix {
            let _ = apply_to_session(&mut session, &Operation::Inbound { peer: 1, seed: *seed });
        }

        let _ = apply_to_session(&mut session, &Operation::Inbound { peer: 1, seed: first });
        let _ = apply_to_session(&mut session, &Operation::Inbound { peer: 1, seed: second });

        let log = session.store().conversation(&peer_id(1));
        let len = log.len();
        prop_assert_eq!(len, prefix.len() + 2);
        prop_assert_eq!(log[len - 2].message.content.as_deref(), Some(body(first).as_str()));
        prop_assert_eq!(log[len - 1].message.content.as_deref(), Some(body(second).as_str()));
    }

    /// A history replay replaces the whole conversation, never merges.
    #[test]
    fn prop_history_replace_is_total(
        existing in prop::collection::vec(any::<u8>(), 1..6),
        replay_count in 0..4u8
    ) {
        let mut session = test_session();
        for seed in &existing {
            let _ = apply_to_session(&mut session, &Operation::Inbound { peer: 2, seed: *seed });
        }

        let _ = apply_to_session(
            &mut session,
            &Operation::History { peer: 2, count: replay_count },
        );

        let log = session.store().conversation(&peer_id(2));
        prop_assert_eq!(log.len(), usize::from(replay_count % 4));
    }

    /// Sending appends exactly one pending echo with the expected fields,
    /// regardless of what the transport later does with the frame.
    #[test]
    fn prop_optimistic_echo_is_deterministic(raw_body in "[a-z]{1,12}") {
        let mut session = test_session();
        let _ = apply_to_session(&mut session, &Operation::LinkOpen);
        let _ = apply_to_session(&mut session, &Operation::UsersList { users: vec![(3, true)] });
        let _ = apply_to_session(&mut session, &Operation::Select { peer: 3 });

        let actions = session.handle(SessionEvent::SendText {
            body: raw_body.clone(),
            sent_at: stamp(0),
        });

        let log = session.store().conversation(&peer_id(3));
        prop_assert_eq!(log.len(), 1);
        prop_assert_eq!(log[0].delivery, Delivery::Pending);
        prop_assert_eq!(&log[0].message.sender_id, &UserId::new("me"));
        prop_assert_eq!(&log[0].message.receiver_id, &peer_id(3));
        prop_assert_eq!(log[0].message.content.as_deref(), Some(raw_body.as_str()));

        let sends: Vec<_> = actions
            .iter()
            .filter(|action| matches!(action, SessionAction::Send(_)))
            .collect();
        prop_assert_eq!(sends.len(), 1);
    }
}

/// Sending with no peer selected mutates nothing and transmits nothing.
#[test]
fn guard_no_selection_is_a_no_op() {
    let mut session = test_session();
    let _ = apply_to_session(&mut session, &Operation::LinkOpen);
    let _ = apply_to_session(&mut session, &Operation::UsersList { users: vec![(1, true)] });

    let before = observe_session(&session);
    let actions =
        session.handle(SessionEvent::SendText { body: "hi".to_owned(), sent_at: stamp(0) });

    assert!(actions.is_empty());
    assert_eq!(observe_session(&session), before);
}

/// Sending on a closed link mutates nothing and transmits nothing.
#[test]
fn guard_closed_link_is_a_no_op() {
    let mut session = test_session();
    let _ = apply_to_session(&mut session, &Operation::UsersList { users: vec![(1, true)] });
    let _ = apply_to_session(&mut session, &Operation::Select { peer: 1 });

    let before = observe_session(&session);
    let actions =
        session.handle(SessionEvent::SendText { body: "hi".to_owned(), sent_at: stamp(0) });

    assert!(actions.is_empty());
    assert_eq!(observe_session(&session), before);
}

/// The relay echoing a send back to its sender never duplicates the entry.
#[test]
fn relay_echo_reconciles_against_pending() {
    let mut session = test_session();
    let _ = apply_to_session(&mut session, &Operation::LinkOpen);
    let _ = apply_to_session(&mut session, &Operation::UsersList { users: vec![(1, true)] });
    let _ = apply_to_session(&mut session, &Operation::Select { peer: 1 });

    let _ = session.handle(SessionEvent::SendText { body: "ping".to_owned(), sent_at: stamp(0) });

    let echo = ServerFrame::Message {
        message: WireMessage {
            sender_id: UserId::new("me"),
            receiver_id: peer_id(1),
            content: Some("ping".to_owned()),
            message_type: MessageKind::Text,
            file_url: None,
            created_at: Some(stamp(1)),
        },
        sender_username: None,
    };
    let actions = session.handle(SessionEvent::Frame(echo));

    let log = session.store().conversation(&peer_id(1));
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].delivery, Delivery::Confirmed);
    assert!(!actions.contains(&SessionAction::PlayNotification));
}

/// Selecting a peer requests a history replay on an open link.
#[test]
fn selection_requests_history_replay() {
    let mut session = test_session();
    let _ = apply_to_session(&mut session, &Operation::LinkOpen);
    let _ = apply_to_session(&mut session, &Operation::UsersList { users: vec![(4, true)] });

    let actions = apply_to_session(&mut session, &Operation::Select { peer: 4 });
    assert!(actions.contains(&SessionAction::Send(ClientFrame::GetHistory {
        with_user_id: peer_id(4),
    })));
}
