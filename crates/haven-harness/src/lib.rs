//! Test harness for the haven session engine.
//!
//! Provides a reference model of the client state ([`ModelState`]), a
//! randomized [`Operation`] vocabulary, and helpers that apply the same
//! operations to a real [`Session`] so the two can be compared observably.
//!
//! The model is deliberately primitive — plain ordered maps and direct
//! mutation — so its correctness is visible at a glance; the real engine
//! earns trust by matching it over arbitrary operation sequences.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod model;
pub mod operation;

use haven_proto::{AuthToken, UserId};
use haven_session::{Credentials, Session, SessionAction};

pub use model::{ModelState, ObservableState, SimpleMessage, observe_session, operation_event};
pub use operation::{
    LOCAL_ID, Operation, PeerNo, blob_url, body, history_messages, media_kind, peer_id, peer_name,
    stamp,
};

/// A session for the standard harness identity.
pub fn test_session() -> Session {
    Session::new(Credentials {
        user_id: UserId::new(LOCAL_ID),
        username: "local".to_owned(),
        token: AuthToken::new("harness-token"),
    })
}

/// Apply one operation to a real session, returning its actions.
pub fn apply_to_session(session: &mut Session, operation: &Operation) -> Vec<SessionAction> {
    session.handle(operation_event(operation))
}
