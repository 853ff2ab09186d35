//! Fuzz target for the session state machine
//!
//! Applies arbitrary operation sequences (relay pushes, user intents, link
//! transitions) and checks the store's standing invariants after every one.
//!
//! # Invariants
//!
//! - Event handling NEVER panics
//! - The selected peer's unread counter is always zero
//! - The peer directory is a superset of every conversation and counter key

#![no_main]

use haven_harness::{Operation, apply_to_session, observe_session, test_session};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|ops: Vec<Operation>| {
    let mut session = test_session();

    for op in &ops {
        let _ = apply_to_session(&mut session, op);

        let state = observe_session(&session);

        if let Some(selected) = &state.selected {
            assert!(
                state.unread.iter().all(|(id, _)| id != selected),
                "selected peer {selected} has a nonzero unread counter"
            );
        }

        let directory: Vec<&String> = state.peers.iter().map(|(id, _, _)| id).collect();
        for (id, _) in &state.conversations {
            assert!(directory.contains(&id), "conversation for {id} missing from directory");
        }
        for (id, _) in &state.unread {
            assert!(directory.contains(&id), "counter for {id} missing from directory");
        }
    }
});
