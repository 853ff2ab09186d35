//! Fuzz target for the JSON frame codec
//!
//! # Invariants
//!
//! - Decoding arbitrary input NEVER panics
//! - Every successfully decoded frame re-encodes
//! - Re-encoded frames decode back to the same value

#![no_main]

use haven_proto::{ClientFrame, ServerFrame};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(frame) = ServerFrame::decode(text) {
        let encoded = frame.encode().expect("decoded server frame must re-encode");
        let reparsed = ServerFrame::decode(&encoded).expect("re-encoded server frame must decode");
        assert_eq!(frame, reparsed);
    }

    if let Ok(frame) = ClientFrame::decode(text) {
        let encoded = frame.encode().expect("decoded client frame must re-encode");
        let reparsed = ClientFrame::decode(&encoded).expect("re-encoded client frame must decode");
        assert_eq!(frame, reparsed);
    }
});
