//! Fuzz target for the [`Link`] state machine
//!
//! Prevent leaked reconnect loops via invalid state transitions
//!
//! # Strategy
//!
//! - Event sequences: arbitrary interleavings of dials, opens, losses,
//!   ticks, and shutdown
//! - Timer probing: advance time by arbitrary amounts around the retry
//!
//! # Invariants
//!
//! - After `shutdown`, no sequence of events produces a `Dial`
//! - A loss schedules at most one retry; a duplicate loss schedules none
//! - A due tick dials exactly once and consumes the retry
//! - Shutdown is terminal: state stays `Closed`, retry slot stays empty
//! - NEVER panic on any event order

#![no_main]

use std::time::{Duration, Instant};

use arbitrary::Arbitrary;
use haven_core::{Link, LinkAction, LinkConfig, LinkState};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum LinkEvent {
    DialStarted,
    Opened,
    Lost { advance_secs: u8 },
    Tick { advance_secs: u8 },
    Shutdown,
}

fuzz_target!(|events: Vec<LinkEvent>| {
    let mut link = Link::new(LinkConfig::default());
    let mut now = Instant::now();
    let mut shut_down = false;

    for event in events {
        match event {
            LinkEvent::DialStarted => {
                let result = link.dial_started();
                if shut_down {
                    assert!(result.is_err(), "dial accepted after shutdown");
                }
            },

            LinkEvent::Opened => {
                let result = link.opened();
                if shut_down {
                    assert!(result.is_err(), "open accepted after shutdown");
                }
                if let Ok(actions) = result {
                    assert_eq!(actions, vec![LinkAction::Authenticate]);
                }
            },

            LinkEvent::Lost { advance_secs } => {
                now += Duration::from_secs(u64::from(advance_secs % 120));
                let had_retry = link.retry_at().is_some();
                let actions = link.lost(now);

                assert_eq!(link.state(), LinkState::Closed);
                if shut_down || had_retry {
                    assert!(actions.is_empty(), "loss double-scheduled a retry");
                } else {
                    assert!(actions.len() <= 1);
                }
            },

            LinkEvent::Tick { advance_secs } => {
                now += Duration::from_secs(u64::from(advance_secs % 120));
                let actions = link.tick(now);

                let dials = actions.iter().filter(|a| **a == LinkAction::Dial).count();
                assert!(dials <= 1, "tick produced {dials} dials");
                if shut_down {
                    assert!(actions.is_empty(), "tick dialed after shutdown");
                }
                if dials == 1 {
                    assert!(link.retry_at().is_none(), "dial left the retry scheduled");
                }
            },

            LinkEvent::Shutdown => {
                link.shutdown();
                shut_down = true;
            },
        }

        if shut_down {
            assert_eq!(link.state(), LinkState::Closed, "shutdown must pin Closed");
            assert!(link.retry_at().is_none(), "shutdown must cancel the retry");
            assert!(link.is_shut_down());
        }
    }
});
