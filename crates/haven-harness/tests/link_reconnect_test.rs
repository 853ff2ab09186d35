//! Reconnect scenario tests for the link state machine.
//!
//! The driver is a thin executor around [`Link`], so these scenarios pin
//! the schedule itself: one retry per loss, indefinitely, until logout.

use std::time::{Duration, Instant};

use haven_core::{Link, LinkAction, LinkConfig, LinkState, RECONNECT_DELAY};
use proptest::prelude::*;

/// Walk a link through `rounds` full loss/redial cycles.
fn run_rounds(link: &mut Link, start: Instant, rounds: u64) {
    for round in 0..rounds {
        let loss_at = start + Duration::from_secs(round * 30);

        let scheduled = link.lost(loss_at);
        assert_eq!(
            scheduled,
            vec![LinkAction::ScheduleRetry { at: loss_at + RECONNECT_DELAY }],
            "round {round}: loss must schedule exactly one retry"
        );

        // Early ticks are quiet; the due tick dials exactly once.
        assert!(link.tick(loss_at + Duration::from_millis(100)).is_empty());
        assert_eq!(link.tick(loss_at + RECONNECT_DELAY), vec![LinkAction::Dial]);
        assert!(link.tick(loss_at + RECONNECT_DELAY + Duration::from_secs(1)).is_empty());

        link.dial_started().unwrap();
        let actions = link.opened().unwrap();
        assert_eq!(actions, vec![LinkAction::Authenticate]);
    }
}

#[test]
fn reconnect_repeats_indefinitely_until_logout() {
    let start = Instant::now();
    let mut link = Link::new(LinkConfig::default());
    link.dial_started().unwrap();
    let _ = link.opened().unwrap();

    run_rounds(&mut link, start, 8);

    link.shutdown();
    assert!(link.lost(start + Duration::from_secs(600)).is_empty());
    assert_eq!(link.state(), LinkState::Closed);
}

#[test]
fn logout_during_the_wait_cancels_the_retry() {
    let start = Instant::now();
    let mut link = Link::new(LinkConfig::default());
    link.dial_started().unwrap();
    let _ = link.opened().unwrap();

    let _ = link.lost(start);
    assert!(link.retry_at().is_some());

    // Logout lands while the driver is sleeping out the delay.
    link.shutdown();
    assert!(link.tick(start + RECONNECT_DELAY).is_empty());
    assert!(link.tick(start + Duration::from_secs(3600)).is_empty());
}

proptest! {
    /// However ticks and losses interleave, a shut-down link never dials.
    #[test]
    fn prop_no_dial_after_shutdown(
        pre_rounds in 0u64..4,
        probe_offsets in prop::collection::vec(0u64..600, 1..10)
    ) {
        let start = Instant::now();
        let mut link = Link::new(LinkConfig::default());
        link.dial_started().unwrap();
        let _ = link.opened().unwrap();

        run_rounds(&mut link, start, pre_rounds);
        link.shutdown();

        for offset in probe_offsets {
            let at = start + Duration::from_secs(offset);
            prop_assert!(link.lost(at).is_empty());
            prop_assert!(link.tick(at).is_empty());
        }
        prop_assert!(link.dial_started().is_err());
    }

    /// Every loss yields exactly one dial, no matter when the driver ticks.
    #[test]
    fn prop_one_dial_per_loss(tick_offsets in prop::collection::vec(0u64..10, 1..20)) {
        let start = Instant::now();
        let mut link = Link::new(LinkConfig::default());
        link.dial_started().unwrap();
        let _ = link.opened().unwrap();

        let _ = link.lost(start);

        let mut dials = 0usize;
        for offset in tick_offsets {
            let actions = link.tick(start + Duration::from_secs(offset));
            dials += actions.iter().filter(|a| **a == LinkAction::Dial).count();
        }

        prop_assert!(dials <= 1, "a single loss produced {} dials", dials);
    }
}
