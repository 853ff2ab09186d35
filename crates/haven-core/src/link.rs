//! Connection lifecycle state machine.
//!
//! Owns the relay connection's `idle → connecting → open → closed` lifecycle
//! and the reconnect schedule. Pure state machine: methods accept the
//! current time and return [`LinkAction`]s for the driver to execute; no I/O
//! happens here.
//!
//! # State machine
//!
//! ```text
//! ┌──────┐ dial_started ┌────────────┐   opened    ┌──────┐
//! │ Idle │─────────────>│ Connecting │────────────>│ Open │
//! └──────┘              └────────────┘             └──────┘
//!                          ▲      │ lost              │ lost
//!                          │      ▼                   ▼
//!              dial_started│  ┌──────────────────────────┐
//!              (after tick)└──│          Closed          │
//!                             └──────────────────────────┘
//! ```
//!
//! A loss while the session is still logged in schedules exactly one retry
//! at `now + reconnect_delay`; `tick` converts a due retry into a
//! [`LinkAction::Dial`]. There is no backoff, no jitter, and no retry cap —
//! the schedule repeats after every loss until [`Link::shutdown`] cancels it
//! permanently.

use std::time::{Duration, Instant};

use crate::error::LinkError;

/// Fixed delay between a connection loss and the next dial attempt.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// Actions returned by the link state machine.
///
/// The driver executes these: open a transport connection, transmit the
/// authentication frame, or arrange to call [`Link::tick`] at an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkAction {
    /// Open a transport connection to the configured relay endpoint.
    Dial,

    /// The connection just opened; transmit the authentication frame now.
    Authenticate,

    /// A reconnect attempt is scheduled; wake the machine at this instant.
    ScheduleRetry {
        /// When the retry becomes due.
        at: Instant,
    },
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No connection attempt has been made yet.
    Idle,
    /// A dial is in flight.
    Connecting,
    /// The connection is established; frames may be transmitted.
    Open,
    /// The connection is down (network loss, server close, or shutdown).
    Closed,
}

/// Link configuration.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Delay between a loss and the next dial. No backoff is applied.
    pub reconnect_delay: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self { reconnect_delay: RECONNECT_DELAY }
    }
}

/// Connection lifecycle state machine.
///
/// The pending retry is an explicit, cancellable field rather than a
/// fire-and-forget timer, so shutdown can never leak a reconnect loop.
#[derive(Debug, Clone)]
pub struct Link {
    /// Current state.
    state: LinkState,
    /// Configuration.
    config: LinkConfig,
    /// Scheduled reconnect instant, if a retry is pending.
    retry_at: Option<Instant>,
    /// Set by [`Link::shutdown`]; suppresses all future dials.
    shut_down: bool,
}

impl Link {
    /// Create a new link in `Idle` state.
    pub fn new(config: LinkConfig) -> Self {
        Self { state: LinkState::Idle, config, retry_at: None, shut_down: false }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Whether frames may be transmitted right now.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == LinkState::Open
    }

    /// Whether [`Link::shutdown`] has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// The scheduled reconnect instant, if a retry is pending.
    #[must_use]
    pub fn retry_at(&self) -> Option<Instant> {
        self.retry_at
    }

    /// A dial attempt has started.
    ///
    /// # Errors
    ///
    /// Returns `ShutDown` after logout, or `InvalidTransition` if a dial is
    /// already in flight or the connection is open.
    pub fn dial_started(&mut self) -> Result<(), LinkError> {
        if self.shut_down {
            return Err(LinkError::ShutDown);
        }

        match self.state {
            LinkState::Idle | LinkState::Closed => {
                self.state = LinkState::Connecting;
                self.retry_at = None;
                Ok(())
            },
            state => Err(LinkError::InvalidTransition { state, operation: "dial_started" }),
        }
    }

    /// The transport connection is established.
    ///
    /// Returns `[Authenticate]`: the handshake frame must be the first thing
    /// transmitted on the new connection.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` if no dial was in flight.
    pub fn opened(&mut self) -> Result<Vec<LinkAction>, LinkError> {
        if self.shut_down {
            return Err(LinkError::ShutDown);
        }

        match self.state {
            LinkState::Connecting => {
                self.state = LinkState::Open;
                Ok(vec![LinkAction::Authenticate])
            },
            state => Err(LinkError::InvalidTransition { state, operation: "opened" }),
        }
    }

    /// The connection was lost or a dial failed.
    ///
    /// Safe to call from any state; loss is an input, not an error, and is
    /// never fatal. Unless the link is shut down, exactly one retry is
    /// scheduled at `now + reconnect_delay`; a second loss report while a
    /// retry is already pending is a no-op.
    pub fn lost(&mut self, now: Instant) -> Vec<LinkAction> {
        if self.shut_down {
            self.state = LinkState::Closed;
            return Vec::new();
        }

        if self.state == LinkState::Closed && self.retry_at.is_some() {
            return Vec::new();
        }

        self.state = LinkState::Closed;
        let at = now + self.config.reconnect_delay;
        self.retry_at = Some(at);
        vec![LinkAction::ScheduleRetry { at }]
    }

    /// Drive the reconnect timer.
    ///
    /// Returns `[Dial]` exactly once when the scheduled retry is due, and
    /// nothing on every other call.
    pub fn tick(&mut self, now: Instant) -> Vec<LinkAction> {
        if self.shut_down {
            return Vec::new();
        }

        match self.retry_at {
            Some(at) if now >= at => {
                self.retry_at = None;
                vec![LinkAction::Dial]
            },
            _ => Vec::new(),
        }
    }

    /// Permanently stop the link.
    ///
    /// Cancels any pending retry and suppresses all future dials. Terminal;
    /// used on logout.
    pub fn shutdown(&mut self) {
        self.shut_down = true;
        self.retry_at = None;
        self.state = LinkState::Closed;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn open_link() -> Link {
        let mut link = Link::new(LinkConfig::default());
        link.dial_started().unwrap();
        let _ = link.opened().unwrap();
        link
    }

    #[test]
    fn lifecycle_idle_to_open() {
        let mut link = Link::new(LinkConfig::default());
        assert_eq!(link.state(), LinkState::Idle);
        assert!(!link.is_open());

        link.dial_started().unwrap();
        assert_eq!(link.state(), LinkState::Connecting);

        let actions = link.opened().unwrap();
        assert_eq!(link.state(), LinkState::Open);
        assert!(link.is_open());
        assert_eq!(actions, vec![LinkAction::Authenticate]);
    }

    #[test]
    fn loss_schedules_exactly_one_retry() {
        let t0 = Instant::now();
        let mut link = open_link();

        let actions = link.lost(t0);
        assert_eq!(link.state(), LinkState::Closed);
        assert_eq!(actions, vec![LinkAction::ScheduleRetry { at: t0 + RECONNECT_DELAY }]);

        // A duplicate loss report while the retry is pending changes nothing.
        assert!(link.lost(t0 + Duration::from_millis(100)).is_empty());
        assert_eq!(link.retry_at(), Some(t0 + RECONNECT_DELAY));
    }

    #[test]
    fn tick_fires_once_when_due() {
        let t0 = Instant::now();
        let mut link = open_link();
        let _ = link.lost(t0);

        // Not due yet.
        assert!(link.tick(t0 + Duration::from_secs(1)).is_empty());

        // Due: exactly one Dial.
        let due = t0 + RECONNECT_DELAY;
        assert_eq!(link.tick(due), vec![LinkAction::Dial]);

        // The retry is consumed; further ticks are quiet.
        assert!(link.tick(due + Duration::from_secs(10)).is_empty());
        assert_eq!(link.retry_at(), None);
    }

    #[test]
    fn retry_repeats_after_every_loss() {
        let t0 = Instant::now();
        let mut link = open_link();

        for round in 0..5u64 {
            let loss_at = t0 + Duration::from_secs(round * 60);
            let actions = link.lost(loss_at);
            assert_eq!(actions.len(), 1, "loss {round} must schedule a retry");

            let due = loss_at + RECONNECT_DELAY;
            assert_eq!(link.tick(due), vec![LinkAction::Dial]);

            link.dial_started().unwrap();
            let _ = link.opened().unwrap();
        }
    }

    #[test]
    fn shutdown_cancels_pending_retry() {
        let t0 = Instant::now();
        let mut link = open_link();
        let _ = link.lost(t0);
        assert!(link.retry_at().is_some());

        link.shutdown();
        assert_eq!(link.retry_at(), None);
        assert_eq!(link.state(), LinkState::Closed);

        // Even far past the scheduled instant, nothing fires.
        assert!(link.tick(t0 + Duration::from_secs(3600)).is_empty());
    }

    #[test]
    fn shutdown_suppresses_future_scheduling() {
        let t0 = Instant::now();
        let mut link = open_link();
        link.shutdown();

        assert!(link.lost(t0).is_empty());
        assert!(link.tick(t0 + RECONNECT_DELAY).is_empty());
        assert!(matches!(link.dial_started(), Err(LinkError::ShutDown)));
    }

    #[test]
    fn loss_while_connecting_reschedules() {
        let t0 = Instant::now();
        let mut link = Link::new(LinkConfig::default());
        link.dial_started().unwrap();

        // Dial failed before the connection opened.
        let actions = link.lost(t0);
        assert_eq!(actions, vec![LinkAction::ScheduleRetry { at: t0 + RECONNECT_DELAY }]);
    }

    #[test]
    fn invalid_transitions_are_rejected() {
        let mut link = Link::new(LinkConfig::default());

        // Can't open without a dial in flight.
        assert!(matches!(link.opened(), Err(LinkError::InvalidTransition { .. })));

        // Can't start a second dial while one is in flight.
        link.dial_started().unwrap();
        assert!(matches!(link.dial_started(), Err(LinkError::InvalidTransition { .. })));

        // Can't start a dial while open.
        let _ = link.opened().unwrap();
        assert!(matches!(link.dial_started(), Err(LinkError::InvalidTransition { .. })));
    }

    #[test]
    fn custom_reconnect_delay_is_honored() {
        let t0 = Instant::now();
        let delay = Duration::from_millis(500);
        let mut link = Link::new(LinkConfig { reconnect_delay: delay });
        link.dial_started().unwrap();
        let _ = link.opened().unwrap();

        let actions = link.lost(t0);
        assert_eq!(actions, vec![LinkAction::ScheduleRetry { at: t0 + delay }]);
    }
}
