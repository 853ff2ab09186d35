//! Environment abstraction for deterministic testing.
//!
//! The `Environment` trait decouples connection machinery from system time.
//! Production drivers use real clocks and `tokio::time::sleep`; tests use a
//! virtual clock so reconnect schedules can be exercised without waiting.
//!
//! # Invariants
//!
//! - Monotonicity: `now()` must never go backwards
//! - Isolation: implementations must not share global state

use std::time::{Duration, Instant};

/// Abstract environment providing time and async sleeping.
///
/// State machines in this workspace never call `now()` themselves; drivers
/// sample the environment and pass instants into state machine methods. That
/// keeps the machines deterministic and directly testable.
pub trait Environment: Clone + Send + Sync + 'static {
    /// Returns the current time.
    ///
    /// # Invariants
    ///
    /// Values must never decrease within a single execution context.
    fn now(&self) -> Instant;

    /// Sleeps for the specified duration.
    ///
    /// The only async method in the trait; used exclusively by driver code
    /// to wait out reconnect delays, never by state machine logic.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}
