//! Session synchronization engine for the haven client.
//!
//! The session is a pure state machine that reconciles relay-pushed events
//! (presence, history, new messages) into a consistent local state and
//! composes outbound sends with immediate optimistic feedback.
//!
//! # Architecture
//!
//! The session:
//! - receives events from the driver (decoded frames, selection changes,
//!   send intents, link transitions)
//! - mutates the [`StateStore`], the single source of truth for the
//!   presentation layer
//! - produces [`SessionAction`]s for the driver to execute (transmit frames,
//!   re-render, play the notification sound)
//!
//! One event is processed to completion before the next; the driver
//! serializes all calls, so per-peer append order is exactly frame receipt
//! order.
//!
//! # Components
//!
//! - [`Session`]: top-level state machine
//! - [`StateStore`]: peer directory, conversation logs, unread counters,
//!   selection
//! - [`SessionEvent`] / [`SessionAction`]: the event and action vocabulary

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod event;
mod session;
mod store;

pub use event::{RenderScope, SessionAction, SessionEvent};
pub use session::{Credentials, Session};
pub use store::{Delivery, Entry, Peer, StateStore};
