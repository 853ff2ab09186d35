//! Wire protocol for the haven relay.
//!
//! The relay speaks JSON text frames over a single persistent connection.
//! Every frame is one JSON object whose `type` field selects the variant,
//! so the enums here are internally tagged and exhaustively matched by the
//! session engine.
//!
//! # Frame direction
//!
//! - [`ClientFrame`]: client → relay (authentication, history requests,
//!   outbound messages)
//! - [`ServerFrame`]: relay → client (presence, history replay, inbound
//!   messages, protocol errors)
//!
//! A frame that fails to decode is reported as [`FrameError`]; callers
//! discard such frames without affecting connection state.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
mod frames;
mod types;

pub use error::FrameError;
pub use frames::{ClientFrame, ServerFrame, UserEntry};
pub use types::{AuthToken, MessageKind, UserId, WireMessage};
