//! Core runtime-independent pieces of the haven client.
//!
//! This crate carries no async runtime dependency. The [`Link`] state
//! machine is pure (time is passed as a parameter, actions are returned for
//! the driver to execute), and the [`Environment`] trait is the only seam
//! through which real time enters the system.
//!
//! # Components
//!
//! - [`Environment`]: time and sleeping, swappable for deterministic tests
//! - [`Link`]: connection lifecycle with fixed-delay reconnect scheduling

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
mod error;
mod link;

pub use env::Environment;
pub use error::LinkError;
pub use link::{Link, LinkAction, LinkConfig, LinkState, RECONNECT_DELAY};
