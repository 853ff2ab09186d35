//! Link state machine errors.

use thiserror::Error;

use crate::link::LinkState;

/// Errors from invalid link transitions.
///
/// These indicate driver bugs, not network conditions. Network loss is an
/// input to the machine ([`crate::Link::lost`]), never an error.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Operation attempted from a state that does not allow it.
    #[error("invalid transition: {operation} in state {state:?}")]
    InvalidTransition {
        /// State the link was in.
        state: LinkState,
        /// The attempted operation.
        operation: &'static str,
    },

    /// The link was shut down by logout; no further dials are valid.
    #[error("link is shut down")]
    ShutDown,
}
