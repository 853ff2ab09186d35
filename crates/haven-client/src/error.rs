//! Client runtime errors.

use haven_core::LinkError;
use thiserror::Error;

use crate::collab::{AuthError, BlobError, StoreError};

/// Errors surfaced by the client runtime.
///
/// Transport loss is deliberately absent: connection failures feed the
/// reconnect schedule and are never returned to callers.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The link state machine rejected a transition; a driver bug.
    #[error("link state error: {0}")]
    Link(#[from] LinkError),

    /// The driver task has stopped; commands can no longer be delivered.
    #[error("driver is not running")]
    DriverStopped,

    /// Credential verification failed.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Blob upload failed.
    #[error(transparent)]
    Blob(#[from] BlobError),

    /// The persisted session store failed.
    #[error(transparent)]
    SessionStore(#[from] StoreError),
}
