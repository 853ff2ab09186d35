//! Frame codec errors.

use thiserror::Error;

/// Errors from frame encoding and decoding.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Inbound text was not a recognized frame.
    ///
    /// Covers both malformed JSON and unknown `type` tags. Receivers treat
    /// this as a discardable frame, not a connection fault.
    #[error("malformed frame: {0}")]
    Decode(#[source] serde_json::Error),

    /// An outbound frame could not be serialized.
    #[error("frame encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
}
