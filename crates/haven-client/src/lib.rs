//! Production haven client runtime.
//!
//! This crate wires the pure state machines to real I/O:
//! - Tokio for the async runtime
//! - `tokio-tungstenite` for the websocket connection to the relay
//! - System time for the reconnect schedule
//!
//! ## Architecture
//!
//! ```text
//! haven-client
//!   ├─ SystemEnv          (production Environment impl)
//!   ├─ Driver             (event loop: socket frames + user commands)
//!   ├─ ClientHandle       (command channel into the driver)
//!   └─ collaborators      (verifier, blob store, session store, presenter)
//! ```
//!
//! The driver owns one websocket at a time. Inbound frames are decoded and
//! fed to the session in arrival order; the resulting actions (transmits,
//! renders, notification sounds) are executed before the next frame is
//! read. On connection loss the driver sleeps out the fixed reconnect delay
//! and redials, forever, until logout shuts the link down.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod collab;
mod driver;
mod error;
mod system_env;

use std::time::Duration;

pub use collab::{
    AuthError, BlobError, BlobStore, CredentialVerifier, MemorySessionStore, Presenter,
    SessionStore, StoreError,
};
pub use driver::{ClientHandle, Command, Driver, command_channel};
pub use error::ClientError;
use haven_core::RECONNECT_DELAY;
use haven_session::Credentials;
pub use system_env::SystemEnv;

/// Default capacity of the user-command channel.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Runtime configuration for the client driver.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// WebSocket URL of the relay (e.g. `ws://127.0.0.1:8000/ws`).
    pub relay_url: String,
    /// Delay between a connection loss and the next dial. No backoff.
    pub reconnect_delay: Duration,
    /// Capacity of the user-command channel.
    pub channel_capacity: usize,
}

impl RuntimeConfig {
    /// Configuration with default delays for the given relay endpoint.
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            reconnect_delay: RECONNECT_DELAY,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Resolve credentials for a user, consulting the persisted session first.
///
/// A stored session for the same username skips re-verification (the relay
/// validates the token again at handshake time anyway). A stored session
/// for a different username is cleared before verifying.
pub async fn login<V, S>(
    verifier: &V,
    store: &S,
    username: &str,
    password: &str,
) -> Result<Credentials, ClientError>
where
    V: CredentialVerifier,
    S: SessionStore,
{
    if let Some(credentials) = store.get().await? {
        if credentials.username == username {
            tracing::debug!("reusing persisted session");
            return Ok(credentials);
        }
        store.clear().await?;
    }

    let credentials = verifier.verify(username, password).await?;
    store.set(&credentials).await?;
    Ok(credentials)
}
