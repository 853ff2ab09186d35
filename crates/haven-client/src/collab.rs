//! External collaborator interfaces consumed by the runtime.
//!
//! Credential verification, blob storage, durable session persistence, and
//! the presentation layer are host capabilities. The engine only depends on
//! their request/response shapes; hosts supply the implementations (a
//! storage bucket, a browser-equivalent local store, a real UI).

use async_trait::async_trait;
use haven_session::{Credentials, RenderScope, StateStore};
use thiserror::Error;
use tokio::sync::Mutex;

/// Credential verification failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The username/password pair did not match an account.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The verifier backend could not be reached.
    #[error("verifier unavailable: {0}")]
    Unavailable(String),
}

/// Blob storage failures.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The upload did not complete.
    #[error("blob upload failed: {0}")]
    Upload(String),
}

/// Persisted session store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The durable slot could not be read or written.
    #[error("session store unavailable: {0}")]
    Unavailable(String),
}

/// Verifies a username/password pair against the account store.
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Verify credentials, returning the session identity on success.
    async fn verify(&self, username: &str, password: &str) -> Result<Credentials, AuthError>;
}

/// Stores binary payloads and returns publicly resolvable references.
///
/// Uploads happen before a media send is composed; the session only ever
/// sees the resulting URL.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` at `path`, returning a public URL.
    async fn upload(&self, path: &str, bytes: Vec<u8>) -> Result<String, BlobError>;
}

/// Durable single-slot credential store surviving process restarts.
///
/// Lets a restarted client skip re-verification. Cleared on logout.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist the credentials.
    async fn set(&self, credentials: &Credentials) -> Result<(), StoreError>;

    /// Read the persisted credentials, if any.
    async fn get(&self) -> Result<Option<Credentials>, StoreError>;

    /// Clear the slot.
    async fn clear(&self) -> Result<(), StoreError>;
}

/// Renders state snapshots and plays the inbound-message notification.
///
/// Called from the driver's event loop after each state transition; the
/// store reference is the complete, consistent state at that point.
pub trait Presenter: Send {
    /// Refresh the given surface from the store.
    fn render(&mut self, scope: &RenderScope, store: &StateStore);

    /// An inbound message arrived; make it audible.
    fn play_notification(&mut self);
}

/// In-memory [`SessionStore`] for tests and single-run processes.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    slot: Mutex<Option<Credentials>>,
}

impl MemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn set(&self, credentials: &Credentials) -> Result<(), StoreError> {
        *self.slot.lock().await = Some(credentials.clone());
        Ok(())
    }

    async fn get(&self) -> Result<Option<Credentials>, StoreError> {
        Ok(self.slot.lock().await.clone())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().await = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use haven_proto::{AuthToken, UserId};

    use super::*;

    fn credentials() -> Credentials {
        Credentials {
            user_id: UserId::new("u1"),
            username: "alice".to_owned(),
            token: AuthToken::new("tok"),
        }
    }

    #[tokio::test]
    async fn memory_store_set_get_clear() {
        let store = MemorySessionStore::new();
        assert_eq!(store.get().await.unwrap(), None);

        store.set(&credentials()).await.unwrap();
        assert_eq!(store.get().await.unwrap(), Some(credentials()));

        store.clear().await.unwrap();
        assert_eq!(store.get().await.unwrap(), None);
    }
}
