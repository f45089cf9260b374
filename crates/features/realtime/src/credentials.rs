use crate::error::RealtimeError;
use bazaar_storage::Storage;
use parking_lot::RwLock;
use std::future::Future;
use std::sync::Arc;

/// Storage key holding the auth token.
pub const TOKEN_KEY: &str = "token";

/// Source of the auth token used for reconnect attempts.
///
/// The token is looked up again on every reconnect so a refreshed token is picked up.
pub trait CredentialStore: Send + Sync + 'static {
    fn load_token(&self) -> impl Future<Output = Result<Option<String>, RealtimeError>> + Send;
}

/// In-process token holder; cheap to clone, clones share the token.
#[derive(Debug, Clone, Default)]
pub struct MemoryCredentials {
    token: Arc<RwLock<Option<String>>>,
}

impl MemoryCredentials {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self { token: Arc::new(RwLock::new(token)) }
    }

    pub fn set(&self, token: Option<String>) {
        *self.token.write() = token;
    }
}

impl CredentialStore for MemoryCredentials {
    async fn load_token(&self) -> Result<Option<String>, RealtimeError> {
        Ok(self.token.read().clone())
    }
}

/// Token persisted in [`Storage`] under [`TOKEN_KEY`].
#[derive(Debug, Clone)]
pub struct StoredCredentials {
    storage: Storage,
}

impl StoredCredentials {
    #[must_use]
    pub const fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Persists `token` for later reconnects.
    ///
    /// # Errors
    /// Returns [`RealtimeError::Credentials`] if the store rejects the write.
    pub async fn save(&self, token: &str) -> Result<(), RealtimeError> {
        self.storage.set(TOKEN_KEY, token).await.map_err(credentials_error)
    }

    /// Forgets the stored token. Returns `false` if none was stored.
    ///
    /// # Errors
    /// Returns [`RealtimeError::Credentials`] if the store cannot be modified.
    pub async fn clear(&self) -> Result<bool, RealtimeError> {
        self.storage.remove(TOKEN_KEY).await.map_err(credentials_error)
    }
}

impl CredentialStore for StoredCredentials {
    async fn load_token(&self) -> Result<Option<String>, RealtimeError> {
        let token = self.storage.get_string(TOKEN_KEY).await.map_err(credentials_error)?;
        Ok(token.filter(|t| !t.trim().is_empty()))
    }
}

fn credentials_error(err: bazaar_storage::StorageError) -> RealtimeError {
    RealtimeError::Credentials { message: err.to_string().into(), context: Some(TOKEN_KEY.into()) }
}
