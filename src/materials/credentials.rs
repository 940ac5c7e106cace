//! Remembered user API token.

use crate::error::Result;
use crate::materials::store::KeyValueStore;
use std::sync::Arc;

/// Store key holding the user-supplied API token.
pub const API_KEY_KEY: &str = "replicate_api_key";

/// Persists the API token a user typed in, so it can be sent as the
/// request-scoped credential on later calls.
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
}

impl CredentialStore {
    /// Creates a credential store over the given backend.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Returns the remembered token, if any. Read failures count as absent.
    pub fn load(&self) -> Option<String> {
        match self.store.get(API_KEY_KEY) {
            Ok(value) => value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("failed to read stored API key: {e}");
                None
            }
        }
    }

    /// Remembers a token. A blank token clears the stored one.
    pub fn save(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return self.clear();
        }
        self.store.set(API_KEY_KEY, token)
    }

    /// Forgets the stored token.
    pub fn clear(&self) -> Result<()> {
        self.store.remove(API_KEY_KEY)
    }
}
