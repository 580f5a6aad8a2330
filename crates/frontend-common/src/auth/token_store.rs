//! Token persistence
//!
//! Both tokens are written and removed in one storage operation, and a
//! pair is only ever read back whole: if the medium holds one key without
//! the other, the store reports no tokens at all.

use crate::config::AuthConfig;
use crate::storage::{KeyValueStore, MemoryStore};
use logistics_http::TokenPair;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct TokenStore {
    backend: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Current pair, if both halves are present
    pub fn pair(&self) -> Option<TokenPair> {
        let access = self.backend.get(AuthConfig::ACCESS_TOKEN_KEY);
        let refresh = self.backend.get(AuthConfig::REFRESH_TOKEN_KEY);

        match (access, refresh) {
            (Some(access_token), Some(refresh_token)) => Some(TokenPair {
                access_token,
                refresh_token,
            }),
            (None, None) => None,
            _ => {
                warn!("Stored session holds only one token; treating it as signed out");
                None
            }
        }
    }

    pub fn access(&self) -> Option<String> {
        self.pair().map(|pair| pair.access_token)
    }

    pub fn refresh(&self) -> Option<String> {
        self.pair().map(|pair| pair.refresh_token)
    }

    /// Replace both tokens
    pub fn set(&self, access_token: &str, refresh_token: &str) {
        let entries = [
            (AuthConfig::ACCESS_TOKEN_KEY, access_token),
            (AuthConfig::REFRESH_TOKEN_KEY, refresh_token),
        ];
        if let Err(err) = self.backend.set_many(&entries) {
            warn!("Failed to persist tokens: {err}");
        }
    }

    /// Remove both tokens
    pub fn clear(&self) {
        let keys = [AuthConfig::ACCESS_TOKEN_KEY, AuthConfig::REFRESH_TOKEN_KEY];
        if let Err(err) = self.backend.remove_many(&keys) {
            warn!("Failed to clear tokens: {err}");
        }
    }
}
