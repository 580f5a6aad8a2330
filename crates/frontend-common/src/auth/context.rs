//! Application-wide authentication state
//!
//! One `AuthContext` exists per running application and is handed to every
//! service that needs it. The authenticated flag is derived from the token
//! store on every write and published on a watch channel so guards can
//! react to sign-in, sign-out and refresh.

use super::token_store::TokenStore;
use logistics_http::{ApiClient, ClientError};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

pub struct AuthContext {
    tokens: TokenStore,
    auth_client: ApiClient,
    authenticated: watch::Sender<bool>,
    refresh_lock: Mutex<()>,
}

impl AuthContext {
    /// `auth_client` must point at the service issuing tokens.
    pub fn new(tokens: TokenStore, auth_client: ApiClient) -> Self {
        let (authenticated, _) = watch::channel(tokens.access().is_some());
        Self {
            tokens,
            auth_client,
            authenticated,
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        *self.authenticated.borrow()
    }

    pub fn access_token(&self) -> Option<String> {
        self.tokens.access()
    }

    /// Receives the authenticated flag whenever it is recomputed
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.authenticated.subscribe()
    }

    /// Store a freshly issued pair
    pub fn set_tokens(&self, access_token: &str, refresh_token: &str) {
        self.tokens.set(access_token, refresh_token);
        self.publish();
        info!("Session established");
    }

    /// Forget the session without contacting the server
    pub fn clear_local(&self) {
        self.tokens.clear();
        self.publish();
        info!("Session cleared");
    }

    /// Invalidate the refresh token on the server, then clear local state.
    /// Local state is cleared on every exit path, including a failed or
    /// abandoned server call.
    pub async fn logout(&self) {
        let _clear = ClearOnDrop(self);

        if let Some(refresh_token) = self.tokens.refresh() {
            if let Err(err) = self.auth_client.logout(&refresh_token).await {
                warn!("Server logout failed, clearing local session anyway: {err}");
            }
        }
    }

    /// Mint a new pair after `stale_access` was rejected.
    ///
    /// Refreshes are serialized. A caller that gets the lock after another
    /// caller already replaced `stale_access` reuses that result instead of
    /// spending the refresh token again.
    pub async fn refresh_tokens(&self, stale_access: Option<&str>) -> Result<(), ClientError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.tokens.access();
        if current.is_some() && current.as_deref() != stale_access {
            debug!("Tokens already refreshed by a concurrent request");
            return Ok(());
        }

        let refresh_token = self.tokens.refresh().ok_or(ClientError::NoSession)?;
        debug!("Refreshing access token");
        let pair = self.auth_client.refresh(&refresh_token).await?;
        self.tokens.set(&pair.access_token, &pair.refresh_token);
        self.publish();
        Ok(())
    }

    fn publish(&self) {
        self.authenticated.send_replace(self.tokens.access().is_some());
    }
}

struct ClearOnDrop<'a>(&'a AuthContext);

impl Drop for ClearOnDrop<'_> {
    fn drop(&mut self) {
        self.0.clear_local();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> AuthContext {
        // Unroutable origin: these tests never reach the network.
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        AuthContext::new(TokenStore::in_memory(), client)
    }

    #[test]
    fn authenticated_flag_follows_tokens() {
        let auth = context();
        let mut updates = auth.subscribe();
        assert!(!auth.is_authenticated());

        auth.set_tokens("a1", "r1");
        assert!(auth.is_authenticated());
        assert_eq!(auth.access_token().as_deref(), Some("a1"));
        assert!(updates.has_changed().unwrap());
        assert!(*updates.borrow_and_update());

        auth.clear_local();
        assert!(!auth.is_authenticated());
        assert_eq!(auth.access_token(), None);
        assert!(!*updates.borrow_and_update());
    }

    #[test]
    fn initial_state_comes_from_the_store() {
        let tokens = TokenStore::in_memory();
        tokens.set("a1", "r1");
        let auth = AuthContext::new(tokens, ApiClient::new("http://127.0.0.1:9").unwrap());
        assert!(auth.is_authenticated());
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_is_no_session() {
        let auth = context();
        let result = auth.refresh_tokens(None).await;
        assert!(matches!(result, Err(ClientError::NoSession)));
    }

    #[tokio::test]
    async fn logout_without_tokens_skips_the_server() {
        let auth = context();
        auth.logout().await;
        assert!(!auth.is_authenticated());
    }
}
