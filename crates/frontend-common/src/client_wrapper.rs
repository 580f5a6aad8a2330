//! Wrapped client that handles auth errors automatically

use crate::auth::AuthContext;
use logistics_http::client::decode_body;
use logistics_http::{ApiClient, Call, ClientError, Outcome};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

/// Client for one service origin whose authenticated calls carry the
/// session's bearer token and survive a single token expiry.
#[derive(Clone)]
pub struct WrappedAuthClient {
    inner: ApiClient,
    session: Arc<AuthContext>,
}

impl WrappedAuthClient {
    pub fn new(inner: ApiClient, session: Arc<AuthContext>) -> Self {
        Self { inner, session }
    }

    pub fn session(&self) -> &Arc<AuthContext> {
        &self.session
    }

    /// Get a reference to the inner client (use sparingly - prefer wrapped methods)
    pub fn inner(&self) -> &ApiClient {
        &self.inner
    }

    /// Send `call`, refreshing and retrying once if the access token was
    /// rejected. Returns the raw body of the successful response.
    pub async fn send(&self, call: &Call) -> Result<Option<String>, ClientError> {
        let bearer = self.bearer_for(call);

        let rejected = match self.inner.dispatch(call, bearer.as_deref()).await {
            Outcome::Success(body) => return Ok(body),
            Outcome::Failure(error) => return Err(error),
            Outcome::AuthExpired(error) => error,
        };

        debug!(path = call.path(), status = rejected.status, "Access token rejected, refreshing");
        self.session.refresh_tokens(bearer.as_deref()).await?;

        debug!(path = call.path(), "Retrying after refresh");
        let bearer = self.bearer_for(call);
        match self.inner.dispatch(call, bearer.as_deref()).await {
            Outcome::Success(body) => Ok(body),
            Outcome::AuthExpired(error) => Err(ClientError::Api(error)),
            Outcome::Failure(error) => Err(error),
        }
    }

    /// Execute a request and decode its optional body
    pub async fn execute<T: DeserializeOwned>(&self, call: Call) -> Result<Option<T>, ClientError> {
        decode_body(self.send(&call).await?)
    }

    /// Execute a request whose response body is mandatory
    pub async fn execute_required<T: DeserializeOwned>(&self, call: Call) -> Result<T, ClientError> {
        self.execute(call.clone())
            .await?
            .ok_or_else(|| ClientError::EmptyResponse {
                path: call.path().to_string(),
            })
    }

    /// Execute a request whose response body, if any, is ignored
    pub async fn execute_empty(&self, call: Call) -> Result<(), ClientError> {
        self.send(&call).await.map(|_| ())
    }

    fn bearer_for(&self, call: &Call) -> Option<String> {
        if call.with_auth() {
            self.session.access_token()
        } else {
            None
        }
    }
}
