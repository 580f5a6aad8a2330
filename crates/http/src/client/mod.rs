//! Logistics API client

pub mod auth;
pub mod call;
pub mod error;
pub mod sms;

pub use call::{Call, Outcome, decode_body, path_segment};

use error::{ApiError, ClientError};
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

const DEFAULT_USER_AGENT: &str = concat!("logistics-client/", env!("CARGO_PKG_VERSION"));

/// Client bound to a single service origin
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new client with default configuration
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::builder().base_url(base_url).build()
    }

    /// Create a new client builder
    pub fn builder() -> ApiClientBuilder {
        ApiClientBuilder::default()
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Create a request builder for a path on this origin
    pub fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        self.client.request(method, url)
    }

    /// Send a call once. Never retries; the caller decides what to do with
    /// an [`Outcome::AuthExpired`].
    pub async fn dispatch(&self, call: &Call, bearer: Option<&str>) -> Outcome {
        let mut request = self.request(call.method().clone(), call.path());
        if !call.query_pairs().is_empty() {
            request = request.query(call.query_pairs());
        }
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        if let Some(body) = call.body() {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                warn!(method = %call.method(), path = call.path(), "Transport failure: {err}");
                return Outcome::Failure(ClientError::Request(err));
            }
        };

        let status = response.status();
        let text = match response.text().await {
            Ok(text) => text,
            Err(err) => return Outcome::Failure(ClientError::Request(err)),
        };
        let body = if text.trim().is_empty() { None } else { Some(text) };

        debug!(method = %call.method(), path = call.path(), status = status.as_u16(), "Response received");

        if status.is_success() {
            return Outcome::Success(body);
        }

        let error = ApiError::from_response(status.as_u16(), body.as_deref());
        if status == StatusCode::UNAUTHORIZED && call.with_auth() {
            Outcome::AuthExpired(error)
        } else {
            Outcome::Failure(ClientError::Api(error))
        }
    }

    /// Execute a call without any token handling
    pub async fn execute<T: DeserializeOwned>(&self, call: Call) -> Result<Option<T>, ClientError> {
        self.dispatch(&call, None).await.into_result()
    }

    /// Execute a call whose response body, if any, is ignored
    pub async fn execute_empty(&self, call: Call) -> Result<(), ClientError> {
        match self.dispatch(&call, None).await {
            Outcome::Success(_) => Ok(()),
            Outcome::AuthExpired(error) => Err(ClientError::Api(error)),
            Outcome::Failure(error) => Err(error),
        }
    }

    /// Execute a call whose response body is mandatory
    pub async fn execute_required<T: DeserializeOwned>(&self, call: Call) -> Result<T, ClientError> {
        let path = call.path().to_string();
        self.execute(call)
            .await?
            .ok_or(ClientError::EmptyResponse { path })
    }
}

/// Builder for ApiClient
#[derive(Default)]
pub struct ApiClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
    user_agent: Option<String>,
}

impl ApiClientBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client
    pub fn build(self) -> Result<ApiClient, ClientError> {
        let base_url = self
            .base_url
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ClientError::Configuration("base_url is required".into()))?;

        // Ensure base_url ends without a trailing slash
        let base_url = base_url.trim().trim_end_matches('/').to_string();

        let mut client_builder = ClientBuilder::new();

        if let Some(timeout) = self.timeout {
            client_builder = client_builder.timeout(timeout);
        }

        client_builder = client_builder
            .user_agent(self.user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()));

        let client = client_builder.build()?;

        Ok(ApiClient { client, base_url })
    }
}
