//! Replayable request descriptions and dispatch outcomes

use super::error::{ApiError, ClientError};
use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// One request against a service, owned so it can be sent again after a
/// token refresh.
#[derive(Debug, Clone)]
pub struct Call {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Value>,
    with_auth: bool,
}

impl Call {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            with_auth: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ClientError> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Append a query parameter
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Mark the call as requiring a bearer credential
    pub fn authenticated(mut self) -> Self {
        self.with_auth = true;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn body(&self) -> Option<&Value> {
        self.body.as_ref()
    }

    pub fn with_auth(&self) -> bool {
        self.with_auth
    }
}

/// Result of sending a [`Call`] exactly once.
#[derive(Debug)]
pub enum Outcome {
    /// 2xx; `None` when the body was empty.
    Success(Option<String>),
    /// 401 on a call that asked for authentication.
    AuthExpired(ApiError),
    /// Anything else.
    Failure(ClientError),
}

impl Outcome {
    /// Collapse into a typed result without any recovery.
    pub fn into_result<T: DeserializeOwned>(self) -> Result<Option<T>, ClientError> {
        match self {
            Self::Success(body) => decode_body(body),
            Self::AuthExpired(error) => Err(ClientError::Api(error)),
            Self::Failure(error) => Err(error),
        }
    }
}

/// Decode an optional response body. An absent body is `Ok(None)`, never a
/// parse error.
pub fn decode_body<T: DeserializeOwned>(body: Option<String>) -> Result<Option<T>, ClientError> {
    match body {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

/// Percent-encode `raw` for use as one path segment
pub fn path_segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}
