//! Client error types

use crate::types::MAX_COOLDOWN_SECS;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Error codes the services have used for field-level validation failures.
/// `VALIDATION_FAILED` is the current contract, the others are still seen
/// from older deployments.
pub const VALIDATION_CODES: &[&str] = &["VALIDATION_FAILED", "VALIDATIONFAILED", "VALIDATION_ERROR"];

/// Error codes used for rate-limited verification requests.
pub const RATE_LIMIT_CODES: &[&str] = &["RATE_LIMIT_EXCEEDED", "RATELIMITEXCEEDED"];

/// Maximum number of raw body characters kept as an error message.
const MAX_ERROR_CHARS: usize = 200;

static SECONDS_HINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*сек").expect("valid seconds hint pattern"));
static ANY_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)").expect("valid number pattern"));

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or request error
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-2xx status
    #[error("{0}")]
    Api(ApiError),

    /// A refresh was needed but no refresh token is stored
    #[error("No active session")]
    NoSession,

    /// The caller required a response body and the server sent none
    #[error("Empty response from {path}")]
    EmptyResponse { path: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),
}

impl ClientError {
    /// True for a 401 answer from the server.
    pub fn is_auth_expired(&self) -> bool {
        self.status() == Some(401)
    }

    pub fn is_no_session(&self) -> bool {
        matches!(self, Self::NoSession)
    }

    /// The structured server error, if this is one.
    pub fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(error) => Some(error),
            _ => None,
        }
    }

    /// HTTP status of the failure, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api(error) => Some(error.status),
            Self::Request(error) => error.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(error: ApiError) -> Self {
        Self::Api(error)
    }
}

/// Error body shape shared by all services:
/// `{ "error": code, "message": text, "fields": { field: message } }`
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    fields: Option<BTreeMap<String, String>>,
}

/// A non-2xx response, normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiError {
    pub status: u16,
    pub code: Option<String>,
    pub message: String,
    pub fields: BTreeMap<String, String>,
    /// Parsed JSON body, when the server sent one.
    pub body: Option<Value>,
}

impl ApiError {
    /// Builds the error from a status code and the raw response text.
    pub fn from_response(status: u16, text: Option<&str>) -> Self {
        let text = text.map(str::trim).filter(|text| !text.is_empty());
        let body = text.and_then(|text| serde_json::from_str::<Value>(text).ok());
        let parsed = body
            .clone()
            .and_then(|value| serde_json::from_value::<ErrorBody>(value).ok())
            .unwrap_or_default();

        let message = parsed
            .message
            .clone()
            .filter(|message| !message.trim().is_empty())
            .or_else(|| parsed.error.clone())
            .or_else(|| {
                // Plain-text bodies are kept, JSON bodies without a message are not.
                if body.is_none() {
                    text.map(|text| text.chars().take(MAX_ERROR_CHARS).collect())
                } else {
                    None
                }
            })
            .unwrap_or_else(|| format!("HTTP {status}"));

        Self {
            status,
            code: parsed.error,
            message,
            fields: parsed.fields.unwrap_or_default(),
            body,
        }
    }

    /// Field-level validation failure with a non-empty field map.
    pub fn is_validation(&self) -> bool {
        !self.fields.is_empty() && self.code_in(VALIDATION_CODES)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429 || self.code_in(RATE_LIMIT_CODES)
    }

    /// Seconds until a retry is allowed, as stated in the message.
    pub fn retry_after_hint(&self) -> Option<u64> {
        parse_retry_after(&self.message)
    }

    fn code_in(&self, codes: &[&str]) -> bool {
        self.code
            .as_deref()
            .is_some_and(|code| codes.contains(&code))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "Request failed ({}): {}", self.status, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Extracts a retry-after duration from a human-readable message such as
/// "Повторите через 37 сек.". Falls back to the first number in the text.
/// Values are capped at [`MAX_COOLDOWN_SECS`].
pub fn parse_retry_after(message: &str) -> Option<u64> {
    let captures = SECONDS_HINT
        .captures(message)
        .or_else(|| ANY_NUMBER.captures(message))?;
    // Only digits are captured, so a parse failure is an overflow.
    let seconds = captures[1].parse::<u64>().unwrap_or(u64::MAX);
    (seconds > 0).then(|| seconds.min(MAX_COOLDOWN_SECS))
}

/// Cloneable summary of any client failure, used for flow state and UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    pub status: Option<u16>,
    pub code: Option<String>,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl ErrorInfo {
    pub fn has_fields(&self) -> bool {
        !self.fields.is_empty()
    }
}

impl From<&ClientError> for ErrorInfo {
    fn from(error: &ClientError) -> Self {
        match error {
            ClientError::Api(api) => Self {
                status: Some(api.status),
                code: api.code.clone(),
                message: api.message.clone(),
                fields: api.fields.clone(),
            },
            other => Self {
                status: other.status(),
                code: None,
                message: other.to_string(),
                fields: BTreeMap::new(),
            },
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(&self.message)
    }
}
