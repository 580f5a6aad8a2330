//! User-friendly error message mappings

use logistics_http::ClientError;

/// Text to show for a failed call.
///
/// The server already localizes its messages, so a payload message wins,
/// then the payload error code, then the local description of the failure.
pub fn user_friendly_error(error: &ClientError) -> String {
    match error {
        ClientError::Api(api) if !api.message.trim().is_empty() => api.message.clone(),
        ClientError::Api(api) => api
            .code
            .clone()
            .unwrap_or_else(|| format!("HTTP {}", api.status)),
        ClientError::Request(err) if err.is_timeout() => {
            "The server did not respond in time".to_string()
        }
        ClientError::Request(err) if err.is_connect() => {
            "Could not connect to the server".to_string()
        }
        ClientError::NoSession => "Your session has ended, please sign in again".to_string(),
        other => other.to_string(),
    }
}
