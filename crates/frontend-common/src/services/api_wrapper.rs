//! API wrapper utilities for handling authentication errors

use crate::auth::AuthContext;
use logistics_http::ClientError;
use tracing::info;

/// True when the session cannot be recovered without signing in again.
///
/// The pipeline has already refreshed and retried by the time a 401 reaches
/// the caller, so any surviving 401 means the session is gone.
pub fn is_session_lost(error: &ClientError) -> bool {
    error.is_no_session() || error.is_auth_expired()
}

/// Drop the local session if `error` shows it is unrecoverable
pub fn handle_api_error(error: &ClientError, auth: &AuthContext) {
    if is_session_lost(error) && auth.is_authenticated() {
        info!("Session rejected by the server, signing out locally");
        auth.clear_local();
    }
}

/// Wrapper for API calls that handles auth errors
pub async fn with_auth_error_handling<T, F>(
    auth: &AuthContext,
    api_call: F,
) -> Result<T, ClientError>
where
    F: std::future::Future<Output = Result<T, ClientError>>,
{
    match api_call.await {
        Ok(result) => Ok(result),
        Err(error) => {
            handle_api_error(&error, auth);
            Err(error)
        }
    }
}
