//! Authentication API client methods

use super::{ApiClient, Call, ClientError};
use crate::types::{RefreshTokenRequest, RegisterRequest, SignInRequest, TokenPair};

impl ApiClient {
    /// Exchange credentials for a token pair
    pub async fn sign_in(&self, request: &SignInRequest) -> Result<TokenPair, ClientError> {
        let call = Call::post("/auth/sign-in").json(request)?;
        self.execute_required(call).await
    }

    /// Create an account; the phone must already be verified
    pub async fn register(&self, request: &RegisterRequest) -> Result<TokenPair, ClientError> {
        let call = Call::post("/auth/register").json(request)?;
        self.execute_required(call).await
    }

    /// Mint a new token pair from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, ClientError> {
        let call = Call::post("/auth/refresh").json(&RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        })?;
        self.execute_required(call).await
    }

    /// Invalidate a refresh token on the server
    pub async fn logout(&self, refresh_token: &str) -> Result<(), ClientError> {
        let call = Call::post("/auth/logout").json(&RefreshTokenRequest {
            refresh_token: refresh_token.to_string(),
        })?;
        self.execute_empty(call).await
    }
}
