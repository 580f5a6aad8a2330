//! Authentication API service

use crate::auth::AuthContext;
use crate::verification::{CompletionError, PhoneVerification};
use logistics_http::types::{RegisterRequest, SignInRequest};
use logistics_http::{ApiClient, ClientError};
use std::sync::Arc;

/// Sign-in, registration and sign-out against the auth service
#[derive(Clone)]
pub struct AuthApiService {
    client: ApiClient,
    session: Arc<AuthContext>,
}

impl AuthApiService {
    pub fn new(client: ApiClient, session: Arc<AuthContext>) -> Self {
        Self { client, session }
    }

    /// Sign in and store the issued tokens
    pub async fn sign_in(&self, request: &SignInRequest) -> Result<(), ClientError> {
        let tokens = self.client.sign_in(request).await?;
        self.session
            .set_tokens(&tokens.access_token, &tokens.refresh_token);
        Ok(())
    }

    /// Create the account and store the issued tokens
    pub async fn register(&self, request: &RegisterRequest) -> Result<(), ClientError> {
        let tokens = self.client.register(request).await?;
        self.session
            .set_tokens(&tokens.access_token, &tokens.refresh_token);
        Ok(())
    }

    /// Verify `code` for the flow's phone, then register with that phone
    pub async fn complete_registration(
        &self,
        flow: &PhoneVerification,
        mut request: RegisterRequest,
        code: &str,
    ) -> Result<(), CompletionError> {
        let verified = flow.verify_code(code).await?;
        request.phone = verified.phone;
        self.register(&request).await?;
        Ok(())
    }

    pub async fn logout(&self) {
        self.session.logout().await;
    }
}
