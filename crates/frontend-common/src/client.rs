//! Client configuration and initialization

use crate::auth::{AuthContext, TokenStore};
use crate::client_wrapper::WrappedAuthClient;
use crate::config::ClientConfig;
use crate::services::{AuthApiService, DraftService, UserService};
use crate::verification::PhoneVerification;
pub use logistics_http::ClientError;
use logistics_http::{ApiClient, SmsClient};
use std::sync::Arc;

/// Every service of one running application, sharing a single session
#[derive(Clone)]
pub struct ClientSet {
    pub session: Arc<AuthContext>,
    pub auth: AuthApiService,
    pub sms: SmsClient,
    pub users: UserService,
    pub drafts: DraftService,
}

impl ClientSet {
    pub fn new(config: &ClientConfig, tokens: TokenStore) -> Result<Self, ClientError> {
        let api = build_client(&config.api_base_url, config)?;
        let core = build_client(&config.core_api_base_url, config)?;

        let session = Arc::new(AuthContext::new(tokens, api.clone()));

        Ok(Self {
            auth: AuthApiService::new(api.clone(), session.clone()),
            sms: SmsClient::new(api.clone(), config.sms.clone()),
            users: UserService::new(WrappedAuthClient::new(api, session.clone())),
            drafts: DraftService::new(WrappedAuthClient::new(core, session.clone())),
            session,
        })
    }

    /// Fresh verification flow on the shared SMS client
    pub fn phone_verification(&self) -> PhoneVerification {
        PhoneVerification::with_system_clock(self.sms.clone())
    }
}

fn build_client(base_url: &str, config: &ClientConfig) -> Result<ApiClient, ClientError> {
    let mut builder = ApiClient::builder().base_url(base_url);
    if let Some(timeout) = config.timeout() {
        builder = builder.timeout(timeout);
    }
    builder.build()
}
