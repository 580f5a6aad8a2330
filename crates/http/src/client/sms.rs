//! SMS verification endpoints

use super::{ApiClient, Call, ClientError};
use crate::types::{PhoneRequest, SmsConfig, VerifyPhoneRequest};
use serde::{Deserialize, Serialize};

/// Paths of the verification endpoints. Resend defaults to the send
/// endpoint; deployments exposing `/sms/resend-code` override it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmsRoutes {
    pub config_path: String,
    pub send_code_path: String,
    pub resend_code_path: String,
    pub verify_code_path: String,
}

impl Default for SmsRoutes {
    fn default() -> Self {
        Self {
            config_path: "/sms/config".to_string(),
            send_code_path: "/sms/send-verification-code".to_string(),
            resend_code_path: "/sms/send-verification-code".to_string(),
            verify_code_path: "/sms/verify-phone".to_string(),
        }
    }
}

/// Unauthenticated client for the one-time-code endpoints
#[derive(Clone)]
pub struct SmsClient {
    client: ApiClient,
    routes: SmsRoutes,
}

impl SmsClient {
    pub fn new(client: ApiClient, routes: SmsRoutes) -> Self {
        Self { client, routes }
    }

    pub fn routes(&self) -> &SmsRoutes {
        &self.routes
    }

    /// Fetch the server-side resend cooldown
    pub async fn config(&self) -> Result<SmsConfig, ClientError> {
        let call = Call::get(self.routes.config_path.as_str());
        Ok(self.client.execute(call).await?.unwrap_or_default())
    }

    /// Send a verification code to `phone`
    pub async fn send_code(&self, phone: &str) -> Result<(), ClientError> {
        self.post_phone(&self.routes.send_code_path, phone).await
    }

    /// Request another code for `phone`
    pub async fn resend_code(&self, phone: &str) -> Result<(), ClientError> {
        self.post_phone(&self.routes.resend_code_path, phone).await
    }

    /// Check a code; success does not change any user data
    pub async fn verify_code(&self, phone: &str, code: &str) -> Result<(), ClientError> {
        let call = Call::post(self.routes.verify_code_path.as_str()).json(&VerifyPhoneRequest {
            phone: phone.to_string(),
            code: code.to_string(),
        })?;
        self.client.execute_empty(call).await
    }

    async fn post_phone(&self, path: &str, phone: &str) -> Result<(), ClientError> {
        let call = Call::post(path).json(&PhoneRequest {
            phone: phone.to_string(),
        })?;
        self.client.execute_empty(call).await
    }
}
