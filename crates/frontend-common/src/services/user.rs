//! Profile of the signed-in user

use crate::client_wrapper::WrappedAuthClient;
use crate::verification::{CompletionError, PhoneVerification};
use logistics_http::types::{
    UpdatePasswordRequest, UpdatePersonalInfoRequest, UpdatePhoneRequest, UserProfile,
};
use logistics_http::{Call, ClientError};

const ME: &str = "/users/me";

#[derive(Clone)]
pub struct UserService {
    client: WrappedAuthClient,
}

impl UserService {
    pub fn new(client: WrappedAuthClient) -> Self {
        Self { client }
    }

    pub async fn profile(&self) -> Result<UserProfile, ClientError> {
        self.client
            .execute_required(Call::get(ME).authenticated())
            .await
    }

    /// Commit a new phone number. Callers verify it first, see [`Self::change_phone`].
    pub async fn update_phone(&self, phone: &str) -> Result<Option<UserProfile>, ClientError> {
        let call = Call::put(format!("{ME}/phone"))
            .json(&UpdatePhoneRequest {
                phone: phone.to_string(),
            })?
            .authenticated();
        self.client.execute(call).await
    }

    pub async fn update_password(&self, old_password: &str, new_password: &str) -> Result<(), ClientError> {
        let call = Call::put(format!("{ME}/password"))
            .json(&UpdatePasswordRequest {
                old_password: old_password.to_string(),
                new_password: new_password.to_string(),
            })?
            .authenticated();
        self.client.execute_empty(call).await
    }

    pub async fn update_personal_info(
        &self,
        request: &UpdatePersonalInfoRequest,
    ) -> Result<Option<UserProfile>, ClientError> {
        let call = Call::patch(format!("{ME}/personal"))
            .json(request)?
            .authenticated();
        self.client.execute(call).await
    }

    /// Verify `code` for the flow's phone, then make it the account phone
    pub async fn change_phone(
        &self,
        flow: &PhoneVerification,
        code: &str,
    ) -> Result<Option<UserProfile>, CompletionError> {
        let verified = flow.verify_code(code).await?;
        Ok(self.update_phone(&verified.phone).await?)
    }
}
