//! Waybill drafts on the core service

use crate::client_wrapper::WrappedAuthClient;
use logistics_http::client::path_segment;
use logistics_http::types::{
    CreateDraftRequest, Draft, DraftStatus, PricingRule, UpdateDraftRequest,
};
use logistics_http::{Call, ClientError};

const DRAFTS: &str = "/waybills/drafts";

#[derive(Clone)]
pub struct DraftService {
    client: WrappedAuthClient,
}

impl DraftService {
    pub fn new(client: WrappedAuthClient) -> Self {
        Self { client }
    }

    pub async fn create(&self, request: &CreateDraftRequest) -> Result<Draft, ClientError> {
        let call = Call::post(DRAFTS).json(request)?.authenticated();
        self.client.execute_required(call).await
    }

    /// Drafts of the current user, optionally filtered by status
    pub async fn list(&self, status: Option<DraftStatus>) -> Result<Vec<Draft>, ClientError> {
        let mut call = Call::get(DRAFTS).authenticated();
        if let Some(status) = status {
            call = call.query("status", status.as_str());
        }
        Ok(self.client.execute(call).await?.unwrap_or_default())
    }

    pub async fn get(&self, id: i64) -> Result<Draft, ClientError> {
        let call = Call::get(format!("{DRAFTS}/{id}")).authenticated();
        self.client.execute_required(call).await
    }

    pub async fn get_by_barcode(&self, barcode: &str) -> Result<Draft, ClientError> {
        let call = Call::get(format!("{DRAFTS}/by-barcode/{}", path_segment(barcode))).authenticated();
        self.client.execute_required(call).await
    }

    pub async fn update(&self, id: i64, request: &UpdateDraftRequest) -> Result<Draft, ClientError> {
        let call = Call::put(format!("{DRAFTS}/{id}"))
            .json(request)?
            .authenticated();
        self.client.execute_required(call).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), ClientError> {
        let call = Call::delete(format!("{DRAFTS}/{id}")).authenticated();
        self.client.execute_empty(call).await
    }

    pub async fn pricing_rules(&self) -> Result<Vec<PricingRule>, ClientError> {
        let call = Call::get("/pricing-rules").authenticated();
        Ok(self.client.execute(call).await?.unwrap_or_default())
    }
}
