//! Delivery-agent endpoints. Every call takes its headers from
//! `SessionManager::delivery_agent_headers`; when those are unavailable the
//! call fails with `AuthenticationRequired` before touching the network.

use reqwest::Method;
use tracing::info;

use crate::error::ApiResult;

use super::client::{ApiClient, Auth};
use super::models::{DeliveryAgentStats, DeliveryDetails, DeliveryRequest, DeliveryStatus};

pub struct DeliveryAgentApi<'a> {
    client: &'a ApiClient,
}

impl<'a> DeliveryAgentApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self { Self { client } }

    /// Fetch a CSRF token unless one is already stored. Returns the token in use.
    pub async fn ensure_csrf(&self) -> ApiResult<String> {
        if let Some(t) = self.client.session().csrf_token() {
            return Ok(t);
        }
        Ok(self.client.session().fetch_and_store_csrf_token().await?)
    }

    pub async fn stats(&self, agent_id: i64) -> ApiResult<DeliveryAgentStats> {
        self.get(&format!("delivery-agent/stats/{}", agent_id)).await
    }

    pub async fn pending_requests(&self, agent_id: i64) -> ApiResult<Vec<DeliveryRequest>> {
        self.get(&format!("delivery-agent/pending-requests/{}", agent_id)).await
    }

    pub async fn accepted_deliveries(&self, agent_id: i64) -> ApiResult<Vec<DeliveryRequest>> {
        self.get(&format!("delivery-agent/accepted-deliveries/{}", agent_id)).await
    }

    pub async fn previous_deliveries(&self, agent_id: i64) -> ApiResult<Vec<DeliveryRequest>> {
        self.get(&format!("delivery-agent/previous-deliveries/{}", agent_id)).await
    }

    pub async fn delivery_details(&self, request_id: i64) -> ApiResult<DeliveryDetails> {
        self.get(&format!("delivery-agent/accepted-delivery-details/{}", request_id)).await
    }

    /// Assign a pending request to the agent. Returns the server's body as-is.
    pub async fn accept_request(&self, request_id: i64, agent_id: i64) -> ApiResult<serde_json::Value> {
        let path = format!("delivery-agent/accept-request/{}/{}", request_id, agent_id);
        let req = self.client.request(Method::POST, &path, Auth::DeliveryAgent).await?;
        let out = self.client.send_json(req, Auth::DeliveryAgent).await?;
        info!(target: "api", "agent {} accepted delivery request {}", agent_id, request_id);
        Ok(out)
    }

    pub async fn update_status(&self, request_id: i64, status: DeliveryStatus) -> ApiResult<serde_json::Value> {
        let path = format!("delivery-agent/update-status/{}", request_id);
        let req = self
            .client
            .request(Method::POST, &path, Auth::DeliveryAgent)
            .await?
            .json(&serde_json::json!({ "status": status }));
        let out = self.client.send_json(req, Auth::DeliveryAgent).await?;
        info!(target: "api", "delivery request {} status set to {}", request_id, status.as_str());
        Ok(out)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let req = self.client.request(Method::GET, path, Auth::DeliveryAgent).await?;
        self.client.send_json(req, Auth::DeliveryAgent).await
    }
}

impl ApiClient {
    pub fn delivery_agent(&self) -> DeliveryAgentApi<'_> { DeliveryAgentApi::new(self) }
}
