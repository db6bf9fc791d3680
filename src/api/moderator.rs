//! Moderator review workflows: agent approval, reported products, listing review.

use reqwest::Method;
use serde_json::json;
use tracing::info;

use crate::error::{ApiError, ApiResult};

use super::client::{ApiClient, Auth};
use super::models::{ModeratorStats, PendingAgent, ProductReport};

pub struct ModeratorApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ModeratorApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self { Self { client } }

    pub async fn pending_agents(&self) -> ApiResult<Vec<PendingAgent>> {
        let req = self.client.request(Method::GET, "moderator/pending-agents", Auth::Bearer).await?;
        self.client.send_json(req, Auth::Bearer).await
    }

    pub async fn approve_agent(&self, agent_id: i64) -> ApiResult<serde_json::Value> {
        self.post_empty(&format!("moderator/approve-agents/{}", agent_id)).await
    }

    pub async fn reject_agent(&self, agent_id: i64) -> ApiResult<serde_json::Value> {
        self.post_empty(&format!("moderator/reject-agents/{}", agent_id)).await
    }

    pub async fn stats(&self) -> ApiResult<ModeratorStats> {
        let req = self.client.request(Method::GET, "moderator/stats", Auth::Bearer).await?;
        self.client.send_json(req, Auth::Bearer).await
    }

    pub async fn reported_products(&self) -> ApiResult<Vec<ProductReport>> {
        let req = self.client.request(Method::GET, "reports", Auth::Bearer).await?;
        self.client.send_json(req, Auth::Bearer).await
    }

    /// Dismiss a report and keep the listing.
    pub async fn keep_reported(&self, report_id: i64) -> ApiResult<()> {
        let req = self.client.request(Method::POST, &format!("reports/{}/keep", report_id), Auth::Bearer).await?;
        self.client.send_unit(req, Auth::Bearer).await?;
        info!(target: "api", "report {} dismissed, listing kept", report_id);
        Ok(())
    }

    /// Uphold a report and remove the listing. `reason` must not be blank.
    pub async fn delete_reported(&self, report_id: i64, reason: &str) -> ApiResult<()> {
        let reason = non_blank(reason, "rejection reason")?;
        let req = self
            .client
            .request(Method::POST, &format!("reports/{}/delete", report_id), Auth::Bearer)
            .await?
            .json(&json!({ "rejection_reason": reason }));
        self.client.send_unit(req, Auth::Bearer).await?;
        info!(target: "api", "report {} upheld, listing removed", report_id);
        Ok(())
    }

    pub async fn approve_listing(&self, product_id: i64, moderator_id: i64) -> ApiResult<()> {
        let req = self
            .client
            .request(Method::POST, &format!("moderator/approve-listings/{}", product_id), Auth::Bearer)
            .await?
            .json(&json!({ "moderator_id": moderator_id }));
        self.client.send_unit(req, Auth::Bearer).await
    }

    pub async fn reject_listing(&self, product_id: i64, moderator_id: i64, reason: &str) -> ApiResult<()> {
        let reason = non_blank(reason, "rejection reason")?;
        let req = self
            .client
            .request(Method::POST, &format!("moderator/reject-listings/{}", product_id), Auth::Bearer)
            .await?
            .json(&json!({ "moderator_id": moderator_id, "reason": reason }));
        self.client.send_unit(req, Auth::Bearer).await
    }

    async fn post_empty(&self, path: &str) -> ApiResult<serde_json::Value> {
        let req = self.client.request(Method::POST, path, Auth::Bearer).await?;
        self.client.send_json(req, Auth::Bearer).await
    }
}

pub(crate) fn non_blank<'s>(value: &'s str, what: &str) -> ApiResult<&'s str> {
    let v = value.trim();
    if v.is_empty() {
        return Err(ApiError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(v)
}

impl ApiClient {
    pub fn moderator(&self) -> ModeratorApi<'_> { ModeratorApi::new(self) }
}
