//! Product listings and the wanted-items board.

use reqwest::Method;
use serde_json::json;

use crate::error::ApiResult;

use super::client::{ApiClient, Auth};
use super::models::{Category, Product, ProductIn, WantedQuery};
use super::moderator::non_blank;

pub struct ProductsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> ProductsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self { Self { client } }

    pub async fn categories(&self) -> ApiResult<Vec<Category>> {
        let req = self.client.request(Method::GET, "products/categories", Auth::None).await?;
        self.client.send_json(req, Auth::None).await
    }

    pub async fn search_wanted(&self, query: &WantedQuery) -> ApiResult<Vec<Product>> {
        let qs = query.to_query_string();
        let path = if qs.is_empty() { "products/wanted".to_string() } else { format!("products/wanted?{}", qs) };
        let req = self.client.request(Method::GET, &path, Auth::None).await?;
        self.client.send_json(req, Auth::None).await
    }

    pub async fn product(&self, product_id: i64) -> ApiResult<Product> {
        let req = self.client.request(Method::GET, &format!("products/{}", product_id), Auth::None).await?;
        self.client.send_json(req, Auth::None).await
    }

    pub async fn similar_products(&self, product_id: i64) -> ApiResult<Vec<Product>> {
        let req = self.client.request(Method::GET, &format!("products/{}/similar", product_id), Auth::None).await?;
        self.client.send_json(req, Auth::None).await
    }

    /// Create a listing, or a wanted post when `is_wanted` is set.
    pub async fn create_product(&self, product: &ProductIn) -> ApiResult<Product> {
        let req = self.client.request(Method::POST, "products", Auth::Bearer).await?.json(product);
        self.client.send_json(req, Auth::Bearer).await
    }

    pub async fn report_product(&self, product_id: i64, user_id: i64, reason: &str) -> ApiResult<()> {
        let reason = non_blank(reason, "report reason")?;
        let req = self
            .client
            .request(Method::POST, &format!("reports/{}", product_id), Auth::Bearer)
            .await?
            .json(&json!({ "user_id": user_id, "product_id": product_id, "reason": reason }));
        self.client.send_unit(req, Auth::Bearer).await
    }
}

impl ApiClient {
    pub fn products(&self) -> ProductsApi<'_> { ProductsApi::new(self) }
}
