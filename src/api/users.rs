//! User endpoints: own listings, favourites, and two-factor authentication.

use reqwest::Method;
use serde_json::json;
use tracing::info;

use crate::error::ApiResult;
use crate::session::{TokenPair, UserProfile};

use super::client::{ApiClient, Auth};
use super::models::{Product, TwoFactorSetup, VerifiedLogin};
use super::moderator::non_blank;

pub struct UsersApi<'a> {
    client: &'a ApiClient,
}

impl<'a> UsersApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self { Self { client } }

    pub async fn listings(&self, user_id: i64) -> ApiResult<Vec<Product>> {
        let req = self.client.request(Method::GET, &format!("users/my-listings/{}", user_id), Auth::Bearer).await?;
        self.client.send_json(req, Auth::Bearer).await
    }

    /// Start 2FA enrolment; the URI is rendered as a QR code by the caller.
    pub async fn setup_2fa(&self, user_id: i64) -> ApiResult<TwoFactorSetup> {
        let path = format!("users/2fa/setup?user_id={}", user_id);
        let req = self.client.request(Method::POST, &path, Auth::Bearer).await?;
        self.client.send_json(req, Auth::Bearer).await
    }

    /// Verify a 2FA code. On success the returned tokens and profile become the
    /// current session.
    pub async fn verify_2fa(&self, user_id: i64, code: &str) -> ApiResult<UserProfile> {
        let code = non_blank(code, "2FA code")?;
        let req = self
            .client
            .request(Method::POST, "users/2fa/verify", Auth::None)
            .await?
            .json(&json!({ "user_id": user_id, "code": code }));
        let login: VerifiedLogin = self.client.send_json(req, Auth::None).await?;
        let tokens = TokenPair::new(login.token, login.refresh_token);
        self.client.session().set_auth_data(&tokens, &login.user);
        info!(target: "api", "2FA verified for user {}", login.user.user_id);
        Ok(login.user)
    }

    pub async fn favourites(&self, user_id: i64) -> ApiResult<Vec<Product>> {
        let req = self.client.request(Method::GET, &format!("users/favourites/{}", user_id), Auth::Bearer).await?;
        self.client.send_json(req, Auth::Bearer).await
    }

    pub async fn add_favourite(&self, user_id: i64, product_id: i64) -> ApiResult<()> {
        let req = self
            .client
            .request(Method::POST, "users/favourites", Auth::Bearer)
            .await?
            .json(&json!({ "user_id": user_id, "product_id": product_id }));
        self.client.send_unit(req, Auth::Bearer).await
    }

    pub async fn remove_favourite(&self, user_id: i64, product_id: i64) -> ApiResult<()> {
        let path = format!("users/favourites/{}/{}", user_id, product_id);
        let req = self.client.request(Method::DELETE, &path, Auth::Bearer).await?;
        self.client.send_unit(req, Auth::Bearer).await
    }
}

impl ApiClient {
    pub fn users(&self) -> UsersApi<'_> { UsersApi::new(self) }
}
