//! Network seam for the two endpoints the session core talks to.

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ConfigError, SessionError, SessionResult};

use super::models::TokenPair;

pub const REFRESH_PATH: &str = "users/token/refresh";
pub const CSRF_PATH: &str = "delivery-agent/csrf-token";

#[async_trait]
pub trait AuthTransport: Send + Sync {
    /// `POST /users/token/refresh`. Any non-2xx is `RefreshFailed`.
    async fn refresh(&self, refresh_token: &str) -> SessionResult<TokenPair>;

    /// `GET /delivery-agent/csrf-token`. Non-2xx or a missing/empty
    /// `csrf_token` field is `CsrfAcquisition`.
    async fn fetch_csrf_token(&self) -> SessionResult<String>;
}

#[derive(Deserialize)]
struct RefreshBody {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
struct CsrfBody {
    csrf_token: Option<String>,
}

#[derive(Clone)]
pub struct HttpAuthTransport {
    client: reqwest::Client,
    base: Url,
}

impl HttpAuthTransport {
    /// `base` must end with a slash; `ClientConfig::base_url` guarantees that.
    pub fn new(client: reqwest::Client, base: Url) -> Self {
        Self { client, base }
    }

    pub fn from_config(cfg: &ClientConfig, client: reqwest::Client) -> Result<Self, ConfigError> {
        Ok(Self::new(client, cfg.base_url()?))
    }

    fn endpoint(&self, path: &str) -> SessionResult<Url> {
        self.base.join(path).map_err(|e| SessionError::Transport(format!("bad endpoint {}: {}", path, e)))
    }
}

#[async_trait]
impl AuthTransport for HttpAuthTransport {
    async fn refresh(&self, refresh_token: &str) -> SessionResult<TokenPair> {
        let url = self.endpoint(REFRESH_PATH)?;
        let resp = self.client
            .post(url)
            .json(&serde_json::json!({ "refresh_token": refresh_token }))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SessionError::RefreshFailed(format!("HTTP {}", status.as_u16())));
        }
        let body: RefreshBody = resp
            .json()
            .await
            .map_err(|e| SessionError::RefreshFailed(format!("malformed response: {}", e)))?;
        match (body.access_token, body.refresh_token) {
            (Some(access), Some(refresh)) if !access.is_empty() && !refresh.is_empty() => {
                debug!(target: "session.refresh", "refresh endpoint returned a new token pair");
                Ok(TokenPair::new(access, refresh))
            }
            _ => Err(SessionError::RefreshFailed("response missing access_token or refresh_token".into())),
        }
    }

    async fn fetch_csrf_token(&self) -> SessionResult<String> {
        let url = self.endpoint(CSRF_PATH)?;
        let resp = self.client
            .get(url)
            .send()
            .await
            .map_err(|e| SessionError::CsrfAcquisition(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SessionError::CsrfAcquisition(format!("HTTP {}", status.as_u16())));
        }
        let body: CsrfBody = resp
            .json()
            .await
            .map_err(|e| SessionError::CsrfAcquisition(format!("malformed response: {}", e)))?;
        match body.csrf_token {
            Some(t) if !t.is_empty() => Ok(t),
            _ => Err(SessionError::CsrfAcquisition("CSRF token not found in response".into())),
        }
    }
}
