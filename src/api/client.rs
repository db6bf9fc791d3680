use anyhow::Context;
use reqwest::header::HeaderMap;
use reqwest::{Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionManager;

/// How a request authenticates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    /// Public endpoint, no credentials.
    None,
    /// Bearer header when a session exists (refreshed first if near expiry).
    Bearer,
    /// Bearer + CSRF header set; refused locally when unavailable.
    DeliveryAgent,
}

/// Shared handle for the REST wrappers: one HTTP client (with cookie store),
/// the API root, and the session manager every authenticated call goes through.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    session: SessionManager,
}

impl ApiClient {
    /// `base` must end with a slash; `ClientConfig::base_url` guarantees that.
    pub fn new(http: reqwest::Client, base: Url, session: SessionManager) -> Self {
        Self { http, base, session }
    }

    /// Client and session manager built from one configuration, sharing the
    /// same HTTP client so the CSRF cookie follows delivery-agent calls.
    pub fn from_config(cfg: &ClientConfig) -> anyhow::Result<Self> {
        let http = cfg.http_client().context("building HTTP client")?;
        let base = cfg.base_url()?;
        let session = SessionManager::from_config(cfg, http.clone())?;
        Ok(Self::new(http, base, session))
    }

    pub fn session(&self) -> &SessionManager { &self.session }

    pub fn base_url(&self) -> &Url { &self.base }

    pub(crate) fn url(&self, path: &str) -> ApiResult<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidInput(format!("bad path {}: {}", path, e)))
    }

    /// Request builder with the headers `auth` calls for.
    pub(crate) async fn request(&self, method: Method, path: &str, auth: Auth) -> ApiResult<RequestBuilder> {
        let url = self.url(path)?;
        let headers = self.headers_for(auth).await?;
        debug!(target: "api", "{} {}", method, url.path());
        Ok(self.http.request(method, url).headers(headers))
    }

    async fn headers_for(&self, auth: Auth) -> ApiResult<HeaderMap> {
        match auth {
            Auth::None => Ok(HeaderMap::new()),
            Auth::Bearer => {
                if self.session.token().is_none() {
                    return Ok(HeaderMap::new());
                }
                let header = self.session.fresh_auth_header().await?;
                header.to_header_map().map_err(|e| ApiError::InvalidInput(format!("authorization header: {}", e)))
            }
            Auth::DeliveryAgent => {
                let Some(headers) = self.session.delivery_agent_headers() else {
                    warn!(target: "api", "delivery-agent headers unavailable; login required");
                    return Err(ApiError::AuthenticationRequired);
                };
                headers.to_header_map().map_err(|e| ApiError::InvalidInput(format!("delivery-agent headers: {}", e)))
            }
        }
    }

    /// Send and decode a JSON body.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, req: RequestBuilder, auth: Auth) -> ApiResult<T> {
        let resp = check_status(req.send().await?, auth).await?;
        Ok(resp.json::<T>().await?)
    }

    /// Send, check status, and ignore the body.
    pub(crate) async fn send_unit(&self, req: RequestBuilder, auth: Auth) -> ApiResult<()> {
        check_status(req.send().await?, auth).await?;
        Ok(())
    }
}

/// Map non-2xx responses to `ApiError`. A 401 on an authenticated call means
/// the session expired.
async fn check_status(resp: Response, auth: Auth) -> ApiResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == StatusCode::UNAUTHORIZED && auth != Auth::None {
        warn!(target: "api", "{} returned 401; session expired", resp.url().path());
        return Err(ApiError::AuthenticationExpired);
    }
    let fallback = status.canonical_reason().unwrap_or("request failed").to_string();
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status { status: status.as_u16(), detail: error_detail(&body).unwrap_or(fallback) })
}

/// Server error message from a `{"detail": ..}` or `{"message": ..}` body.
pub(crate) fn error_detail(body: &str) -> Option<String> {
    let v: serde_json::Value = serde_json::from_str(body).ok()?;
    ["detail", "message", "error"]
        .iter()
        .find_map(|k| v.get(*k).and_then(|d| d.as_str()).map(|s| s.to_string()))
}
