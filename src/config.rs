//! Client configuration, read from the environment with defaults.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const ENV_API_BASE_URL: &str = "MARKET_API_BASE_URL";
pub const ENV_SESSION_FILE: &str = "MARKET_SESSION_FILE";
pub const ENV_REFRESH_SKEW_SECS: &str = "MARKET_REFRESH_SKEW_SECS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "MARKET_HTTP_TIMEOUT_SECS";

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Root of the marketplace REST API; endpoint paths are appended to it.
    pub api_base_url: String,
    /// Durable session file. `None` keeps the session in memory only.
    #[serde(default)]
    pub session_file: Option<PathBuf>,
    /// Access tokens expiring within this many seconds are refreshed before use.
    #[serde(default = "ClientConfig::default_refresh_skew_secs")]
    pub refresh_skew_secs: u64,
    #[serde(default = "ClientConfig::default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl ClientConfig {
    fn default_refresh_skew_secs() -> u64 { 30 }
    fn default_http_timeout_secs() -> u64 { 30 }

    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var(ENV_API_BASE_URL) {
            cfg.api_base_url = v;
        }
        cfg.session_file = std::env::var(ENV_SESSION_FILE)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        if let Ok(v) = std::env::var(ENV_REFRESH_SKEW_SECS) {
            cfg.refresh_skew_secs = parse_secs(ENV_REFRESH_SKEW_SECS, &v)?;
        }
        if let Ok(v) = std::env::var(ENV_HTTP_TIMEOUT_SECS) {
            cfg.http_timeout_secs = parse_secs(ENV_HTTP_TIMEOUT_SECS, &v)?;
        }
        // Fail early on a malformed base URL rather than on the first request
        cfg.base_url()?;
        Ok(cfg)
    }

    /// Parsed base URL with a guaranteed trailing slash, so `join` appends
    /// instead of replacing the last path segment.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let mut raw = self.api_base_url.trim().to_string();
        if !raw.ends_with('/') { raw.push('/'); }
        Url::parse(&raw).map_err(|e| ConfigError { var: ENV_API_BASE_URL, message: e.to_string() })
    }

    pub fn refresh_skew(&self) -> Duration { Duration::from_secs(self.refresh_skew_secs) }

    pub fn http_timeout(&self) -> Duration { Duration::from_secs(self.http_timeout_secs) }

    /// Shared HTTP client. The cookie store keeps the CSRF cookie that the server
    /// pairs with the token from `/delivery-agent/csrf-token`.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .cookie_store(true)
            .timeout(self.http_timeout())
            .build()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            session_file: None,
            refresh_skew_secs: Self::default_refresh_skew_secs(),
            http_timeout_secs: Self::default_http_timeout_secs(),
        }
    }
}

fn parse_secs(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|e| ConfigError { var, message: format!("'{}': {}", raw, e) })
}
