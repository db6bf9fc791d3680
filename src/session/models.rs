use reqwest::header::{HeaderMap, HeaderName, HeaderValue, InvalidHeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Access/refresh credential pair. Field names match the refresh endpoint's
/// response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl TokenPair {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self { access_token: access_token.into(), refresh_token: refresh_token.into() }
    }
}

/// Profile of the logged-in user as returned by login / 2FA verification.
/// Fields the client does not model are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub user_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `Authorization: Bearer <token>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub authorization: String,
}

impl AuthHeader {
    pub fn bearer(token: &str) -> Self {
        Self { authorization: format!("Bearer {}", token) }
    }

    pub fn to_header_map(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&self.authorization)?);
        Ok(headers)
    }
}

/// Header set required by every delivery-agent call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryAgentHeaders {
    pub authorization: String,
    pub csrf_token: String,
    pub content_type: &'static str,
}

impl DeliveryAgentHeaders {
    pub(crate) fn new(access_token: &str, csrf_token: &str) -> Self {
        Self {
            authorization: format!("Bearer {}", access_token),
            csrf_token: csrf_token.to_string(),
            content_type: JSON_CONTENT_TYPE,
        }
    }

    /// Header name/value pairs in wire form.
    pub fn pairs(&self) -> [(&'static str, &str); 3] {
        [
            ("Authorization", self.authorization.as_str()),
            (CSRF_HEADER, self.csrf_token.as_str()),
            ("Content-Type", self.content_type),
        ]
    }

    pub fn to_header_map(&self) -> Result<HeaderMap, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&self.authorization)?);
        headers.insert(HeaderName::from_static("x-csrftoken"), HeaderValue::from_str(&self.csrf_token)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        Ok(headers)
    }
}

/// Coarse session phase. A refresh in flight does not change it; see
/// `SessionManager::is_refreshing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}
