//! Unified client error model.
//! `SessionError` covers the session core (token storage, refresh, CSRF acquisition);
//! `ApiError` covers the REST wrappers built on top of it.

use thiserror::Error;

/// Failures raised by the session manager.
///
/// `Clone` is required: one coalesced refresh attempt hands the same result to
/// every waiter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no access token available")]
    NoToken,
    #[error("no refresh token available")]
    NoRefreshToken,
    #[error("failed to refresh token: {0}")]
    RefreshFailed(String),
    #[error("no current user stored; refreshed tokens were not saved")]
    MissingUser,
    #[error("failed to get CSRF token: {0}")]
    CsrfAcquisition(String),
    #[error("transport error: {0}")]
    Transport(String),
}

impl SessionError {
    pub fn code_str(&self) -> &'static str {
        match self {
            SessionError::NoToken => "no_token",
            SessionError::NoRefreshToken => "no_refresh_token",
            SessionError::RefreshFailed(_) => "refresh_failed",
            SessionError::MissingUser => "missing_user",
            SessionError::CsrfAcquisition(_) => "csrf_acquisition",
            SessionError::Transport(_) => "transport",
        }
    }

    /// True when the only way forward is a fresh login.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            SessionError::NoToken
                | SessionError::NoRefreshToken
                | SessionError::RefreshFailed(_)
                | SessionError::MissingUser
        )
    }
}

impl From<reqwest::Error> for SessionError {
    fn from(err: reqwest::Error) -> Self {
        SessionError::Transport(err.to_string())
    }
}

/// Failures raised by the REST wrappers in [`crate::api`].
#[derive(Debug, Error)]
pub enum ApiError {
    /// Delivery-agent headers were unavailable (no access token or no CSRF token).
    #[error("Authentication required. Please login again.")]
    AuthenticationRequired,
    /// The server answered 401 on an authenticated call.
    #[error("Authentication expired. Please login again.")]
    AuthenticationExpired,
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn code_str(&self) -> &'static str {
        match self {
            ApiError::AuthenticationRequired => "authentication_required",
            ApiError::AuthenticationExpired => "authentication_expired",
            ApiError::Status { .. } => "http_status",
            ApiError::InvalidInput(_) => "invalid_input",
            ApiError::Session(e) => e.code_str(),
            ApiError::Transport(_) => "transport",
            ApiError::Decode(_) => "decode",
        }
    }

    /// Consumers redirect to the login entry point when this is true.
    pub fn requires_login(&self) -> bool {
        match self {
            ApiError::AuthenticationRequired | ApiError::AuthenticationExpired => true,
            ApiError::Session(e) => e.requires_login(),
            _ => false,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            ApiError::AuthenticationExpired => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiError::Decode(err.to_string())
        } else {
            ApiError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Decode(err.to_string())
    }
}

pub type SessionResult<T> = Result<T, SessionError>;
pub type ApiResult<T> = Result<T, ApiError>;

/// Invalid client configuration, naming the offending environment variable.
#[derive(Debug, Error)]
#[error("invalid value for {var}: {message}")]
pub struct ConfigError {
    pub var: &'static str,
    pub message: String,
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod error_tests;
