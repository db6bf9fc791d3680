use super::*;

#[test]
fn session_codes_are_stable() {
    assert_eq!(SessionError::NoToken.code_str(), "no_token");
    assert_eq!(SessionError::NoRefreshToken.code_str(), "no_refresh_token");
    assert_eq!(SessionError::RefreshFailed("HTTP 401".into()).code_str(), "refresh_failed");
    assert_eq!(SessionError::MissingUser.code_str(), "missing_user");
    assert_eq!(SessionError::CsrfAcquisition("x".into()).code_str(), "csrf_acquisition");
    assert_eq!(SessionError::Transport("x".into()).code_str(), "transport");
}

#[test]
fn login_redirect_mapping() {
    assert!(SessionError::NoToken.requires_login());
    assert!(SessionError::RefreshFailed("HTTP 401".into()).requires_login());
    assert!(!SessionError::CsrfAcquisition("missing".into()).requires_login());
    assert!(!SessionError::Transport("reset".into()).requires_login());

    assert!(ApiError::AuthenticationRequired.requires_login());
    assert!(ApiError::AuthenticationExpired.requires_login());
    assert!(ApiError::Session(SessionError::NoRefreshToken).requires_login());
    assert!(!ApiError::Status { status: 500, detail: "boom".into() }.requires_login());
}

#[test]
fn api_error_status_and_display() {
    assert_eq!(ApiError::AuthenticationExpired.http_status(), Some(401));
    let e = ApiError::Status { status: 404, detail: "Product not found".into() };
    assert_eq!(e.http_status(), Some(404));
    assert_eq!(e.to_string(), "HTTP 404: Product not found");
    assert_eq!(ApiError::InvalidInput("empty".into()).http_status(), None);
    assert_eq!(
        ApiError::AuthenticationRequired.to_string(),
        "Authentication required. Please login again."
    );
}

#[test]
fn session_error_passes_through_api_error() {
    let e: ApiError = SessionError::MissingUser.into();
    assert_eq!(e.code_str(), "missing_user");
    assert_eq!(e.to_string(), SessionError::MissingUser.to_string());
}
