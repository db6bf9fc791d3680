//! Best-effort expiry inspection for JWT access tokens.
//! Opaque (non-JWT) tokens have no known expiry and are never treated as stale.

use std::time::Duration;

use base64::Engine;
use serde_json::Value;

/// `exp` claim (seconds since epoch) of a JWT, if the token is one.
pub fn jwt_expiry(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let (_header, payload, _sig) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() { return None; }
    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    match claims.get("exp")? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    }
}

/// True when the token carries an `exp` claim at or before `now + skew`.
pub fn expires_within(token: &str, skew: Duration, now_secs: i64) -> bool {
    match jwt_expiry(token) {
        Some(exp) => exp <= now_secs.saturating_add(i64::try_from(skew.as_secs()).unwrap_or(i64::MAX)),
        None => false,
    }
}
