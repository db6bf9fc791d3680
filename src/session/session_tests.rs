use super::*;

use std::sync::atomic::AtomicUsize;

use async_trait::async_trait;
use base64::Engine;
use serde_json::json;

/// Scripted transport that counts calls and yields before answering so
/// concurrent callers overlap.
struct FakeTransport {
    refresh_calls: AtomicUsize,
    csrf_calls: AtomicUsize,
    refresh_result: Mutex<SessionResult<TokenPair>>,
    csrf_result: Mutex<SessionResult<String>>,
    last_refresh_token: Mutex<Option<String>>,
}

impl FakeTransport {
    fn new() -> Self {
        Self {
            refresh_calls: AtomicUsize::new(0),
            csrf_calls: AtomicUsize::new(0),
            refresh_result: Mutex::new(Ok(TokenPair::new("a2", "r2"))),
            csrf_result: Mutex::new(Ok("csrf-1".to_string())),
            last_refresh_token: Mutex::new(None),
        }
    }

    fn refresh_count(&self) -> usize { self.refresh_calls.load(Ordering::SeqCst) }
    fn csrf_count(&self) -> usize { self.csrf_calls.load(Ordering::SeqCst) }
}

#[async_trait]
impl AuthTransport for FakeTransport {
    async fn refresh(&self, refresh_token: &str) -> SessionResult<TokenPair> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_refresh_token.lock() = Some(refresh_token.to_string());
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.refresh_result.lock().clone()
    }

    async fn fetch_csrf_token(&self) -> SessionResult<String> {
        self.csrf_calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.csrf_result.lock().clone()
    }
}

fn user(id: i64) -> UserProfile {
    serde_json::from_value(json!({
        "user_id": id,
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": "ada@example.com",
        "user_type": "delivery_agent",
        "role_name": "agent",
        "phone": "+44 20 0000",
        "preferences": { "dark_mode": true }
    }))
    .unwrap()
}

fn setup() -> (SessionManager, Arc<MemoryStorage>, Arc<FakeTransport>) {
    let storage = Arc::new(MemoryStorage::new());
    let transport = Arc::new(FakeTransport::new());
    let sm = SessionManager::new(storage.clone(), transport.clone());
    (sm, storage, transport)
}

fn jwt_expiring_at(exp: i64) -> String {
    let enc = base64::engine::general_purpose::URL_SAFE_NO_PAD;
    format!("{}.{}.sig", enc.encode(r#"{"alg":"HS256"}"#), enc.encode(format!(r#"{{"exp":{}}}"#, exp)))
}

#[test]
fn set_auth_data_then_read_back() {
    let (sm, storage, _) = setup();
    assert!(!sm.is_authenticated());
    assert_eq!(sm.state(), SessionState::Anonymous);

    let u = user(7);
    sm.set_auth_data(&TokenPair::new("a", "r"), &u);

    assert_eq!(sm.token().as_deref(), Some("a"));
    assert_eq!(sm.refresh_token().as_deref(), Some("r"));
    assert_eq!(sm.current_user(), Some(u));
    assert!(sm.is_authenticated());
    assert_eq!(sm.state(), SessionState::Authenticated);
    assert_eq!(storage.get(keys::USER_ID).as_deref(), Some("7"));
    assert_eq!(storage.get(keys::USER_TYPE).as_deref(), Some("delivery_agent"));
}

#[test]
fn profile_round_trip_keeps_extra_fields() {
    let (sm, storage, _) = setup();
    let u = user(1);
    sm.set_auth_data(&TokenPair::new("a", "r"), &u);
    let back = sm.current_user().unwrap();
    assert_eq!(back, u);
    assert_eq!(back.extra.get("phone"), Some(&json!("+44 20 0000")));
    // stored representation is plain JSON with the server's field names
    let raw: serde_json::Value = serde_json::from_str(&storage.get(keys::CURRENT_USER).unwrap()).unwrap();
    assert_eq!(raw["user_id"], json!(1));
    assert_eq!(raw["preferences"]["dark_mode"], json!(true));
}

#[test]
fn set_auth_data_leaves_csrf_alone() {
    let (sm, _, _) = setup();
    sm.set_csrf_token("c0");
    sm.set_auth_data(&TokenPair::new("a", "r"), &user(1));
    assert_eq!(sm.csrf_token().as_deref(), Some("c0"));
}

#[test]
fn clear_auth_data_removes_everything() {
    let (sm, storage, _) = setup();
    sm.set_auth_data(&TokenPair::new("a", "r"), &user(3));
    sm.set_csrf_token("c");
    sm.clear_auth_data();

    assert!(sm.token().is_none());
    assert!(sm.refresh_token().is_none());
    assert!(sm.current_user().is_none());
    assert!(sm.csrf_token().is_none());
    assert!(!sm.is_authenticated());
    assert!(storage.is_empty());

    // idempotent
    sm.clear_auth_data();
    assert!(storage.is_empty());
}

#[test]
fn corrupt_profile_reads_as_absent() {
    let (sm, storage, _) = setup();
    sm.set_auth_data(&TokenPair::new("a", "r"), &user(3));
    storage.set(keys::CURRENT_USER, "{broken");
    assert!(sm.current_user().is_none());
    assert!(!sm.is_authenticated());
}

#[test]
fn delivery_agent_headers_need_both_tokens() {
    let (sm, storage, _) = setup();

    // neither
    assert!(sm.delivery_agent_headers().is_none());

    // csrf only
    sm.set_csrf_token("c");
    assert!(sm.delivery_agent_headers().is_none());

    // access token only
    storage.remove(keys::CSRF_TOKEN);
    sm.set_auth_data(&TokenPair::new("a", "r"), &user(1));
    assert!(sm.delivery_agent_headers().is_none());

    // both
    sm.set_csrf_token("c");
    let h = sm.delivery_agent_headers().unwrap();
    assert_eq!(h.authorization, "Bearer a");
    assert_eq!(h.csrf_token, "c");
    assert_eq!(h.content_type, "application/json");
    assert_eq!(
        h.pairs(),
        [("Authorization", "Bearer a"), ("X-CSRFToken", "c"), ("Content-Type", "application/json")]
    );
    let map = h.to_header_map().unwrap();
    assert_eq!(map.get("x-csrftoken").unwrap(), "c");
    assert_eq!(map.get("authorization").unwrap(), "Bearer a");
}

#[test]
fn auth_header_requires_token() {
    let (sm, _, _) = setup();
    assert_eq!(sm.auth_header(), Err(SessionError::NoToken));
    sm.set_auth_data(&TokenPair::new("tok", "r"), &user(1));
    assert_eq!(sm.auth_header().unwrap().authorization, "Bearer tok");
}

#[tokio::test]
async fn concurrent_refresh_is_single_flight() {
    let (sm, _, transport) = setup();
    let u = user(9);
    sm.set_auth_data(&TokenPair::new("a1", "r1"), &u);

    let (first, second) = tokio::join!(sm.refresh_tokens(), sm.refresh_tokens());

    assert_eq!(transport.refresh_count(), 1);
    assert_eq!(first, Ok(TokenPair::new("a2", "r2")));
    assert_eq!(first, second);
    assert_eq!(transport.last_refresh_token.lock().as_deref(), Some("r1"));
    assert_eq!(sm.token().as_deref(), Some("a2"));
    assert_eq!(sm.refresh_token().as_deref(), Some("r2"));
    assert_eq!(sm.current_user(), Some(u));
    assert!(!sm.is_refreshing());
}

#[tokio::test]
async fn concurrent_refresh_across_tasks() {
    let (sm, _, transport) = setup();
    sm.set_auth_data(&TokenPair::new("a1", "r1"), &user(9));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let sm = sm.clone();
            tokio::spawn(async move { sm.refresh_tokens().await })
        })
        .collect();
    let results = futures::future::join_all(handles).await;

    assert_eq!(transport.refresh_count(), 1);
    for r in results {
        assert_eq!(r.unwrap(), Ok(TokenPair::new("a2", "r2")));
    }
}

#[tokio::test]
async fn failed_refresh_keeps_tokens_and_allows_retry() {
    let (sm, _, transport) = setup();
    sm.set_auth_data(&TokenPair::new("a1", "r1"), &user(2));
    *transport.refresh_result.lock() = Err(SessionError::RefreshFailed("HTTP 401".into()));

    let err = sm.refresh_tokens().await.unwrap_err();
    assert_eq!(err, SessionError::RefreshFailed("HTTP 401".into()));
    assert_eq!(sm.token().as_deref(), Some("a1"));
    assert_eq!(sm.refresh_token().as_deref(), Some("r1"));
    assert!(!sm.is_refreshing());

    *transport.refresh_result.lock() = Ok(TokenPair::new("a3", "r3"));
    let pair = sm.refresh_tokens().await.unwrap();
    assert_eq!(pair, TokenPair::new("a3", "r3"));
    assert_eq!(transport.refresh_count(), 2);
    assert_eq!(sm.token().as_deref(), Some("a3"));
}

#[tokio::test]
async fn sequential_refreshes_each_hit_the_network() {
    let (sm, _, transport) = setup();
    sm.set_auth_data(&TokenPair::new("a1", "r1"), &user(2));
    sm.refresh_tokens().await.unwrap();
    sm.refresh_tokens().await.unwrap();
    assert_eq!(transport.refresh_count(), 2);
    // second attempt used the rotated refresh token
    assert_eq!(transport.last_refresh_token.lock().as_deref(), Some("r2"));
}

#[tokio::test]
async fn refresh_without_refresh_token() {
    let (sm, _, transport) = setup();
    assert_eq!(sm.refresh_tokens().await, Err(SessionError::NoRefreshToken));
    assert_eq!(transport.refresh_count(), 0);
}

#[tokio::test]
async fn refresh_without_user_discards_tokens() {
    let (sm, storage, transport) = setup();
    sm.set_auth_data(&TokenPair::new("a1", "r1"), &user(2));
    storage.remove(keys::CURRENT_USER);

    assert_eq!(sm.refresh_tokens().await, Err(SessionError::MissingUser));
    assert_eq!(transport.refresh_count(), 1);
    assert_eq!(sm.token().as_deref(), Some("a1"));
    assert_eq!(sm.refresh_token().as_deref(), Some("r1"));
}

#[tokio::test]
async fn refresh_finishing_after_relogin_leaves_new_session_alone() {
    let (sm, _, transport) = setup();
    sm.set_auth_data(&TokenPair::new("a1", "r1"), &user(1));

    let pending = {
        let sm = sm.clone();
        tokio::spawn(async move { sm.refresh_tokens().await })
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    sm.clear_auth_data();
    sm.set_auth_data(&TokenPair::new("b1", "s1"), &user(2));

    let result = pending.await.unwrap();
    assert_eq!(result, Err(SessionError::RefreshFailed("session changed during refresh".into())));
    assert_eq!(transport.refresh_count(), 1);
    assert_eq!(sm.token().as_deref(), Some("b1"));
    assert_eq!(sm.refresh_token().as_deref(), Some("s1"));
    assert_eq!(sm.current_user().map(|u| u.user_id), Some(2));
    assert!(!sm.is_refreshing());
}

#[tokio::test]
async fn cancelled_refresh_frees_the_slot() {
    let (sm, _, transport) = setup();
    sm.set_auth_data(&TokenPair::new("a1", "r1"), &user(2));

    let timed_out = tokio::time::timeout(Duration::from_millis(5), sm.refresh_tokens()).await;
    assert!(timed_out.is_err());
    assert!(!sm.is_refreshing());
    assert_eq!(sm.token().as_deref(), Some("a1"));

    let pair = sm.refresh_tokens().await.unwrap();
    assert_eq!(pair, TokenPair::new("a2", "r2"));
    assert_eq!(transport.refresh_count(), 2);
    assert_eq!(transport.last_refresh_token.lock().as_deref(), Some("r1"));
    assert!(!sm.is_refreshing());
}

#[tokio::test]
async fn csrf_fetch_stores_token() {
    let (sm, _, transport) = setup();
    let t = sm.fetch_and_store_csrf_token().await.unwrap();
    assert_eq!(t, "csrf-1");
    assert_eq!(sm.csrf_token().as_deref(), Some("csrf-1"));
    assert_eq!(transport.csrf_count(), 1);
}

#[tokio::test]
async fn csrf_failure_keeps_previous_token() {
    let (sm, _, transport) = setup();
    sm.set_csrf_token("old");
    *transport.csrf_result.lock() = Err(SessionError::CsrfAcquisition("CSRF token not found in response".into()));

    let err = sm.fetch_and_store_csrf_token().await.unwrap_err();
    assert!(matches!(err, SessionError::CsrfAcquisition(_)));
    assert_eq!(sm.csrf_token().as_deref(), Some("old"));
}

#[tokio::test]
async fn csrf_fetches_are_not_coalesced() {
    let (sm, _, transport) = setup();
    let (a, b) = tokio::join!(sm.fetch_and_store_csrf_token(), sm.fetch_and_store_csrf_token());
    assert!(a.is_ok() && b.is_ok());
    assert_eq!(transport.csrf_count(), 2);
}

#[tokio::test]
async fn fresh_auth_header_refreshes_expiring_jwt() {
    let (sm, _, transport) = setup();
    let sm = sm.with_refresh_skew(Duration::from_secs(60));
    let soon = chrono::Utc::now().timestamp() + 10;
    sm.set_auth_data(&TokenPair::new(jwt_expiring_at(soon), "r1"), &user(4));

    let h = sm.fresh_auth_header().await.unwrap();
    assert_eq!(h.authorization, "Bearer a2");
    assert_eq!(transport.refresh_count(), 1);
}

#[tokio::test]
async fn fresh_auth_header_keeps_valid_tokens() {
    let (sm, _, transport) = setup();
    let later = chrono::Utc::now().timestamp() + 3600;
    let jwt = jwt_expiring_at(later);
    sm.set_auth_data(&TokenPair::new(jwt.clone(), "r1"), &user(4));
    assert_eq!(sm.fresh_auth_header().await.unwrap().authorization, format!("Bearer {}", jwt));

    sm.set_auth_data(&TokenPair::new("opaque", "r1"), &user(4));
    assert_eq!(sm.fresh_auth_header().await.unwrap().authorization, "Bearer opaque");
    assert_eq!(transport.refresh_count(), 0);
}

#[tokio::test]
async fn fresh_auth_header_without_token() {
    let (sm, _, _) = setup();
    assert_eq!(sm.fresh_auth_header().await, Err(SessionError::NoToken));
}
