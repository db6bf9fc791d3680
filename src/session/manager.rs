use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared, WeakShared};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::ClientConfig;
use crate::error::{ConfigError, SessionError, SessionResult};
use crate::storage::{keys, FileStorage, MemoryStorage, SessionStorage};
use crate::tprintln;

use super::expiry;
use super::models::{AuthHeader, DeliveryAgentHeaders, SessionState, TokenPair, UserProfile};
use super::transport::{AuthTransport, HttpAuthTransport};

type RefreshFuture = Shared<BoxFuture<'static, SessionResult<TokenPair>>>;

/// The refresh attempt currently owning the single-flight slot. Only callers
/// hold the future strongly; once every caller is gone the attempt is dropped
/// and the slot no longer upgrades.
struct InFlight {
    attempt: u64,
    fut: WeakShared<BoxFuture<'static, SessionResult<TokenPair>>>,
}

struct Inner {
    storage: Arc<dyn SessionStorage>,
    transport: Arc<dyn AuthTransport>,
    /// Serializes multi-key writes so readers never observe half a session.
    write_lock: Mutex<()>,
    in_flight: Mutex<Option<InFlight>>,
    next_attempt: AtomicU64,
}

/// Client-side session: tokens, current user, the delivery-agent CSRF token,
/// and single-flight token refresh.
///
/// Cheap to clone; clones share the same state. Construct one per application
/// and hand it to every consumer.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
    refresh_skew: Duration,
}

impl SessionManager {
    pub fn new(storage: Arc<dyn SessionStorage>, transport: Arc<dyn AuthTransport>) -> Self {
        Self {
            inner: Arc::new(Inner {
                storage,
                transport,
                write_lock: Mutex::new(()),
                in_flight: Mutex::new(None),
                next_attempt: AtomicU64::new(1),
            }),
            refresh_skew: Duration::from_secs(30),
        }
    }

    /// Manager wired to the HTTP endpoints and the storage selected by `cfg`
    /// (session file when configured, memory otherwise).
    pub fn from_config(cfg: &ClientConfig, client: reqwest::Client) -> Result<Self, ConfigError> {
        let storage: Arc<dyn SessionStorage> = match &cfg.session_file {
            Some(path) => Arc::new(FileStorage::open(path)),
            None => Arc::new(MemoryStorage::new()),
        };
        let transport = Arc::new(HttpAuthTransport::from_config(cfg, client)?);
        Ok(Self::new(storage, transport).with_refresh_skew(cfg.refresh_skew()))
    }

    pub fn with_refresh_skew(mut self, skew: Duration) -> Self {
        self.refresh_skew = skew;
        self
    }

    // ---- session tokens and user ----

    /// Store tokens and profile as one unit. Leaves the CSRF token alone.
    pub fn set_auth_data(&self, tokens: &TokenPair, user: &UserProfile) {
        let profile = serialize_profile(user);
        let user_id = user.user_id.to_string();
        let _w = self.inner.write_lock.lock();
        self.inner.storage.set_many(&[
            (keys::TOKEN, tokens.access_token.as_str()),
            (keys::REFRESH_TOKEN, tokens.refresh_token.as_str()),
            (keys::CURRENT_USER, profile.as_str()),
            (keys::USER_ID, user_id.as_str()),
            (keys::USER_TYPE, user.user_type.as_str()),
        ]);
        tprintln!("session.set user_id={} user_type={}", user.user_id, user.user_type);
        info!(target: "session", "session established for user {}", user.user_id);
    }

    pub fn token(&self) -> Option<String> {
        self.inner.storage.get(keys::TOKEN)
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.storage.get(keys::REFRESH_TOKEN)
    }

    /// Stored profile. A corrupt stored value reads as absent.
    pub fn current_user(&self) -> Option<UserProfile> {
        let raw = self.inner.storage.get(keys::CURRENT_USER)?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(target: "session", "stored user profile is corrupt, treating as absent: {}", e);
                None
            }
        }
    }

    pub fn is_authenticated(&self) -> bool {
        let _w = self.inner.write_lock.lock();
        self.token().is_some() && self.current_user().is_some()
    }

    pub fn state(&self) -> SessionState {
        if self.is_authenticated() { SessionState::Authenticated } else { SessionState::Anonymous }
    }

    /// Logout: drop every persisted session key, CSRF token included. Idempotent.
    pub fn clear_auth_data(&self) {
        let _w = self.inner.write_lock.lock();
        self.inner.storage.remove_many(&keys::ALL);
        info!(target: "session", "session cleared");
    }

    // ---- CSRF token (delivery agents) ----

    pub fn csrf_token(&self) -> Option<String> {
        self.inner.storage.get(keys::CSRF_TOKEN)
    }

    pub fn set_csrf_token(&self, token: &str) {
        self.inner.storage.set(keys::CSRF_TOKEN, token);
    }

    /// Fetch a fresh CSRF token and store it. Every call goes to the network.
    /// On failure the previously stored token, if any, is kept.
    pub async fn fetch_and_store_csrf_token(&self) -> SessionResult<String> {
        match self.inner.transport.fetch_csrf_token().await {
            Ok(token) => {
                self.set_csrf_token(&token);
                debug!(target: "session.csrf", "stored new CSRF token");
                Ok(token)
            }
            Err(e) => {
                error!(target: "session.csrf", "Error getting CSRF token: {}", e);
                Err(e)
            }
        }
    }

    // ---- headers ----

    pub fn auth_header(&self) -> SessionResult<AuthHeader> {
        let token = self.token().ok_or(SessionError::NoToken)?;
        Ok(AuthHeader::bearer(&token))
    }

    /// Like [`auth_header`](Self::auth_header), but refreshes first when the
    /// access token is a JWT that expires within the configured skew.
    pub async fn fresh_auth_header(&self) -> SessionResult<AuthHeader> {
        let token = self.token().ok_or(SessionError::NoToken)?;
        let now = chrono::Utc::now().timestamp();
        if expiry::expires_within(&token, self.refresh_skew, now) {
            debug!(target: "session.refresh", "access token near expiry, refreshing before use");
            let pair = self.refresh_tokens().await?;
            return Ok(AuthHeader::bearer(&pair.access_token));
        }
        Ok(AuthHeader::bearer(&token))
    }

    /// `None` unless both the access token and the CSRF token are present.
    pub fn delivery_agent_headers(&self) -> Option<DeliveryAgentHeaders> {
        let token = self.token()?;
        let csrf = self.csrf_token()?;
        Some(DeliveryAgentHeaders::new(&token, &csrf))
    }

    // ---- refresh ----

    /// True while some caller is awaiting a refresh attempt. An attempt
    /// whose callers were all cancelled does not count.
    pub fn is_refreshing(&self) -> bool {
        self.inner
            .in_flight
            .lock()
            .as_ref()
            .map(|f| f.fut.upgrade().is_some())
            .unwrap_or(false)
    }

    /// Exchange the stored refresh token for a new pair.
    ///
    /// Concurrent callers share one network request and all receive its
    /// result. The in-flight slot is released once the attempt settles, so a
    /// later call after a failure starts a new attempt. If every caller is
    /// cancelled the attempt is dropped with them and the next call starts over.
    pub async fn refresh_tokens(&self) -> SessionResult<TokenPair> {
        let refresh_token = self.refresh_token().ok_or(SessionError::NoRefreshToken)?;
        let fut: RefreshFuture = {
            let mut slot = self.inner.in_flight.lock();
            let joined = slot
                .as_ref()
                .and_then(|current| current.fut.upgrade().map(|fut| (current.attempt, fut)));
            match joined {
                Some((attempt, fut)) => {
                    debug!(target: "session.refresh", "joining refresh attempt {}", attempt);
                    fut
                }
                None => {
                    let attempt = self.inner.next_attempt.fetch_add(1, Ordering::Relaxed);
                    let inner = Arc::clone(&self.inner);
                    let fut = async move {
                        let result = inner.run_refresh(attempt, &refresh_token).await;
                        inner.release_slot(attempt);
                        result
                    }
                    .boxed()
                    .shared();
                    *slot = fut.downgrade().map(|weak| InFlight { attempt, fut: weak });
                    fut
                }
            }
        };
        fut.await
    }
}

impl Inner {
    async fn run_refresh(&self, attempt: u64, refresh_token: &str) -> SessionResult<TokenPair> {
        info!(target: "session.refresh", "refresh attempt {} started", attempt);
        let pair = match self.transport.refresh(refresh_token).await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(target: "session.refresh", "refresh attempt {} failed: {}", attempt, e);
                return Err(e);
            }
        };
        self.store_rotated(&pair, refresh_token)?;
        info!(target: "session.refresh", "refresh attempt {} rotated tokens", attempt);
        Ok(pair)
    }

    /// Rewrite both tokens in place. The stored user must still be there and
    /// the stored refresh token must still be the one this attempt spent;
    /// otherwise the session changed underneath and the pair is discarded.
    fn store_rotated(&self, pair: &TokenPair, spent_refresh_token: &str) -> SessionResult<()> {
        let _w = self.write_lock.lock();
        let user_ok = self
            .storage
            .get(keys::CURRENT_USER)
            .map(|raw| serde_json::from_str::<UserProfile>(&raw).is_ok())
            .unwrap_or(false);
        if !user_ok {
            warn!(target: "session.refresh", "no current user stored; discarding refreshed tokens");
            return Err(SessionError::MissingUser);
        }
        if self.storage.get(keys::REFRESH_TOKEN).as_deref() != Some(spent_refresh_token) {
            warn!(target: "session.refresh", "session changed during refresh; discarding refreshed tokens");
            return Err(SessionError::RefreshFailed("session changed during refresh".into()));
        }
        self.storage.set_many(&[
            (keys::TOKEN, pair.access_token.as_str()),
            (keys::REFRESH_TOKEN, pair.refresh_token.as_str()),
        ]);
        Ok(())
    }

    fn release_slot(&self, attempt: u64) {
        let mut slot = self.in_flight.lock();
        if slot.as_ref().map(|f| f.attempt) == Some(attempt) {
            *slot = None;
        }
    }
}

fn serialize_profile(user: &UserProfile) -> String {
    // String keys and JSON values only, so serialization does not fail in practice
    serde_json::to_string(user).unwrap_or_else(|e| {
        error!(target: "session", "failed to serialize user profile: {}", e);
        String::new()
    })
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod session_tests;
