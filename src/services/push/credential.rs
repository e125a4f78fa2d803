//! Bearer credential caching with single-flight refresh.
//!
//! [`CredentialCache`] is the only shared mutable state of the dispatch
//! core. A refresh runs on its own spawned task and is shared by every
//! caller that needs a token while it is in flight, so a caller that stops
//! waiting never cancels the refresh for the others.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use jiff::{SignedDuration, Timestamp};
use thiserror::Error;

/// A short-lived access token and the instant it stops being accepted.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerCredential {
    token: String,
    expires_at: Timestamp,
}

impl BearerCredential {
    pub fn new(token: impl Into<String>, expires_at: Timestamp) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn expires_at(&self) -> Timestamp {
        self.expires_at
    }

    pub fn remaining_at(&self, now: Timestamp) -> SignedDuration {
        self.expires_at.duration_since(now)
    }

    /// True when the token is non-empty and outlives `now + margin`.
    pub fn is_valid_at(&self, now: Timestamp, margin: Duration) -> bool {
        let margin = SignedDuration::try_from(margin).unwrap_or(SignedDuration::MAX);
        !self.token.trim().is_empty() && self.remaining_at(now) > margin
    }
}

impl fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BearerCredential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    #[error("credential source unreachable: {0}")]
    Unreachable(String),

    #[error("credential source refused the request: {0}")]
    Rejected(String),

    #[error("credential source returned an unusable token: {0}")]
    InvalidToken(String),

    #[error("credential refresh timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("credential refresh task failed: {0}")]
    Aborted(String),
}

/// Issues fresh bearer credentials.
#[async_trait]
pub trait CredentialSource: Send + Sync {
    async fn refresh(&self) -> Result<BearerCredential, CredentialError>;

    /// Short identifier for logs and health output
    fn name(&self) -> &'static str;
}

/// Re-issues one configured token with a fixed lifetime on every refresh.
pub struct StaticTokenSource {
    token: String,
    ttl: Duration,
}

impl StaticTokenSource {
    pub fn new(token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            token: token.into(),
            ttl,
        }
    }
}

#[async_trait]
impl CredentialSource for StaticTokenSource {
    async fn refresh(&self) -> Result<BearerCredential, CredentialError> {
        let ttl = SignedDuration::try_from(self.ttl)
            .map_err(|e| CredentialError::InvalidToken(e.to_string()))?;
        let expires_at = Timestamp::now()
            .checked_add(ttl)
            .map_err(|e| CredentialError::InvalidToken(e.to_string()))?;
        Ok(BearerCredential::new(self.token.clone(), expires_at))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    /// Minimum remaining lifetime of a token handed out by the cache
    pub safety_margin: Duration,
    /// Upper bound on one call to the credential source
    pub refresh_timeout: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            safety_margin: Duration::from_secs(60),
            refresh_timeout: Duration::from_secs(10),
        }
    }
}

type RefreshFuture = Shared<BoxFuture<'static, Result<BearerCredential, CredentialError>>>;

/// At most one of `credential` and `inflight` is set: a refresh starts only
/// once the cached credential is gone and stores its result when it ends.
#[derive(Default)]
struct CacheState {
    credential: Option<BearerCredential>,
    inflight: Option<RefreshFuture>,
}

struct Inner {
    source: Arc<dyn CredentialSource>,
    state: Mutex<CacheState>,
    options: CacheOptions,
    refreshes: AtomicU64,
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, CacheState> {
        // No code path panics while holding the lock, so the state is intact
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn check(&self, credential: BearerCredential) -> Result<BearerCredential, CredentialError> {
        if credential.token().trim().is_empty() {
            return Err(CredentialError::InvalidToken("empty token".to_string()));
        }
        if !credential.is_valid_at(Timestamp::now(), self.options.safety_margin) {
            return Err(CredentialError::InvalidToken(format!(
                "token expires at {}, inside the {}s safety margin",
                credential.expires_at(),
                self.options.safety_margin.as_secs()
            )));
        }
        Ok(credential)
    }

    fn complete(&self, result: &Result<BearerCredential, CredentialError>) {
        let mut state = self.lock_state();
        state.inflight = None;
        if let Ok(credential) = result {
            state.credential = Some(credential.clone());
        }
    }
}

/// Caches one [`BearerCredential`] and refreshes it on demand.
///
/// Cloning is cheap and clones share the cached value.
#[derive(Clone)]
pub struct CredentialCache {
    inner: Arc<Inner>,
}

impl CredentialCache {
    pub fn new(source: Arc<dyn CredentialSource>, options: CacheOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                state: Mutex::new(CacheState::default()),
                options,
                refreshes: AtomicU64::new(0),
            }),
        }
    }

    /// Returns a credential valid beyond the safety margin, refreshing if needed.
    ///
    /// At most one refresh is in flight; concurrent callers await the same
    /// one. Failures are returned to every waiter and never cached.
    pub async fn get_valid_token(&self) -> Result<BearerCredential, CredentialError> {
        let refresh = {
            let mut state = self.inner.lock_state();

            if let Some(credential) = state
                .credential
                .as_ref()
                .filter(|c| c.is_valid_at(Timestamp::now(), self.inner.options.safety_margin))
            {
                return Ok(credential.clone());
            }

            match state.inflight {
                Some(ref inflight) => inflight.clone(),
                None => {
                    state.credential = None;
                    let refresh = self.spawn_refresh();
                    state.inflight = Some(refresh.clone());
                    refresh
                }
            }
        };

        refresh.await
    }

    /// Drops the cached credential; the next call refreshes.
    ///
    /// A refresh already in flight is left alone and its result is stored.
    pub fn invalidate(&self) {
        self.inner.lock_state().credential = None;
        tracing::debug!(
            source = self.inner.source.name(),
            "Credential cache invalidated"
        );
    }

    /// Drops the cached credential only if it is `rejected`.
    ///
    /// Many sends can be refused with the same stale credential; only the
    /// first one clears it, so they all share the single refresh that
    /// follows. A newer credential or a refresh in flight is kept.
    /// Returns whether the cache was cleared.
    pub fn invalidate_if_current(&self, rejected: &BearerCredential) -> bool {
        let mut state = self.inner.lock_state();
        if state.credential.as_ref() != Some(rejected) {
            return false;
        }
        state.credential = None;
        tracing::debug!(
            source = self.inner.source.name(),
            expires_at = %rejected.expires_at(),
            "Rejected credential dropped from cache"
        );
        true
    }

    /// The cached credential if it is currently valid; never refreshes.
    pub fn peek(&self) -> Option<BearerCredential> {
        self.inner
            .lock_state()
            .credential
            .clone()
            .filter(|c| c.is_valid_at(Timestamp::now(), self.inner.options.safety_margin))
    }

    /// Number of refreshes started since construction
    pub fn refresh_count(&self) -> u64 {
        self.inner.refreshes.load(Ordering::Relaxed)
    }

    pub fn source_name(&self) -> &'static str {
        self.inner.source.name()
    }

    fn spawn_refresh(&self) -> RefreshFuture {
        let inner = Arc::clone(&self.inner);
        let owner = Arc::clone(&self.inner);

        let task = tokio::spawn(async move {
            inner.refreshes.fetch_add(1, Ordering::Relaxed);
            let timeout = inner.options.refresh_timeout;
            tracing::debug!(source = inner.source.name(), "Refreshing credential");

            let result = match tokio::time::timeout(timeout, inner.source.refresh()).await {
                Ok(Ok(credential)) => inner.check(credential),
                Ok(Err(e)) => Err(e),
                Err(_) => Err(CredentialError::Timeout(timeout)),
            };

            match &result {
                Ok(credential) => tracing::info!(
                    source = inner.source.name(),
                    expires_at = %credential.expires_at(),
                    "Credential refreshed"
                ),
                Err(e) => tracing::warn!(
                    source = inner.source.name(),
                    error = %e,
                    "Credential refresh failed"
                ),
            }

            inner.complete(&result);
            result
        });

        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    // The task never reached `complete`
                    let result = Err(CredentialError::Aborted(e.to_string()));
                    owner.complete(&result);
                    result
                }
            }
        }
        .boxed()
        .shared()
    }
}
