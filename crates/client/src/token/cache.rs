//! Keyed session token cache with singleflight de-duplication
//!
//! Cache entries are keyed by session id plus an optional template name. The
//! in-flight map guarantees that for any number of concurrent callers sharing
//! a cache key, exactly one network fetch occurs; everyone else awaits the
//! same shared handle. Fetches run on spawned tasks, so a caller that drops
//! its waiter detaches without cancelling the work for the others.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clasp_domain::{Error, Result, SessionToken, TokenResponse};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::http::RequestDescriptor;
use crate::pipeline::RequestExecutor;

use super::jwt;

/// Fallback lifetime when the JWT carries no `exp` claim.
const DEFAULT_TOKEN_TTL_SECS: i64 = 60;

type SharedFetch = Shared<BoxFuture<'static, Result<SessionToken>>>;

/// Options for one token retrieval
#[derive(Debug, Clone, Default)]
pub struct GetTokenOptions {
    /// Named token template; scopes the cache key
    pub template: Option<String>,

    /// Bypass the cache read and force a network fetch
    pub skip_cache: bool,

    /// Minimum remaining lifetime for a cache hit; falls back to the
    /// configured default when `None`
    pub expiration_buffer: Option<Duration>,
}

/// TTL-based session token cache with per-key singleflight
pub struct TokenCache {
    executor: Arc<RequestExecutor>,
    entries: Arc<Mutex<HashMap<String, SessionToken>>>,
    in_flight: Arc<Mutex<HashMap<String, SharedFetch>>>,
    default_buffer: Duration,
}

impl TokenCache {
    /// Create a cache backed by the given executor.
    #[must_use]
    pub fn new(executor: Arc<RequestExecutor>, default_buffer: Duration) -> Self {
        Self {
            executor,
            entries: Arc::new(Mutex::new(HashMap::new())),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            default_buffer,
        }
    }

    fn cache_key(session_id: &str, template: Option<&str>) -> String {
        match template {
            Some(template) => format!("{session_id}-{template}"),
            None => session_id.to_string(),
        }
    }

    /// Retrieve a session token, from cache when fresh enough, otherwise via
    /// a de-duplicated network fetch.
    ///
    /// A cache read never returns an entry whose remaining lifetime is below
    /// the expiration buffer.
    ///
    /// # Errors
    /// Propagates the shared fetch outcome; every concurrent caller for the
    /// same key observes the same result or error.
    pub async fn get_token(
        &self,
        session_id: &str,
        options: GetTokenOptions,
    ) -> Result<SessionToken> {
        let key = Self::cache_key(session_id, options.template.as_deref());

        let shared = {
            // check-then-register must be atomic with respect to concurrent
            // callers for the same key
            let mut in_flight = self.in_flight.lock().await;
            match in_flight.get(&key) {
                Some(existing) => {
                    debug!(%key, "joining in-flight token fetch");
                    existing.clone()
                }
                None => {
                    let fetch = self.spawn_fetch(key.clone(), session_id.to_string(), options);
                    in_flight.insert(key, fetch.clone());
                    fetch
                }
            }
        };

        shared.await
    }

    fn spawn_fetch(
        &self,
        key: String,
        session_id: String,
        options: GetTokenOptions,
    ) -> SharedFetch {
        let executor = Arc::clone(&self.executor);
        let entries = Arc::clone(&self.entries);
        let in_flight = Arc::clone(&self.in_flight);
        let buffer = options.expiration_buffer.unwrap_or(self.default_buffer);

        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = Self::resolve(
                &executor,
                &entries,
                &task_key,
                &session_id,
                options.template.as_deref(),
                options.skip_cache,
                buffer,
            )
            .await;

            // The slot is cleared before any waiter observes the result, so a
            // call issued right after completion starts a fresh check instead
            // of reusing a stale in-flight reference.
            in_flight.lock().await.remove(&task_key);
            result
        });

        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => Err(Error::Transport(format!("token fetch task failed: {e}"))),
            }
        }
        .boxed()
        .shared()
    }

    async fn resolve(
        executor: &RequestExecutor,
        entries: &Mutex<HashMap<String, SessionToken>>,
        key: &str,
        session_id: &str,
        template: Option<&str>,
        skip_cache: bool,
        buffer: Duration,
    ) -> Result<SessionToken> {
        if !skip_cache {
            let cached = entries.lock().await.get(key).cloned();
            if let Some(token) = cached {
                if !token.is_expired(buffer.as_secs() as i64) {
                    debug!(%key, "token cache hit");
                    return Ok(token);
                }
                debug!(%key, "cached token within expiration buffer, refetching");
            }
        }

        let path = match template {
            Some(template) => format!("/v1/client/sessions/{session_id}/tokens/{template}"),
            None => format!("/v1/client/sessions/{session_id}/tokens"),
        };
        let descriptor = RequestDescriptor::post(path);
        let response: TokenResponse = executor.send(&descriptor).await.map_err(|e| {
            warn!(%key, error = %e, "token fetch failed");
            e
        })?;

        let expires_at = jwt::expiry(&response.jwt)
            .or_else(|| Some(Utc::now() + chrono::Duration::seconds(DEFAULT_TOKEN_TTL_SECS)));
        let token = SessionToken::new(response.jwt, expires_at);

        entries.lock().await.insert(key.to_string(), token.clone());
        info!(%key, expires_in = ?token.seconds_until_expiry(), "fetched session token");
        Ok(token)
    }
}
