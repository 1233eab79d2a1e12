//! Fixed-window rate limiting
//!
//! Every client gets `max_requests` per window; windows are aligned to the
//! Unix epoch, so all counters reset together at `window_start + window`.
//! The client key is the peer address (`"unknown"` without `ConnectInfo`).
//! Behind a reverse proxy, `TRUST_PROXY=true` keys on the first
//! `X-Forwarded-For` address instead; the header is ignored otherwise since
//! any client can set it.
//!
//! # Backends
//!
//! - [`MemoryRateLimitStore`]: process-local counters (default)
//! - [`RedisRateLimitStore`]: `INCR` + `EXPIRE` on `ratelimit:{client}:{window}`
//!   keys, shared by every instance pointing at the same Redis
//!
//! # Headers
//!
//! Every response carries:
//! - `X-RateLimit-Limit`: requests allowed per window
//! - `X-RateLimit-Remaining`: requests left in the current window
//! - `X-RateLimit-Reset`: Unix timestamp when the window resets
//! - `Retry-After`: seconds to wait (429 responses only)

use crate::app::AppState;
use crate::config::RateLimitSettings;
use crate::error::ApiError;
use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::Mutex;

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

/// Memory backend prunes expired windows once it tracks this many clients
const PRUNE_THRESHOLD: usize = 10_000;

/// Rate limit configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests allowed in the window
    pub max_requests: u64,

    pub window: Duration,

    /// Key clients on `X-Forwarded-For` (set by a trusted proxy)
    pub trust_proxy: bool,
}

impl RateLimitConfig {
    pub fn new(max_requests: u64, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            trust_proxy: false,
        }
    }

    pub fn with_trust_proxy(mut self, trust_proxy: bool) -> Self {
        self.trust_proxy = trust_proxy;
        self
    }

    fn window_secs(&self) -> u64 {
        self.window.as_secs().max(1)
    }

    /// Start of the window containing `now` (Unix seconds)
    pub fn window_start(&self, now: u64) -> u64 {
        now - now % self.window_secs()
    }
}

/// Outcome of counting one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,

    /// Unix timestamp when the current window ends
    pub reset_at: u64,

    /// Seconds until `reset_at`
    pub retry_after: u64,
}

impl RateLimitDecision {
    /// Decision for the `count`-th request of the window starting at `window_start`
    pub fn from_count(config: &RateLimitConfig, count: u64, window_start: u64, now: u64) -> Self {
        let reset_at = window_start + config.window_secs();
        Self {
            allowed: count <= config.max_requests,
            limit: config.max_requests,
            remaining: config.max_requests.saturating_sub(count),
            reset_at,
            retry_after: reset_at.saturating_sub(now).max(1),
        }
    }

    fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(self.limit));
        headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(self.remaining));
        headers.insert(X_RATELIMIT_RESET, HeaderValue::from(self.reset_at));
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Counter storage for the fixed-window limiter
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Increments the counter of `key` in the window starting at `window_start`
    /// and returns the new count
    async fn increment(
        &self,
        key: &str,
        window_start: u64,
        window: Duration,
    ) -> Result<u64, RateLimitError>;

    fn backend_name(&self) -> &'static str;
}

#[derive(Default)]
pub struct MemoryRateLimitStore {
    /// client key -> (window start, count)
    windows: Mutex<HashMap<String, (u64, u64)>>,
}

#[async_trait]
impl RateLimitStore for MemoryRateLimitStore {
    async fn increment(
        &self,
        key: &str,
        window_start: u64,
        _window: Duration,
    ) -> Result<u64, RateLimitError> {
        let mut windows = self.windows.lock().await;

        if windows.len() >= PRUNE_THRESHOLD {
            windows.retain(|_, (start, _)| *start >= window_start);
        }

        let entry = windows.entry(key.to_string()).or_insert((window_start, 0));
        if entry.0 != window_start {
            *entry = (window_start, 0);
        }
        entry.1 += 1;
        Ok(entry.1)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

pub struct RedisRateLimitStore {
    manager: ConnectionManager,
}

impl RedisRateLimitStore {
    pub async fn connect(url: &str) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl RateLimitStore for RedisRateLimitStore {
    async fn increment(
        &self,
        key: &str,
        window_start: u64,
        window: Duration,
    ) -> Result<u64, RateLimitError> {
        let mut conn = self.manager.clone();
        let window_key = format!("ratelimit:{}:{}", key, window_start);

        let count: u64 = conn.incr(&window_key, 1_u64).await?;
        if count == 1 {
            let _: i64 = redis::cmd("EXPIRE")
                .arg(&window_key)
                .arg(window.as_secs().max(1))
                .query_async(&mut conn)
                .await?;
        }
        Ok(count)
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}

/// Limiter shared through [`AppState`]
pub struct RateLimiter {
    config: RateLimitConfig,
    store: Box<dyn RateLimitStore>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, store: Box<dyn RateLimitStore>) -> Self {
        Self { config, store }
    }

    pub fn in_memory(config: RateLimitConfig) -> Self {
        Self::new(config, Box::<MemoryRateLimitStore>::default())
    }

    /// Uses Redis when `REDIS_URL` is configured
    pub async fn from_settings(settings: &RateLimitSettings) -> Result<Self, RateLimitError> {
        let config = RateLimitConfig::new(settings.max_requests, settings.window_secs)
            .with_trust_proxy(settings.trust_proxy);
        match &settings.redis_url {
            Some(url) => Ok(Self::new(
                config,
                Box::new(RedisRateLimitStore::connect(url).await?),
            )),
            None => Ok(Self::in_memory(config)),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Counts one request from `client` at `now` (Unix seconds)
    ///
    /// A backend failure lets the request through.
    pub async fn check_at(&self, client: &str, now: u64) -> RateLimitDecision {
        let window_start = self.config.window_start(now);
        let count = match self
            .store
            .increment(client, window_start, self.config.window)
            .await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backend = self.backend_name(),
                    "Rate limit check failed, allowing request"
                );
                0
            }
        };
        RateLimitDecision::from_count(&self.config, count, window_start, now)
    }

    pub async fn check(&self, client: &str) -> RateLimitDecision {
        let now = u64::try_from(chrono::Utc::now().timestamp()).unwrap_or_default();
        self.check_at(client, now).await
    }
}

/// Peer address, or the first `X-Forwarded-For` entry when `trust_proxy`
/// is set; `"unknown"` when neither is available
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>, trust_proxy: bool) -> String {
    let forwarded = || {
        headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    trust_proxy
        .then(forwarded)
        .flatten()
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Rate limiting middleware applied to every route
pub async fn rate_limit_layer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let trust_proxy = state.rate_limiter.config().trust_proxy;
    let client = client_key(request.headers(), peer, trust_proxy);

    let decision = state.rate_limiter.check(&client).await;

    let mut response = if decision.allowed {
        next.run(request).await
    } else {
        tracing::warn!(
            client = %client,
            retry_after = decision.retry_after,
            "Rate limit exceeded"
        );
        ApiError::RateLimitExceeded {
            retry_after: decision.retry_after,
            message: "Too many requests from this client, please try again later".to_string(),
        }
        .into_response()
    };

    decision.apply_headers(response.headers_mut());
    response
}
