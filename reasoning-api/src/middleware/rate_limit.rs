//! Per-key fixed-window rate limiting.
//!
//! Grounded on the teacher's `governor`+`dashmap` rate limiter, but
//! reimplemented over a plain `Mutex<HashMap>` fixed window: this crate's
//! dependency stack (§10.1, per workspace `Cargo.toml`) doesn't carry
//! `governor`/`dashmap`, and a fixed window is all a single-process API
//! boundary needs.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::auth::AuthContext;
use crate::config::ApiConfig;

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub enum RateLimitKey {
    Ip(IpAddr),
    Tenant(String),
}

struct Window {
    started_at: Instant,
    count: u32,
}

#[derive(Clone)]
pub struct RateLimitState {
    config: Arc<ApiConfig>,
    windows: Arc<Mutex<HashMap<RateLimitKey, Window>>>,
}

impl RateLimitState {
    pub fn new(config: Arc<ApiConfig>) -> Self {
        Self {
            config,
            windows: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns `Err(retry_after_secs)` when `key` has exceeded its quota for
    /// the current window.
    fn check(&self, key: RateLimitKey, limit: u32) -> Result<(), u64> {
        let mut windows = self.windows.lock().expect("rate limit lock poisoned");
        let now = Instant::now();
        let entry = windows.entry(key).or_insert_with(|| Window {
            started_at: now,
            count: 0,
        });

        if now.duration_since(entry.started_at) >= self.config.rate_limit_window {
            entry.started_at = now;
            entry.count = 0;
        }

        if entry.count >= limit {
            let retry_after = self
                .config
                .rate_limit_window
                .saturating_sub(now.duration_since(entry.started_at))
                .as_secs()
                .max(1);
            return Err(retry_after);
        }

        entry.count += 1;
        Ok(())
    }
}

pub struct RateLimitError {
    pub retry_after: u64,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "code": 1003,
            "message": "rate limit exceeded",
            "data": null,
            "trace_id": null,
        });
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
        response.headers_mut().insert(
            "retry-after",
            HeaderValue::from_str(&self.retry_after.to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("60")),
        );
        response
    }
}

fn client_ip(request: &Request, fallback: SocketAddr) -> IpAddr {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|ip| ip.trim().parse().ok())
        .unwrap_or_else(|| fallback.ip())
}

pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, RateLimitError> {
    if !state.config.rate_limit_enabled {
        return Ok(next.run(request).await);
    }

    let (key, limit) = match request.extensions().get::<AuthContext>() {
        Some(auth) => (
            RateLimitKey::Tenant(auth.tenant_id.to_string()),
            state.config.rate_limit_authenticated,
        ),
        None => (
            RateLimitKey::Ip(client_ip(&request, addr)),
            state.config.rate_limit_unauthenticated,
        ),
    };

    state
        .check(key, limit)
        .map_err(|retry_after| RateLimitError { retry_after })?;

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_requests_under_the_limit() {
        let config = Arc::new(ApiConfig {
            rate_limit_window: Duration::from_secs(60),
            ..ApiConfig::default()
        });
        let state = RateLimitState::new(config);
        let key = RateLimitKey::Ip("127.0.0.1".parse().unwrap());
        assert!(state.check(key.clone(), 2).is_ok());
        assert!(state.check(key.clone(), 2).is_ok());
        assert!(state.check(key, 2).is_err());
    }
}
