//! Per-IP rate limiting and client address extraction.

use axum::{
    async_trait,
    body::Body,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, Extensions, HeaderMap, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter};
use std::{convert::Infallible, net::SocketAddr, num::NonZeroU32, sync::Arc, time::Duration};

use crate::web::error::ApiError;

/// Rate limiter keyed by client IP.
pub type IpRateLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Interval between sweeps of idle limiter entries.
const CLEANUP_INTERVAL_SECS: u64 = 300;

/// Key used when no client address is known.
const UNKNOWN_CLIENT: &str = "unknown";

/// Login and general API limiters.
pub struct RateLimitState {
    login: IpRateLimiter,
    api: IpRateLimiter,
}

fn per_minute(requests: u32) -> Quota {
    Quota::per_minute(NonZeroU32::new(requests).unwrap_or(NonZeroU32::MIN))
}

impl RateLimitState {
    /// Create limiters from per-minute quotas.
    pub fn new(login_rate_limit: u32, api_rate_limit: u32) -> Self {
        Self {
            login: RateLimiter::keyed(per_minute(login_rate_limit)),
            api: RateLimiter::keyed(per_minute(api_rate_limit)),
        }
    }

    /// Check if a login attempt from `ip` is allowed.
    pub fn check_login(&self, ip: &str) -> bool {
        self.login.check_key(&ip.to_string()).is_ok()
    }

    /// Check if an API request from `ip` is allowed.
    pub fn check_api(&self, ip: &str) -> bool {
        self.api.check_key(&ip.to_string()).is_ok()
    }

    /// Drop entries whose quota has fully replenished.
    pub fn cleanup(&self) {
        self.login.retain_recent();
        self.api.retain_recent();
    }

    /// Start a background task to periodically clean up old entries.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(CLEANUP_INTERVAL_SECS));
            interval.tick().await;
            loop {
                interval.tick().await;
                self.cleanup();
            }
        });
    }
}

/// Client IP from proxy headers, falling back to the peer address.
pub fn client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<String> {
    if let Some(forwarded) = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(ip) = forwarded.split(',').next().map(str::trim) {
            if !ip.is_empty() {
                return Some(ip.to_string());
            }
        }
    }

    if let Some(real_ip) = headers.get("X-Real-IP").and_then(|v| v.to_str().ok()) {
        return Some(real_ip.trim().to_string());
    }

    extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
}

/// Extractor for the client IP recorded in activity logs.
#[derive(Debug, Clone, Default)]
pub struct ClientIp(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientIp(client_ip(&parts.headers, &parts.extensions)))
    }
}

fn request_ip(req: &Request<Body>) -> String {
    client_ip(req.headers(), req.extensions()).unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

/// Rate limiting middleware for login endpoint.
pub async fn login_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = request_ip(&req);

    if !state.check_login(&ip) {
        tracing::warn!(ip = %ip, "Login rate limit exceeded");
        return ApiError::too_many_requests("Too many login attempts. Please try again later.")
            .into_response();
    }

    next.run(req).await
}

/// Rate limiting middleware for general API.
pub async fn api_rate_limit(
    state: Arc<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ip = request_ip(&req);

    if !state.check_api(&ip) {
        tracing::warn!(ip = %ip, "API rate limit exceeded");
        return ApiError::too_many_requests("Too many requests. Please try again later.")
            .into_response();
    }

    next.run(req).await
}
