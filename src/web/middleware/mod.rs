//! Middleware and extractors for the web API.

pub mod auth;
pub mod cors;
pub mod rate_limit;

pub use auth::{AuthUser, JwtClaims, JwtState};
pub use cors::create_cors_layer;
pub use rate_limit::{
    api_rate_limit, client_ip, login_rate_limit, ClientIp, IpRateLimiter, RateLimitState,
};
