//! HTTP API for the drive.
//!
//! All endpoints live under `/api` and answer JSON wrapped in `{"data": ...}`.
//! `/health` and the Swagger UI sit outside the API prefix.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use middleware::RateLimitState;
pub use router::{create_app, create_router};
pub use server::WebServer;
