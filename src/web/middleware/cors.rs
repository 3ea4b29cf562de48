//! CORS configuration.

use axum::http::header::{
    ACCEPT, AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, ETAG, IF_NONE_MATCH,
};
use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

const METHODS: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Create a CORS layer for the configured origins.
///
/// With no valid origins every origin is allowed without credentials.
/// Download headers are exposed so browsers can read the file name.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let parsed_origins: Vec<HeaderValue> =
        origins.iter().filter_map(|o| o.parse().ok()).collect();

    let layer = CorsLayer::new()
        .allow_methods(METHODS)
        .expose_headers([CONTENT_DISPOSITION, ETAG]);

    if parsed_origins.is_empty() {
        layer.allow_headers(Any).allow_origin(Any)
    } else {
        layer
            .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT, IF_NONE_MATCH])
            .allow_credentials(true)
            .allow_origin(parsed_origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, routing::get, Router};
    use tower::util::ServiceExt;

    async fn preflight(origins: &[String], origin: &str) -> Option<String> {
        let app = Router::new()
            .route("/", get(|| async { "OK" }))
            .layer(create_cors_layer(origins));
        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/")
                    .header("Origin", origin)
                    .header("Access-Control-Request-Method", "GET")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        response
            .headers()
            .get("access-control-allow-origin")
            .map(|v| v.to_str().unwrap().to_string())
    }

    #[tokio::test]
    async fn test_any_origin_without_config() {
        assert_eq!(preflight(&[], "http://a.test").await.as_deref(), Some("*"));
    }

    #[tokio::test]
    async fn test_configured_origins() {
        let origins = vec!["http://localhost:3000".to_string()];
        assert_eq!(
            preflight(&origins, "http://localhost:3000").await.as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(preflight(&origins, "http://evil.test").await, None);
    }
}
