//! Router configuration for Web API.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{
    activity, auth, bulk, execute, file, folder, recycle, search, share, star, storage, AppState,
};
use super::middleware::{api_rate_limit, create_cors_layer, login_rate_limit, RateLimitState};
use super::openapi::ApiDoc;

/// Multipart framing allowance on top of the file size limit.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Create the main API router.
pub fn create_router(
    app_state: Arc<AppState>,
    rate_limits: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    let login_limits = rate_limits.clone();
    let auth_routes = Router::new()
        .route(
            "/login",
            post(auth::login).route_layer(middleware::from_fn(move |req, next| {
                login_rate_limit(login_limits.clone(), req, next)
            })),
        )
        .route("/register", post(auth::register))
        .route("/me", get(auth::me))
        .route("/password", put(auth::change_password));

    let folder_routes = Router::new()
        .route("/", post(folder::create_folder))
        .route(
            "/:id",
            get(folder::get_folder)
                .patch(folder::rename_folder)
                .delete(folder::delete_folder),
        )
        .route("/:id/children", get(folder::list_children))
        .route("/:id/move", put(folder::move_folder));

    let upload_limit = usize::try_from(app_state.limits.max_upload_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let file_routes = Router::new()
        .route(
            "/",
            post(file::upload_file).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/:id",
            get(file::get_file)
                .patch(file::rename_file)
                .delete(file::delete_file),
        )
        .route("/:id/download", get(file::download_file))
        .route("/:id/move", put(file::move_file))
        .route("/:id/run", post(execute::run_file));

    let bulk_routes = Router::new()
        .route("/delete", post(bulk::bulk_delete))
        .route("/move", post(bulk::bulk_move));

    let recycle_routes = Router::new()
        .route(
            "/",
            get(recycle::list_recycle_bin).delete(recycle::empty_recycle_bin),
        )
        .route("/restore", post(recycle::restore))
        .route("/delete", post(recycle::permanent_delete));

    let share_routes = Router::new()
        .route("/", get(share::share_details).post(share::create_share))
        .route(
            "/:id",
            axum::routing::patch(share::update_share).delete(share::delete_share),
        )
        .route("/token/:token", get(share::resolve_token));

    let activity_routes = Router::new()
        .route("/", get(activity::list_activity))
        .route("/export", get(activity::export_activity))
        .route("/security", get(activity::security_highlights));

    let storage_routes = Router::new()
        .route("/summary", get(storage::storage_summary))
        .route("/breakdown", get(storage::folder_breakdown));

    let api_routes = Router::new()
        .nest("/auth", auth_routes)
        .nest("/folders", folder_routes)
        .nest("/files", file_routes)
        .nest("/bulk", bulk_routes)
        .nest("/recycle", recycle_routes)
        .nest("/shares", share_routes)
        .route("/shared-with-me", get(share::shared_with_me))
        .nest("/activity", activity_routes)
        .nest("/storage", storage_routes)
        .route("/search", get(search::search_items))
        .route(
            "/stars",
            get(star::list_starred).post(star::star).delete(star::unstar),
        );

    Router::new()
        .nest("/api", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins))
                .layer(middleware::from_fn(move |req, next| {
                    api_rate_limit(rate_limits.clone(), req, next)
                })),
        )
        .with_state(app_state)
}

/// Create a health check router.
pub fn create_health_router() -> Router {
    Router::new().route("/health", get(health_check))
}

/// Health check handler.
async fn health_check() -> &'static str {
    "OK"
}

/// Create the Swagger UI router serving the OpenAPI document.
pub fn create_swagger_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// The complete application: API, health check, Swagger UI and compression.
pub fn create_app(
    app_state: Arc<AppState>,
    rate_limits: Arc<RateLimitState>,
    cors_origins: &[String],
) -> Router {
    create_router(app_state, rate_limits, cors_origins)
        .merge(create_health_router())
        .merge(create_swagger_router())
        .layer(CompressionLayer::new())
}
