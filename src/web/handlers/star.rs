//! Star handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::star::StarRepository;
use crate::web::dto::{ApiResponse, ItemsResponse, StarResponse, TargetRequest, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::{require_target, AppState};
use crate::web::middleware::AuthUser;

/// GET /api/stars - The caller's starred items.
#[utoipa::path(
    get,
    path = "/stars",
    tag = "stars",
    responses(
        (status = 200, description = "Starred items", body = ItemsResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_starred(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<ItemsResponse>>, ApiError> {
    let starred = StarRepository::new(state.db.pool()).starred(user.id()).await?;
    Ok(Json(ApiResponse::new(ItemsResponse::new(
        starred.folders,
        starred.files,
    ))))
}

/// POST /api/stars - Star a file or folder.
#[utoipa::path(
    post,
    path = "/stars",
    tag = "stars",
    request_body = TargetRequest,
    responses(
        (status = 200, description = "Starred", body = StarResponse),
        (status = 400, description = "Neither or both of file_id and folder_id"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Item not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn star(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<TargetRequest>,
) -> Result<Json<ApiResponse<StarResponse>>, ApiError> {
    let target = require_target(req.file_id, req.folder_id)?;
    StarRepository::new(state.db.pool())
        .star(user.id(), target)
        .await?;
    Ok(Json(ApiResponse::new(StarResponse { starred: true })))
}

/// DELETE /api/stars - Remove a star.
#[utoipa::path(
    delete,
    path = "/stars",
    tag = "stars",
    request_body = TargetRequest,
    responses(
        (status = 200, description = "Unstarred", body = StarResponse),
        (status = 400, description = "Neither or both of file_id and folder_id")
    ),
    security(("bearer_auth" = []))
)]
pub async fn unstar(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(req): ValidatedJson<TargetRequest>,
) -> Result<Json<ApiResponse<StarResponse>>, ApiError> {
    let target = require_target(req.file_id, req.folder_id)?;
    StarRepository::new(state.db.pool())
        .unstar(user.id(), target)
        .await?;
    Ok(Json(ApiResponse::new(StarResponse { starred: false })))
}
