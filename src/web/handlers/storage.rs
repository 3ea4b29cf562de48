//! Storage accounting handlers.

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::accounting::{FolderBreakdown, StorageAccounting, StorageSummary};
use crate::web::dto::{ApiResponse, BreakdownQuery};
use crate::web::error::ApiError;
use crate::web::handlers::{root_alias, AppState};
use crate::web::middleware::AuthUser;

/// GET /api/storage/summary - Usage totals by type, folder and month.
#[utoipa::path(
    get,
    path = "/storage/summary",
    tag = "storage",
    responses(
        (status = 200, description = "Storage summary", content_type = "application/json"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn storage_summary(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<StorageSummary>>, ApiError> {
    let summary = StorageAccounting::new(state.db.pool(), state.limits.quota_bytes)
        .summary(user.id())
        .await?;
    Ok(Json(ApiResponse::new(summary)))
}

/// GET /api/storage/breakdown - Sizes of a folder's direct children.
#[utoipa::path(
    get,
    path = "/storage/breakdown",
    tag = "storage",
    params(BreakdownQuery),
    responses(
        (status = 200, description = "Folder breakdown", content_type = "application/json"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Folder not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn folder_breakdown(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<BreakdownQuery>,
) -> Result<Json<ApiResponse<FolderBreakdown>>, ApiError> {
    let breakdown = StorageAccounting::new(state.db.pool(), state.limits.quota_bytes)
        .folder_breakdown(user.id(), root_alias(query.folder_id))
        .await?;
    Ok(Json(ApiResponse::new(breakdown)))
}
