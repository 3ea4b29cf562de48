//! Recycle bin handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::activity::{Action, NewActivity, ResourceType};
use crate::web::dto::{
    ApiResponse, CountResponse, DeletedFileResponse, FileIdsRequest, RestoreResponse,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::{AuthUser, ClientIp};

fn require_ids(ids: &[i64]) -> Result<(), ApiError> {
    if ids.is_empty() {
        return Err(ApiError::bad_request("file_ids must not be empty"));
    }
    Ok(())
}

/// GET /api/recycle - Files in the caller's recycle bin.
#[utoipa::path(
    get,
    path = "/recycle",
    tag = "recycle",
    responses(
        (status = 200, description = "Deleted files", body = Vec<DeletedFileResponse>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_recycle_bin(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<DeletedFileResponse>>>, ApiError> {
    let files = state.recycle_bin().list(user.id()).await?;
    Ok(Json(ApiResponse::new(
        files.into_iter().map(Into::into).collect(),
    )))
}

/// POST /api/recycle/restore - Restore files to their original folders.
#[utoipa::path(
    post,
    path = "/recycle/restore",
    tag = "recycle",
    request_body = FileIdsRequest,
    responses(
        (status = 200, description = "Restore result", body = RestoreResponse),
        (status = 400, description = "No ids given")
    ),
    security(("bearer_auth" = []))
)]
pub async fn restore(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<FileIdsRequest>,
) -> Result<Json<ApiResponse<RestoreResponse>>, ApiError> {
    require_ids(&req.file_ids)?;
    let summary = state.recycle_bin().restore(user.id(), &req.file_ids).await?;

    for id in &summary.restored {
        state
            .record(
                NewActivity::new(user.id(), Action::RestoreFile, ResourceType::File)
                    .resource(*id)
                    .ip(ip.clone()),
            )
            .await;
    }

    Ok(Json(ApiResponse::new(summary.into())))
}

/// POST /api/recycle/delete - Permanently delete files from the bin.
#[utoipa::path(
    post,
    path = "/recycle/delete",
    tag = "recycle",
    request_body = FileIdsRequest,
    responses(
        (status = 200, description = "Number of files removed", body = CountResponse),
        (status = 400, description = "No ids given")
    ),
    security(("bearer_auth" = []))
)]
pub async fn permanent_delete(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<FileIdsRequest>,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    require_ids(&req.file_ids)?;
    let count = state
        .recycle_bin()
        .permanent_delete(user.id(), &req.file_ids)
        .await?;

    if count > 0 {
        state
            .record(
                NewActivity::new(user.id(), Action::PermanentDelete, ResourceType::File)
                    .details(format!("{count} files permanently deleted"))
                    .ip(ip),
            )
            .await;
    }

    Ok(Json(ApiResponse::new(CountResponse { count })))
}

/// DELETE /api/recycle - Empty the recycle bin.
#[utoipa::path(
    delete,
    path = "/recycle",
    tag = "recycle",
    responses(
        (status = 200, description = "Number of files removed", body = CountResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn empty_recycle_bin(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
) -> Result<Json<ApiResponse<CountResponse>>, ApiError> {
    let count = state.recycle_bin().empty(user.id()).await?;

    if count > 0 {
        state
            .record(
                NewActivity::new(user.id(), Action::PermanentDelete, ResourceType::File)
                    .details(format!("recycle bin emptied ({count} files)"))
                    .ip(ip),
            )
            .await;
    }

    Ok(Json(ApiResponse::new(CountResponse { count })))
}
