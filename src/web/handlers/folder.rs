//! Folder handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::activity::{Action, NewActivity, ResourceType};
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, DeleteSummaryResponse, FolderDetailResponse,
    FolderListingResponse, FolderResponse, MoveFolderRequest, RenameRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::{root_alias, AppState};
use crate::web::middleware::{AuthUser, ClientIp};

/// POST /api/folders - Create a folder.
#[utoipa::path(
    post,
    path = "/folders",
    tag = "folders",
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = FolderResponse),
        (status = 403, description = "No edit access to the parent"),
        (status = 404, description = "Parent not found"),
        (status = 409, description = "A sibling folder has the same name")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<FolderResponse>>), ApiError> {
    let folder = state
        .drive()
        .create_folder(user.id(), &req.name, root_alias(req.parent_id))
        .await?;

    state
        .record(
            NewActivity::new(user.id(), Action::CreateFolder, ResourceType::Folder)
                .resource(folder.id)
                .details(folder.name.clone())
                .ip(ip),
        )
        .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(folder.into()))))
}

/// GET /api/folders/:id - Folder details with breadcrumb path.
#[utoipa::path(
    get,
    path = "/folders/{id}",
    tag = "folders",
    params(("id" = i64, Path, description = "Folder ID")),
    responses(
        (status = 200, description = "Folder details", body = FolderDetailResponse),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Folder not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_folder(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<FolderDetailResponse>>, ApiError> {
    let (folder, path) = state.drive().get_folder(user.id(), id).await?;

    Ok(Json(ApiResponse::new(FolderDetailResponse {
        folder: folder.into(),
        path: path.into_iter().map(Into::into).collect(),
    })))
}

/// GET /api/folders/:id/children - List subfolders and live files.
///
/// `0` lists the caller's root.
#[utoipa::path(
    get,
    path = "/folders/{id}/children",
    tag = "folders",
    params(("id" = i64, Path, description = "Folder ID, 0 for the root")),
    responses(
        (status = 200, description = "Folder contents", body = FolderListingResponse),
        (status = 403, description = "Access denied"),
        (status = 404, description = "Folder not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_children(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<FolderListingResponse>>, ApiError> {
    let listing = state
        .drive()
        .list_children(user.id(), root_alias(Some(id)))
        .await?;
    Ok(Json(ApiResponse::new(listing.into())))
}

/// PATCH /api/folders/:id - Rename a folder.
#[utoipa::path(
    patch,
    path = "/folders/{id}",
    tag = "folders",
    params(("id" = i64, Path, description = "Folder ID")),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Folder renamed", body = FolderResponse),
        (status = 403, description = "No edit access"),
        (status = 409, description = "A sibling folder has the same name")
    ),
    security(("bearer_auth" = []))
)]
pub async fn rename_folder(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RenameRequest>,
) -> Result<Json<ApiResponse<FolderResponse>>, ApiError> {
    let folder = state.drive().rename_folder(user.id(), id, &req.name).await?;

    state
        .record(
            NewActivity::new(user.id(), Action::RenameFolder, ResourceType::Folder)
                .resource(id)
                .details(folder.name.clone())
                .ip(ip),
        )
        .await;

    Ok(Json(ApiResponse::new(folder.into())))
}

/// PUT /api/folders/:id/move - Move a folder under a new parent.
#[utoipa::path(
    put,
    path = "/folders/{id}/move",
    tag = "folders",
    params(("id" = i64, Path, description = "Folder ID")),
    request_body = MoveFolderRequest,
    responses(
        (status = 200, description = "Folder moved", body = FolderResponse),
        (status = 403, description = "Only the owner can move a folder"),
        (status = 409, description = "Cycle or name collision at the destination")
    ),
    security(("bearer_auth" = []))
)]
pub async fn move_folder(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<MoveFolderRequest>,
) -> Result<Json<ApiResponse<FolderResponse>>, ApiError> {
    let parent_id = root_alias(req.parent_id);
    let folder = state.drive().move_folder(user.id(), id, parent_id).await?;

    let destination = parent_id.map_or_else(|| "root".to_string(), |p| p.to_string());
    state
        .record(
            NewActivity::new(user.id(), Action::MoveFolder, ResourceType::Folder)
                .resource(id)
                .details(format!("moved to {destination}"))
                .ip(ip),
        )
        .await;

    Ok(Json(ApiResponse::new(folder.into())))
}

/// DELETE /api/folders/:id - Delete a folder; its files go to the recycle bin.
#[utoipa::path(
    delete,
    path = "/folders/{id}",
    tag = "folders",
    params(("id" = i64, Path, description = "Folder ID")),
    responses(
        (status = 200, description = "Folder deleted", body = DeleteSummaryResponse),
        (status = 403, description = "No edit access"),
        (status = 404, description = "Folder not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<DeleteSummaryResponse>>, ApiError> {
    let summary = state.drive().delete_folder(user.id(), id).await?;

    state
        .record(
            NewActivity::new(user.id(), Action::DeleteFolder, ResourceType::Folder)
                .resource(id)
                .details(format!("{} files recycled", summary.files_recycled))
                .ip(ip),
        )
        .await;

    Ok(Json(ApiResponse::new(summary.into())))
}
