//! Bulk operation handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::activity::{Action, NewActivity, ResourceType};
use crate::web::dto::{
    ApiResponse, BulkDeleteRequest, BulkMoveRequest, DeleteSummaryResponse,
    FolderListingResponse, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::{root_alias, AppState};
use crate::web::middleware::{AuthUser, ClientIp};

async fn record_each(
    state: &AppState,
    user_id: i64,
    ip: &Option<String>,
    folder_ids: &[i64],
    file_ids: &[i64],
    (folder_action, file_action): (Action, Action),
    details: Option<&str>,
) {
    let items = folder_ids
        .iter()
        .map(|id| (*id, folder_action, ResourceType::Folder))
        .chain(
            file_ids
                .iter()
                .map(|id| (*id, file_action, ResourceType::File)),
        );
    for (id, action, resource_type) in items {
        let mut entry = NewActivity::new(user_id, action, resource_type)
            .resource(id)
            .ip(ip.clone());
        if let Some(details) = details {
            entry = entry.details(details);
        }
        state.record(entry).await;
    }
}

/// POST /api/bulk/delete - Delete folders and files in one transaction.
///
/// Files already in the recycle bin are accepted.
#[utoipa::path(
    post,
    path = "/bulk/delete",
    tag = "bulk",
    request_body = BulkDeleteRequest,
    responses(
        (status = 200, description = "Items deleted", body = DeleteSummaryResponse),
        (status = 400, description = "No ids given"),
        (status = 403, description = "No edit access to one of the items"),
        (status = 404, description = "One of the items does not exist")
    ),
    security(("bearer_auth" = []))
)]
pub async fn bulk_delete(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<BulkDeleteRequest>,
) -> Result<Json<ApiResponse<DeleteSummaryResponse>>, ApiError> {
    let summary = state
        .drive()
        .bulk_delete(user.id(), &req.folder_ids, &req.file_ids)
        .await?;

    record_each(
        &state,
        user.id(),
        &ip,
        &req.folder_ids,
        &req.file_ids,
        (Action::DeleteFolder, Action::DeleteFile),
        Some("bulk delete"),
    )
    .await;

    Ok(Json(ApiResponse::new(summary.into())))
}

/// POST /api/bulk/move - Move folders and files in one transaction.
///
/// Returns the destination listing after the move.
#[utoipa::path(
    post,
    path = "/bulk/move",
    tag = "bulk",
    request_body = BulkMoveRequest,
    responses(
        (status = 200, description = "Items moved", body = FolderListingResponse),
        (status = 400, description = "No ids given"),
        (status = 403, description = "No edit access or owners differ"),
        (status = 409, description = "Cycle or name collision")
    ),
    security(("bearer_auth" = []))
)]
pub async fn bulk_move(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<BulkMoveRequest>,
) -> Result<Json<ApiResponse<FolderListingResponse>>, ApiError> {
    let parent_id = root_alias(req.parent_id);
    let listing = state
        .drive()
        .bulk_move(user.id(), &req.folder_ids, &req.file_ids, parent_id)
        .await?;

    let details = format!(
        "bulk move to {}",
        parent_id.map_or_else(|| "root".to_string(), |p| p.to_string())
    );
    record_each(
        &state,
        user.id(),
        &ip,
        &req.folder_ids,
        &req.file_ids,
        (Action::MoveFolder, Action::MoveFile),
        Some(&details),
    )
    .await;

    Ok(Json(ApiResponse::new(listing.into())))
}
