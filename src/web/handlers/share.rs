//! Share handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::activity::{Action, NewActivity, ResourceType};
use crate::share::{NewShare, Share, ShareService, ShareUpdate};
use crate::web::dto::{
    ApiResponse, CreateShareRequest, ResolvedShareResponse, ShareResponse, SharedItemResponse,
    TargetRequest, UpdateShareRequest, ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::{require_target, AppState};
use crate::web::middleware::{AuthUser, ClientIp};

fn describe_share(share: &Share) -> String {
    let target = match (share.file_id, share.folder_id) {
        (Some(id), _) => format!("file {id}"),
        (_, Some(id)) => format!("folder {id}"),
        _ => "unknown".to_string(),
    };
    let scope = if share.is_public { "public" } else { "users" };
    format!("{target} ({}, {scope})", share.permission)
}

/// POST /api/shares - Share a file or folder.
#[utoipa::path(
    post,
    path = "/shares",
    tag = "shares",
    request_body = CreateShareRequest,
    responses(
        (status = 201, description = "Share created", body = ShareResponse),
        (status = 400, description = "Neither or both of file_id and folder_id"),
        (status = 403, description = "No edit access to the target"),
        (status = 422, description = "Public shares must be view-only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_share(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    ValidatedJson(req): ValidatedJson<CreateShareRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ShareResponse>>), ApiError> {
    let target = require_target(req.file_id, req.folder_id)?;
    let saved = ShareService::new(state.db.pool())
        .create_share(
            user.id(),
            NewShare {
                target,
                permission: req.permission,
                is_public: req.is_public,
                emails: req.emails,
            },
        )
        .await?;

    state
        .record(
            NewActivity::new(user.id(), Action::CreateShare, ResourceType::Share)
                .resource(saved.share.id)
                .details(describe_share(&saved.share))
                .ip(ip),
        )
        .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(saved.into()))))
}

/// GET /api/shares - Shares on a file or folder with their access lists.
#[utoipa::path(
    get,
    path = "/shares",
    tag = "shares",
    params(TargetRequest),
    responses(
        (status = 200, description = "Shares on the target", body = Vec<ShareResponse>),
        (status = 400, description = "Neither or both of file_id and folder_id"),
        (status = 403, description = "No edit access to the target")
    ),
    security(("bearer_auth" = []))
)]
pub async fn share_details(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<TargetRequest>,
) -> Result<Json<ApiResponse<Vec<ShareResponse>>>, ApiError> {
    let target = require_target(query.file_id, query.folder_id)?;
    let shares = ShareService::new(state.db.pool())
        .share_details(user.id(), target)
        .await?;

    Ok(Json(ApiResponse::new(
        shares.into_iter().map(Into::into).collect(),
    )))
}

/// PATCH /api/shares/:id - Change permission, visibility or access list.
#[utoipa::path(
    patch,
    path = "/shares/{id}",
    tag = "shares",
    params(("id" = i64, Path, description = "Share ID")),
    request_body = UpdateShareRequest,
    responses(
        (status = 200, description = "Share updated", body = ShareResponse),
        (status = 403, description = "No edit access to the target"),
        (status = 404, description = "Share not found"),
        (status = 422, description = "Public shares must be view-only")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_share(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<UpdateShareRequest>,
) -> Result<Json<ApiResponse<ShareResponse>>, ApiError> {
    let saved = ShareService::new(state.db.pool())
        .update_share(
            user.id(),
            id,
            ShareUpdate {
                permission: req.permission,
                is_public: req.is_public,
                emails: req.emails,
            },
        )
        .await?;

    state
        .record(
            NewActivity::new(user.id(), Action::UpdateShare, ResourceType::Share)
                .resource(id)
                .details(describe_share(&saved.share))
                .ip(ip),
        )
        .await;

    Ok(Json(ApiResponse::new(saved.into())))
}

/// DELETE /api/shares/:id - Revoke a share.
#[utoipa::path(
    delete,
    path = "/shares/{id}",
    tag = "shares",
    params(("id" = i64, Path, description = "Share ID")),
    responses(
        (status = 204, description = "Share deleted"),
        (status = 403, description = "No edit access to the target"),
        (status = 404, description = "Share not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_share(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let share = ShareService::new(state.db.pool())
        .delete_share(user.id(), id)
        .await?;

    state
        .record(
            NewActivity::new(user.id(), Action::DeleteShare, ResourceType::Share)
                .resource(id)
                .details(describe_share(&share))
                .ip(ip),
        )
        .await;

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/shares/token/:token - Open a share link.
#[utoipa::path(
    get,
    path = "/shares/token/{token}",
    tag = "shares",
    params(("token" = String, Path, description = "Share token")),
    responses(
        (status = 200, description = "Shared resource", body = ResolvedShareResponse),
        (status = 403, description = "Not on the access list"),
        (status = 404, description = "Unknown token")
    ),
    security(("bearer_auth" = []))
)]
pub async fn resolve_token(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<ResolvedShareResponse>>, ApiError> {
    let resolved = ShareService::new(state.db.pool())
        .resolve_token(user.id(), &token)
        .await?;
    Ok(Json(ApiResponse::new(resolved.into())))
}

/// GET /api/shared-with-me - Items other users shared with the caller.
#[utoipa::path(
    get,
    path = "/shared-with-me",
    tag = "shares",
    responses(
        (status = 200, description = "Shared items", body = Vec<SharedItemResponse>)
    ),
    security(("bearer_auth" = []))
)]
pub async fn shared_with_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<SharedItemResponse>>>, ApiError> {
    let items = ShareService::new(state.db.pool())
        .shared_with_me(user.id())
        .await?;
    Ok(Json(ApiResponse::new(
        items.into_iter().map(Into::into).collect(),
    )))
}
