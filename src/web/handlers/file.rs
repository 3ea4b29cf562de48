//! File handlers.

use axum::{
    body::Body,
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::activity::{Action, NewActivity, ResourceType};
use crate::web::dto::{
    ApiResponse, FileDeleteResponse, FileResponse, MoveFolderRequest, RenameRequest,
    ValidatedJson,
};
use crate::web::error::ApiError;
use crate::web::handlers::{root_alias, AppState};
use crate::web::middleware::{AuthUser, ClientIp};

/// Build a Content-Disposition value for a download.
///
/// Control characters, quotes and backslashes are removed from the plain
/// `filename` parameter; non-ASCII names also get an RFC 5987 `filename*`.
pub fn content_disposition_header(filename: &str) -> String {
    let plain = filename.is_ascii()
        && !filename
            .chars()
            .any(|c| c.is_control() || c == '"' || c == '\\');
    if plain {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            c if !c.is_ascii() => '_',
            c => c,
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}

/// Quoted entity tag for a checksum.
pub fn etag(checksum: &str) -> String {
    format!("\"{}\"", checksum)
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("File exceeds the upload size limit");
    }
    tracing::debug!("Failed to read multipart data: {}", e);
    ApiError::bad_request("Invalid multipart data")
}

/// POST /api/files - Upload a file.
///
/// Request body: multipart/form-data with a "file" field and an optional
/// "folder_id" field (0 or absent for the root).
#[utoipa::path(
    post,
    path = "/files",
    tag = "files",
    responses(
        (status = 201, description = "File uploaded", body = FileResponse),
        (status = 400, description = "Missing file or invalid multipart data"),
        (status = 403, description = "No edit access to the folder"),
        (status = 409, description = "A live file with the same name exists"),
        (status = 413, description = "File too large or quota exceeded")
    ),
    security(("bearer_auth" = []))
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>), ApiError> {
    let mut folder_id: Option<i64> = None;
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name().unwrap_or("") {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let content = field.bytes().await.map_err(multipart_error)?;
                upload = Some((filename, content.to_vec()));
            }
            "folder_id" => {
                let text = field.text().await.map_err(multipart_error)?;
                let text = text.trim();
                if !text.is_empty() {
                    let id = text
                        .parse::<i64>()
                        .map_err(|_| ApiError::bad_request("folder_id must be an integer"))?;
                    folder_id = Some(id);
                }
            }
            _ => {}
        }
    }

    let (filename, content) = upload.ok_or_else(|| ApiError::bad_request("No file provided"))?;
    if filename.trim().is_empty() {
        return Err(ApiError::bad_request("File name is required"));
    }

    let file = state
        .drive()
        .upload_file(user.id(), root_alias(folder_id), &filename, &content)
        .await?;

    state
        .record(
            NewActivity::new(user.id(), Action::UploadFile, ResourceType::File)
                .resource(file.id)
                .details(format!("{} ({} bytes)", file.name, file.size))
                .ip(ip),
        )
        .await;

    Ok((StatusCode::CREATED, Json(ApiResponse::new(file.into()))))
}

/// GET /api/files/:id - File metadata.
#[utoipa::path(
    get,
    path = "/files/{id}",
    tag = "files",
    params(("id" = i64, Path, description = "File ID")),
    responses(
        (status = 200, description = "File metadata", body = FileResponse),
        (status = 403, description = "Access denied"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.drive().get_file(user.id(), id).await?;
    Ok(Json(ApiResponse::new(file.into())))
}

/// GET /api/files/:id/download - Download file content.
///
/// Answers `304 Not Modified` when `If-None-Match` carries the current ETag.
#[utoipa::path(
    get,
    path = "/files/{id}/download",
    tag = "files",
    params(("id" = i64, Path, description = "File ID")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 304, description = "Not modified"),
        (status = 403, description = "Access denied"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Response<Body>, ApiError> {
    let drive = state.drive();
    let file = drive.get_file(user.id(), id).await?;
    let tag = etag(&file.checksum);

    let not_modified = headers
        .get(header::IF_NONE_MATCH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.split(',').any(|candidate| candidate.trim() == tag));
    if not_modified {
        return Response::builder()
            .status(StatusCode::NOT_MODIFIED)
            .header(header::ETAG, tag)
            .body(Body::empty())
            .map_err(|e| {
                tracing::error!("Failed to build response: {}", e);
                ApiError::internal("Failed to build response")
            });
    }

    let content = drive.storage().load(&file.stored_name)?;

    state
        .record(
            NewActivity::new(user.id(), Action::DownloadFile, ResourceType::File)
                .resource(file.id)
                .details(file.name.clone())
                .ip(ip),
        )
        .await;

    Response::builder()
        .header(header::CONTENT_TYPE, file.mime_type())
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&file.name),
        )
        .header(header::CONTENT_LENGTH, content.len())
        .header(header::ETAG, tag)
        .body(Body::from(content))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// PATCH /api/files/:id - Rename a file.
#[utoipa::path(
    patch,
    path = "/files/{id}",
    tag = "files",
    params(("id" = i64, Path, description = "File ID")),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "File renamed", body = FileResponse),
        (status = 403, description = "No edit access"),
        (status = 409, description = "A live sibling has the same name")
    ),
    security(("bearer_auth" = []))
)]
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RenameRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let file = state.drive().rename_file(user.id(), id, &req.name).await?;

    state
        .record(
            NewActivity::new(user.id(), Action::RenameFile, ResourceType::File)
                .resource(id)
                .details(file.name.clone())
                .ip(ip),
        )
        .await;

    Ok(Json(ApiResponse::new(file.into())))
}

/// PUT /api/files/:id/move - Move a file into another folder.
#[utoipa::path(
    put,
    path = "/files/{id}/move",
    tag = "files",
    params(("id" = i64, Path, description = "File ID")),
    request_body = MoveFolderRequest,
    responses(
        (status = 200, description = "File moved", body = FileResponse),
        (status = 403, description = "No edit access or different owner"),
        (status = 409, description = "A live file with the same name exists at the destination")
    ),
    security(("bearer_auth" = []))
)]
pub async fn move_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<MoveFolderRequest>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let parent_id = root_alias(req.parent_id);
    let listing = state
        .drive()
        .bulk_move(user.id(), &[], &[id], parent_id)
        .await?;
    let file = listing
        .files
        .into_iter()
        .find(|f| f.id == id)
        .ok_or_else(|| ApiError::not_found("file not found"))?;

    let destination = parent_id.map_or_else(|| "root".to_string(), |p| p.to_string());
    state
        .record(
            NewActivity::new(user.id(), Action::MoveFile, ResourceType::File)
                .resource(id)
                .details(format!("moved to {destination}"))
                .ip(ip),
        )
        .await;

    Ok(Json(ApiResponse::new(file.into())))
}

/// DELETE /api/files/:id - Move a file to the recycle bin.
#[utoipa::path(
    delete,
    path = "/files/{id}",
    tag = "files",
    params(("id" = i64, Path, description = "File ID")),
    responses(
        (status = 200, description = "File recycled", body = FileDeleteResponse),
        (status = 403, description = "No edit access"),
        (status = 404, description = "File not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<FileDeleteResponse>>, ApiError> {
    let deleted = state.drive().delete_file(user.id(), id).await?;

    if deleted {
        state
            .record(
                NewActivity::new(user.id(), Action::DeleteFile, ResourceType::File)
                    .resource(id)
                    .ip(ip),
            )
            .await;
    }

    Ok(Json(ApiResponse::new(FileDeleteResponse { id, deleted })))
}
