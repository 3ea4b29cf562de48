//! Code execution handler.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::execute::RunOutput;
use crate::web::dto::{ApiResponse, RunRequest, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

/// POST /api/files/:id/run - Run a source file through Judge0.
///
/// The language comes from the file extension.
#[utoipa::path(
    post,
    path = "/files/{id}/run",
    tag = "execute",
    params(("id" = i64, Path, description = "File ID")),
    request_body = RunRequest,
    responses(
        (status = 200, description = "Program output", content_type = "application/json"),
        (status = 400, description = "Unsupported language"),
        (status = 404, description = "File not found"),
        (status = 502, description = "Judge0 request failed"),
        (status = 503, description = "Code execution is not configured")
    ),
    security(("bearer_auth" = []))
)]
pub async fn run_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(req): ValidatedJson<RunRequest>,
) -> Result<Json<ApiResponse<RunOutput>>, ApiError> {
    let output = state
        .runner
        .run_file(&state.drive(), user.id(), id, &req.stdin)
        .await?;
    Ok(Json(ApiResponse::new(output)))
}
