//! Search handler.

use axum::{
    extract::{Query, State},
    Json,
};
use std::sync::Arc;

use crate::search::search;
use crate::web::dto::{ApiResponse, ItemsResponse, SearchQuery};
use crate::web::error::ApiError;
use crate::web::handlers::{root_alias, AppState};
use crate::web::middleware::AuthUser;

/// GET /api/search - Case-insensitive name search over the caller's drive.
///
/// `parent_id` limits results to one folder's direct children (0 is the root).
#[utoipa::path(
    get,
    path = "/search",
    tag = "search",
    params(SearchQuery),
    responses(
        (status = 200, description = "Matching items", body = ItemsResponse),
        (status = 400, description = "Empty query")
    ),
    security(("bearer_auth" = []))
)]
pub async fn search_items(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<ItemsResponse>>, ApiError> {
    let scope = query.parent_id.map(|id| root_alias(Some(id)));
    let results = search(state.db.pool(), user.id(), &query.q, scope).await?;
    Ok(Json(ApiResponse::new(ItemsResponse::new(
        results.folders,
        results.files,
    ))))
}
