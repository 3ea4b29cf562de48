//! Activity log handlers.

use axum::{
    body::Body,
    extract::{Query, State},
    http::header,
    response::Response,
    Json,
};
use std::sync::Arc;

use crate::activity::{
    export_csv, export_filename, ActivityFilter, ActivityRepository, Page, DEFAULT_SECURITY_LIMIT,
};
use crate::datetime::parse_date;
use crate::web::dto::{ActivityListResponse, ActivityQuery, ApiResponse, SecurityQuery};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::web::middleware::AuthUser;

fn parse_filter(query: &ActivityQuery) -> Result<ActivityFilter, ApiError> {
    let date = |value: &Option<String>, field: &str| -> Result<_, ApiError> {
        match value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            None => Ok(None),
            Some(v) => parse_date(v)
                .map(Some)
                .ok_or_else(|| ApiError::unprocessable(format!("{field} must be YYYY-MM-DD"))),
        }
    };

    let filter = ActivityFilter {
        action: query
            .action
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(str::parse)
            .transpose()
            .map_err(ApiError::unprocessable)?,
        resource_type: query
            .resource_type
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(str::parse)
            .transpose()
            .map_err(ApiError::unprocessable)?,
        start_date: date(&query.start_date, "start_date")?,
        end_date: date(&query.end_date, "end_date")?,
    };

    if let (Some(start), Some(end)) = (filter.start_date, filter.end_date) {
        if start > end {
            return Err(ApiError::unprocessable(
                "start_date must not be after end_date",
            ));
        }
    }
    Ok(filter)
}

/// GET /api/activity - The caller's activity, newest first.
#[utoipa::path(
    get,
    path = "/activity",
    tag = "activity",
    params(ActivityQuery),
    responses(
        (status = 200, description = "Activity logs", body = ActivityListResponse),
        (status = 422, description = "Invalid filter or paging")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_activity(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Json<ApiResponse<ActivityListResponse>>, ApiError> {
    let filter = parse_filter(&query)?;
    let page = Page::new(query.limit, query.offset)?;

    let logs = ActivityRepository::new(state.db.pool())
        .list(user.id(), &filter, Some(page))
        .await?;
    Ok(Json(ApiResponse::new(logs.into())))
}

/// GET /api/activity/export - The caller's activity as a CSV attachment.
#[utoipa::path(
    get,
    path = "/activity/export",
    tag = "activity",
    params(ActivityQuery),
    responses(
        (status = 200, description = "CSV export", content_type = "text/csv"),
        (status = 422, description = "Invalid filter")
    ),
    security(("bearer_auth" = []))
)]
pub async fn export_activity(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ActivityQuery>,
) -> Result<Response<Body>, ApiError> {
    let filter = parse_filter(&query)?;
    let logs = ActivityRepository::new(state.db.pool())
        .list(user.id(), &filter, None)
        .await?;

    let csv = export_csv(&logs, &state.timezone);
    let filename = export_filename(chrono::Utc::now());
    tracing::debug!(user_id = user.id(), rows = logs.len(), "Activity exported");

    Response::builder()
        .header(header::CONTENT_TYPE, "text/csv; charset=utf-8")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(csv))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /api/activity/security - Recent destructive and share-changing actions.
#[utoipa::path(
    get,
    path = "/activity/security",
    tag = "activity",
    params(SecurityQuery),
    responses(
        (status = 200, description = "Security highlights", body = ActivityListResponse),
        (status = 422, description = "Limit out of range")
    ),
    security(("bearer_auth" = []))
)]
pub async fn security_highlights(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<SecurityQuery>,
) -> Result<Json<ApiResponse<ActivityListResponse>>, ApiError> {
    let logs = ActivityRepository::new(state.db.pool())
        .security_highlights(user.id(), query.limit.unwrap_or(DEFAULT_SECURITY_LIMIT))
        .await?;
    Ok(Json(ApiResponse::new(logs.into())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Action, ResourceType};
    use crate::web::error::ErrorCode;

    #[test]
    fn test_parse_filter() {
        let query = ActivityQuery {
            action: Some("delete_file".to_string()),
            resource_type: Some("file".to_string()),
            start_date: Some("2024-01-01".to_string()),
            end_date: Some("".to_string()),
            ..Default::default()
        };
        let filter = parse_filter(&query).unwrap();
        assert_eq!(filter.action, Some(Action::DeleteFile));
        assert_eq!(filter.resource_type, Some(ResourceType::File));
        assert!(filter.start_date.is_some());
        assert_eq!(filter.end_date, None);
    }

    #[test]
    fn test_parse_filter_rejects_bad_values() {
        let bad_action = ActivityQuery {
            action: Some("format_disk".to_string()),
            ..Default::default()
        };
        assert_eq!(
            parse_filter(&bad_action).unwrap_err().code(),
            ErrorCode::UnprocessableEntity
        );

        let bad_date = ActivityQuery {
            start_date: Some("01/02/2024".to_string()),
            ..Default::default()
        };
        assert!(parse_filter(&bad_date).is_err());

        let reversed = ActivityQuery {
            start_date: Some("2024-02-01".to_string()),
            end_date: Some("2024-01-01".to_string()),
            ..Default::default()
        };
        assert!(parse_filter(&reversed).is_err());
    }
}
