//! Request DTOs for the web API.

use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::validation::item_name;
use crate::share::Permission;

// ============================================================================
// Auth
// ============================================================================

/// User registration request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    pub username: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Password change request.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,
    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub new_password: String,
}

// ============================================================================
// Folders and files
// ============================================================================

/// Folder creation request. `parent_id` of `0` or null is the root.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFolderRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "item_name")
    )]
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Rename request for folders and files.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "item_name")
    )]
    pub name: String,
}

/// Folder move request. `parent_id` of `0` or null is the root.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MoveFolderRequest {
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Bulk delete request.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct BulkDeleteRequest {
    #[serde(default)]
    pub folder_ids: Vec<i64>,
    #[serde(default)]
    pub file_ids: Vec<i64>,
}

/// Bulk move request.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct BulkMoveRequest {
    #[serde(default)]
    pub folder_ids: Vec<i64>,
    #[serde(default)]
    pub file_ids: Vec<i64>,
    #[serde(default)]
    pub parent_id: Option<i64>,
}

/// Recycle bin request naming deleted files.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct FileIdsRequest {
    #[serde(default)]
    pub file_ids: Vec<i64>,
}

// ============================================================================
// Sharing and stars
// ============================================================================

/// Share creation request. Exactly one of `file_id` and `folder_id`.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateShareRequest {
    #[serde(default)]
    pub file_id: Option<i64>,
    #[serde(default)]
    pub folder_id: Option<i64>,
    #[serde(default)]
    #[schema(value_type = String, example = "view")]
    pub permission: Permission,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub emails: Vec<String>,
}

/// Share update request. Omitted fields keep their value; `emails`
/// replaces the access list when present.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateShareRequest {
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "edit")]
    pub permission: Option<Permission>,
    #[serde(default)]
    pub is_public: Option<bool>,
    #[serde(default)]
    pub emails: Option<Vec<String>>,
}

/// A file or folder reference. Exactly one id must be set.
#[derive(Debug, Default, Deserialize, Validate, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TargetRequest {
    #[serde(default)]
    pub file_id: Option<i64>,
    #[serde(default)]
    pub folder_id: Option<i64>,
}

/// Code execution request.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct RunRequest {
    #[serde(default)]
    #[validate(length(max = 65536, message = "stdin is too large"))]
    pub stdin: String,
}

// ============================================================================
// Query parameters
// ============================================================================

/// Activity log filters. Dates are `YYYY-MM-DD`, both bounds inclusive.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ActivityQuery {
    pub action: Option<String>,
    pub resource_type: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Security highlights query.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SecurityQuery {
    pub limit: Option<i64>,
}

/// Search query. `parent_id` of `0` scopes the search to the root.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub parent_id: Option<i64>,
}

/// Storage breakdown query. `folder_id` of `0` or absent is the root.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BreakdownQuery {
    pub folder_id: Option<i64>,
}
