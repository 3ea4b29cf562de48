//! Response DTOs for the web API.
//!
//! Timestamps are RFC 3339 in UTC.

use serde::Serialize;
use utoipa::ToSchema;

use crate::activity::ActivityLog;
use crate::datetime::to_rfc3339;
use crate::db::User;
use crate::file::{DeleteSummary, FileRecord, Folder, FolderListing};
use crate::recycle::RestoreSummary;
use crate::share::{
    ResolvedShare, SavedShare, Share, ShareDetails, ShareUser, SharedItem, SharedResource,
};

// ============================================================================
// Generic Response Wrappers
// ============================================================================

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// Number of affected items.
#[derive(Debug, Serialize, ToSchema)]
pub struct CountResponse {
    pub count: u64,
}

// ============================================================================
// Auth DTOs
// ============================================================================

/// User information.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    /// Bytes charged to the user, recycle bin included.
    pub storage_used: i64,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            profile: user.profile,
            storage_used: user.storage_used,
            created_at: to_rfc3339(&user.created_at),
        }
    }
}

/// Login and registration response.
#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub access_token: String,
    /// Always `bearer`.
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserResponse,
}

// ============================================================================
// Folder and File DTOs
// ============================================================================

/// Folder information.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderResponse {
    pub id: i64,
    pub name: String,
    /// `null` for top-level folders.
    pub parent_id: Option<i64>,
    pub owner_id: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Folder> for FolderResponse {
    fn from(folder: Folder) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            parent_id: folder.parent_id,
            owner_id: folder.owner_id,
            created_at: to_rfc3339(&folder.created_at),
            updated_at: to_rfc3339(&folder.updated_at),
        }
    }
}

/// File metadata.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileResponse {
    pub id: i64,
    pub name: String,
    /// `null` for files in the root.
    pub folder_id: Option<i64>,
    pub owner_id: i64,
    pub size: i64,
    /// SHA-256 of the content, hex encoded.
    pub checksum: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<FileRecord> for FileResponse {
    fn from(file: FileRecord) -> Self {
        Self {
            mime_type: file.mime_type(),
            extension: file.extension(),
            id: file.id,
            name: file.name,
            folder_id: file.folder_id,
            owner_id: file.owner_id,
            size: file.size,
            checksum: file.checksum,
            created_at: to_rfc3339(&file.created_at),
            updated_at: to_rfc3339(&file.updated_at),
        }
    }
}

/// A folder with its breadcrumb path (root first, folder last).
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderDetailResponse {
    pub folder: FolderResponse,
    pub path: Vec<FolderResponse>,
}

/// Children of a folder or of the root.
#[derive(Debug, Serialize, ToSchema)]
pub struct FolderListingResponse {
    /// `null` when listing the root.
    pub folder: Option<FolderResponse>,
    pub breadcrumbs: Vec<FolderResponse>,
    pub folders: Vec<FolderResponse>,
    pub files: Vec<FileResponse>,
}

impl From<FolderListing> for FolderListingResponse {
    fn from(listing: FolderListing) -> Self {
        Self {
            folder: listing.folder.map(Into::into),
            breadcrumbs: listing.breadcrumbs.into_iter().map(Into::into).collect(),
            folders: listing.folders.into_iter().map(Into::into).collect(),
            files: listing.files.into_iter().map(Into::into).collect(),
        }
    }
}

/// Result of a folder or bulk delete.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeleteSummaryResponse {
    pub folders_removed: u64,
    pub files_recycled: u64,
}

impl From<DeleteSummary> for DeleteSummaryResponse {
    fn from(summary: DeleteSummary) -> Self {
        Self {
            folders_removed: summary.folders_removed,
            files_recycled: summary.files_recycled,
        }
    }
}

/// Result of a single file delete.
#[derive(Debug, Serialize, ToSchema)]
pub struct FileDeleteResponse {
    pub id: i64,
    /// `false` when the file was already in the recycle bin.
    pub deleted: bool,
}

// ============================================================================
// Recycle Bin DTOs
// ============================================================================

/// A file in the recycle bin.
#[derive(Debug, Serialize, ToSchema)]
pub struct DeletedFileResponse {
    pub id: i64,
    pub name: String,
    pub size: i64,
    /// Folder the file was in when it was deleted.
    pub original_folder_id: Option<i64>,
    pub deleted_at: Option<String>,
}

impl From<FileRecord> for DeletedFileResponse {
    fn from(file: FileRecord) -> Self {
        Self {
            id: file.id,
            name: file.name,
            size: file.size,
            original_folder_id: file.original_folder_id,
            deleted_at: file.deleted_at.as_deref().map(to_rfc3339),
        }
    }
}

/// Result of a restore.
#[derive(Debug, Serialize, ToSchema)]
pub struct RestoreResponse {
    pub restored: Vec<i64>,
    /// Files left in the bin because a live sibling has the same name.
    pub skipped: Vec<i64>,
}

impl From<RestoreSummary> for RestoreResponse {
    fn from(summary: RestoreSummary) -> Self {
        Self {
            restored: summary.restored,
            skipped: summary.skipped,
        }
    }
}

// ============================================================================
// Share DTOs
// ============================================================================

/// A user on a share's access list.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShareUserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<ShareUser> for ShareUserResponse {
    fn from(user: ShareUser) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
        }
    }
}

/// A share and its access list.
#[derive(Debug, Serialize, ToSchema)]
pub struct ShareResponse {
    pub id: i64,
    pub token: String,
    pub file_id: Option<i64>,
    pub folder_id: Option<i64>,
    /// `view` or `edit`.
    pub permission: String,
    pub is_public: bool,
    /// `anyone_with_link` for public shares, `restricted` otherwise.
    pub access: String,
    pub users: Vec<ShareUserResponse>,
    /// Requested emails that matched no account.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unknown_emails: Vec<String>,
    pub created_by: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ShareResponse {
    fn build(share: Share, users: Vec<ShareUser>, unknown_emails: Vec<String>) -> Self {
        let access = if share.is_public {
            "anyone_with_link"
        } else {
            "restricted"
        };
        Self {
            id: share.id,
            token: share.token,
            file_id: share.file_id,
            folder_id: share.folder_id,
            permission: share.permission,
            is_public: share.is_public,
            access: access.to_string(),
            users: users.into_iter().map(Into::into).collect(),
            unknown_emails,
            created_by: share.created_by,
            created_at: to_rfc3339(&share.created_at),
            updated_at: to_rfc3339(&share.updated_at),
        }
    }
}

impl From<SavedShare> for ShareResponse {
    fn from(saved: SavedShare) -> Self {
        Self::build(saved.share, saved.users, saved.unknown_emails)
    }
}

impl From<ShareDetails> for ShareResponse {
    fn from(details: ShareDetails) -> Self {
        Self::build(details.share, details.users, Vec::new())
    }
}

/// The resource behind a share token.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResolvedShareResponse {
    /// `file` or `folder`.
    pub kind: String,
    /// Permission the share grants.
    pub permission: String,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<FolderResponse>,
    /// Child folders of a shared folder.
    pub folders: Vec<FolderResponse>,
    /// Live child files of a shared folder.
    pub files: Vec<FileResponse>,
}

impl From<ResolvedShare> for ResolvedShareResponse {
    fn from(resolved: ResolvedShare) -> Self {
        let share = resolved.share;
        let mut response = Self {
            kind: String::new(),
            permission: share.permission,
            is_public: share.is_public,
            file: None,
            folder: None,
            folders: Vec::new(),
            files: Vec::new(),
        };
        match resolved.resource {
            SharedResource::File(file) => {
                response.kind = "file".to_string();
                response.file = Some(file.into());
            }
            SharedResource::Folder {
                folder,
                folders,
                files,
            } => {
                response.kind = "folder".to_string();
                response.folder = Some(folder.into());
                response.folders = folders.into_iter().map(Into::into).collect();
                response.files = files.into_iter().map(Into::into).collect();
            }
        }
        response
    }
}

/// A file or folder shared with the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct SharedItemResponse {
    pub share_id: i64,
    pub token: String,
    /// `file` or `folder`.
    pub kind: String,
    pub file_id: Option<i64>,
    pub folder_id: Option<i64>,
    pub name: String,
    pub permission: String,
    pub shared_by: String,
    pub shared_at: String,
}

impl From<SharedItem> for SharedItemResponse {
    fn from(item: SharedItem) -> Self {
        let kind = if item.file_id.is_some() { "file" } else { "folder" };
        Self {
            share_id: item.share_id,
            token: item.token,
            kind: kind.to_string(),
            file_id: item.file_id,
            folder_id: item.folder_id,
            name: item.name,
            permission: item.permission,
            shared_by: item.shared_by,
            shared_at: to_rfc3339(&item.created_at),
        }
    }
}

// ============================================================================
// Activity DTOs
// ============================================================================

/// An activity log entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityLogResponse {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<i64>,
    pub details: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: String,
}

impl From<ActivityLog> for ActivityLogResponse {
    fn from(log: ActivityLog) -> Self {
        Self {
            id: log.id,
            user_id: log.user_id,
            username: log.username,
            action: log.action,
            resource_type: log.resource_type,
            resource_id: log.resource_id,
            details: log.details,
            ip_address: log.ip_address,
            created_at: to_rfc3339(&log.created_at),
        }
    }
}

/// A page of activity logs.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityListResponse {
    pub logs: Vec<ActivityLogResponse>,
    /// Number of logs in this page.
    pub count: usize,
}

impl From<Vec<ActivityLog>> for ActivityListResponse {
    fn from(logs: Vec<ActivityLog>) -> Self {
        let logs: Vec<ActivityLogResponse> = logs.into_iter().map(Into::into).collect();
        Self {
            count: logs.len(),
            logs,
        }
    }
}

// ============================================================================
// Search and Star DTOs
// ============================================================================

/// Folders and files matching a query, or starred by the caller.
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemsResponse {
    pub folders: Vec<FolderResponse>,
    pub files: Vec<FileResponse>,
}

impl ItemsResponse {
    pub fn new(folders: Vec<Folder>, files: Vec<FileRecord>) -> Self {
        Self {
            folders: folders.into_iter().map(Into::into).collect(),
            files: files.into_iter().map(Into::into).collect(),
        }
    }
}

/// Star state after a star or unstar.
#[derive(Debug, Serialize, ToSchema)]
pub struct StarResponse {
    pub starred: bool,
}
