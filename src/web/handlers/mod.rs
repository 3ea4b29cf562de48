//! API handlers.

pub mod activity;
pub mod auth;
pub mod bulk;
pub mod execute;
pub mod file;
pub mod folder;
pub mod recycle;
pub mod search;
pub mod share;
pub mod star;
pub mod storage;

use std::sync::Arc;

use crate::activity::{ActivityRepository, NewActivity};
use crate::config::Config;
use crate::execute::CodeRunner;
use crate::file::{DriveService, FileStorage, UploadLimits};
use crate::recycle::RecycleBin;
use crate::share::ShareTarget;
use crate::web::error::ApiError;
use crate::web::middleware::JwtState;
use crate::{Database, Result};

/// Application state shared across handlers.
pub struct AppState {
    /// Database handle.
    pub db: Arc<Database>,
    /// Blob storage.
    pub storage: Arc<FileStorage>,
    /// Token issuing and verification.
    pub jwt: JwtState,
    /// Upload size limit and per-user quota.
    pub limits: UploadLimits,
    /// Timezone for exported timestamps.
    pub timezone: String,
    /// Judge0 client.
    pub runner: CodeRunner,
}

impl AppState {
    /// Build the state from configuration.
    pub fn new(db: Arc<Database>, storage: Arc<FileStorage>, config: &Config) -> Result<Self> {
        Ok(Self {
            db,
            storage,
            jwt: JwtState::new(
                &config.web.jwt_secret,
                config.web.jwt_access_token_expiry_secs,
            ),
            limits: UploadLimits {
                max_upload_bytes: config.files.max_upload_bytes(),
                quota_bytes: config.files.quota_bytes(),
            },
            timezone: config.server.timezone.clone(),
            runner: CodeRunner::new(&config.execute)?,
        })
    }

    /// Hierarchy operations with the configured limits.
    pub fn drive(&self) -> DriveService<'_> {
        DriveService::new(self.db.pool(), &self.storage).with_limits(self.limits)
    }

    /// Recycle bin over the shared pool and blob store.
    pub fn recycle_bin(&self) -> RecycleBin<'_> {
        RecycleBin::new(self.db.pool(), &self.storage)
    }

    /// Append to the activity log. Failures are only logged.
    pub async fn record(&self, entry: NewActivity) {
        ActivityRepository::new(self.db.pool())
            .record_quietly(entry)
            .await;
    }
}

/// Treat `0` as the root folder.
pub(crate) fn root_alias(id: Option<i64>) -> Option<i64> {
    id.filter(|id| *id != 0)
}

/// Build a target from a file/folder id pair, exactly one of which is set.
pub(crate) fn require_target(
    file_id: Option<i64>,
    folder_id: Option<i64>,
) -> std::result::Result<ShareTarget, ApiError> {
    ShareTarget::from_ids(file_id, folder_id)
        .ok_or_else(|| ApiError::bad_request("Exactly one of file_id and folder_id is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_alias() {
        assert_eq!(root_alias(None), None);
        assert_eq!(root_alias(Some(0)), None);
        assert_eq!(root_alias(Some(5)), Some(5));
    }

    #[test]
    fn test_require_target() {
        assert_eq!(require_target(Some(1), None).unwrap(), ShareTarget::File(1));
        assert_eq!(require_target(None, Some(2)).unwrap(), ShareTarget::Folder(2));
        assert!(require_target(None, None).is_err());
        assert!(require_target(Some(1), Some(2)).is_err());
    }
}
