//! Recycle bin operations.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use crate::datetime::to_db_datetime;
use crate::db::{DbPool, UserRepository};
use crate::file::{FileRecord, FileRepository, FileStorage, FolderRepository};
use crate::{DriveError, Result};

/// Outcome of a restore request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// Files brought back.
    pub restored: Vec<i64>,
    /// Files left in the bin because a live sibling has the same name.
    pub skipped: Vec<i64>,
}

/// A user's recycle bin.
pub struct RecycleBin<'a> {
    pool: &'a DbPool,
    storage: &'a FileStorage,
}

impl<'a> RecycleBin<'a> {
    /// Create a new RecycleBin.
    pub fn new(pool: &'a DbPool, storage: &'a FileStorage) -> Self {
        Self { pool, storage }
    }

    /// List the caller's deleted files, most recent first.
    pub async fn list(&self, user_id: i64) -> Result<Vec<FileRecord>> {
        FileRepository::new(self.pool).list_deleted(user_id).await
    }

    /// Restore files to their original folder.
    ///
    /// IDs that are not in the caller's bin are ignored. A file whose folder
    /// is gone returns to the root.
    pub async fn restore(&self, user_id: i64, file_ids: &[i64]) -> Result<RestoreSummary> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        let mut summary = RestoreSummary::default();
        let mut seen = HashSet::new();
        for &id in file_ids {
            if !seen.insert(id) {
                continue;
            }
            let Some(file) = FileRepository::fetch(&mut tx, id).await? else {
                continue;
            };
            if file.owner_id != user_id || file.is_live() {
                continue;
            }

            let destination = match file.original_folder_id {
                Some(folder_id) => FolderRepository::fetch(&mut tx, folder_id)
                    .await?
                    .filter(|f| f.owner_id == user_id)
                    .map(|f| f.id),
                None => None,
            };

            if FileRepository::name_taken(&mut tx, user_id, destination, &file.name, None).await? {
                summary.skipped.push(id);
                continue;
            }
            FileRepository::restore(&mut tx, id, destination).await?;
            summary.restored.push(id);
        }

        tx.commit()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        info!(
            user_id,
            restored = summary.restored.len(),
            skipped = summary.skipped.len(),
            "Files restored"
        );
        Ok(summary)
    }

    /// Permanently delete files from the caller's bin.
    ///
    /// Live files and IDs that are not the caller's are ignored.
    pub async fn permanent_delete(&self, user_id: i64, file_ids: &[i64]) -> Result<u64> {
        let wanted: HashSet<i64> = file_ids.iter().copied().collect();
        let files: Vec<FileRecord> = self
            .list(user_id)
            .await?
            .into_iter()
            .filter(|f| wanted.contains(&f.id))
            .collect();

        let count = self.remove(files).await?;
        info!(user_id, deleted_count = count, "Files permanently deleted");
        Ok(count)
    }

    /// Permanently delete everything in the caller's bin.
    pub async fn empty(&self, user_id: i64) -> Result<u64> {
        let files = self.list(user_id).await?;
        let count = self.remove(files).await?;
        info!(user_id, deleted_count = count, "Recycle bin emptied");
        Ok(count)
    }

    /// Purge every recycled file deleted more than `retention` before `now`.
    pub async fn purge_expired(&self, now: DateTime<Utc>, retention: Duration) -> Result<u64> {
        let cutoff = to_db_datetime(&(now - retention));
        let files = FileRepository::new(self.pool).list_expired(&cutoff).await?;
        if files.is_empty() {
            debug!("No expired files in the recycle bin");
            return Ok(0);
        }

        let count = self.remove(files).await?;
        info!(deleted_count = count, cutoff = %cutoff, "Purged expired files");
        Ok(count)
    }

    /// Delete rows and refund storage in one transaction, then drop blobs.
    async fn remove(&self, files: Vec<FileRecord>) -> Result<u64> {
        if files.is_empty() {
            return Ok(0);
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        let mut removed = Vec::with_capacity(files.len());
        for file in files {
            if FileRepository::delete_row(&mut tx, file.id).await? {
                UserRepository::adjust_storage_used(&mut tx, file.owner_id, -file.size).await?;
                removed.push(file);
            }
        }
        tx.commit()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        for file in &removed {
            match self.storage.delete(&file.stored_name) {
                Ok(true) => {}
                Ok(false) => {
                    warn!(file_id = file.id, stored_name = %file.stored_name, "Blob already missing")
                }
                Err(e) => {
                    warn!(file_id = file.id, stored_name = %file.stored_name, error = %e, "Failed to remove blob")
                }
            }
        }
        Ok(removed.len() as u64)
    }
}
