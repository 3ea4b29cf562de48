//! Drive service: folder/file operations with access control.
//!
//! Every operation takes the acting user's ID and resolves permissions
//! through the share access rules. Multi-row changes run in one
//! transaction.

use std::collections::HashSet;

use sqlx::SqliteConnection;
use tracing::{info, warn};

use crate::auth::validation::normalize_item_name;
use crate::db::{DbPool, UserRepository};
use crate::share::{require_access, Permission, ShareTarget};
use crate::{DriveError, Result};

use super::folder::{Folder, FolderRepository, FolderUpdate, NewFolder};
use super::metadata::{FileRecord, FileRepository, NewFile};
use super::storage::FileStorage;

/// Default maximum upload size (100 MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Default per-user quota (1 GB).
pub const DEFAULT_QUOTA_BYTES: u64 = 1024 * 1024 * 1024;

/// Upload size limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Largest single upload in bytes.
    pub max_upload_bytes: u64,
    /// Bytes each owner may store, recycle bin included.
    pub quota_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            quota_bytes: DEFAULT_QUOTA_BYTES,
        }
    }
}

/// Contents of a folder (or of a user's root).
#[derive(Debug, Clone)]
pub struct FolderListing {
    /// The listed folder; None for the root.
    pub folder: Option<Folder>,
    /// Path from the root to the listed folder.
    pub breadcrumbs: Vec<Folder>,
    /// Child folders.
    pub folders: Vec<Folder>,
    /// Live child files.
    pub files: Vec<FileRecord>,
}

/// Outcome of a folder deletion or a bulk delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    /// Folders removed, descendants included.
    pub folders_removed: u64,
    /// Files moved to the recycle bin.
    pub files_recycled: u64,
}

/// Service for drive operations.
pub struct DriveService<'a> {
    pool: &'a DbPool,
    storage: &'a FileStorage,
    limits: UploadLimits,
}

impl<'a> DriveService<'a> {
    /// Create a new DriveService.
    pub fn new(pool: &'a DbPool, storage: &'a FileStorage) -> Self {
        Self {
            pool,
            storage,
            limits: UploadLimits::default(),
        }
    }

    /// Set the upload limits.
    pub fn with_limits(mut self, limits: UploadLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Get the blob storage.
    pub fn storage(&self) -> &FileStorage {
        self.storage
    }

    async fn connection(&self) -> Result<sqlx::pool::PoolConnection<sqlx::Sqlite>> {
        self.pool
            .acquire()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))
    }

    async fn begin(&self) -> Result<sqlx::Transaction<'static, sqlx::Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))
    }

    /// Check access and return the node owner.
    pub async fn authorize(&self, user_id: i64, target: ShareTarget, needed: Permission) -> Result<i64> {
        let mut conn = self.connection().await?;
        require_access(&mut conn, user_id, target, needed).await
    }

    /// Resolve the owner of a destination folder (None = the caller's root).
    async fn destination_owner(
        conn: &mut SqliteConnection,
        user_id: i64,
        parent_id: Option<i64>,
    ) -> Result<i64> {
        match parent_id {
            None => Ok(user_id),
            Some(id) => require_access(conn, user_id, ShareTarget::Folder(id), Permission::Edit).await,
        }
    }

    // --- folders -----------------------------------------------------------

    /// Create a folder under `parent_id` (None for the caller's root).
    ///
    /// Inside a shared folder the new folder belongs to that folder's owner.
    pub async fn create_folder(
        &self,
        user_id: i64,
        name: &str,
        parent_id: Option<i64>,
    ) -> Result<Folder> {
        let name = normalize_item_name(name)?;
        let mut conn = self.connection().await?;
        let owner_id = Self::destination_owner(&mut conn, user_id, parent_id).await?;

        if FolderRepository::name_taken(&mut conn, owner_id, parent_id, &name, None).await? {
            return Err(DriveError::Conflict(format!(
                "a folder named '{name}' already exists here"
            )));
        }

        let folder = FolderRepository::insert(
            &mut conn,
            &NewFolder::new(name, owner_id).with_parent(parent_id),
        )
        .await?;

        info!(user_id, folder_id = folder.id, "Folder created");
        Ok(folder)
    }

    /// Get a folder and its breadcrumb path.
    pub async fn get_folder(&self, user_id: i64, id: i64) -> Result<(Folder, Vec<Folder>)> {
        self.authorize(user_id, ShareTarget::Folder(id), Permission::View)
            .await?;

        let repo = FolderRepository::new(self.pool);
        let folder = repo
            .get_by_id(id)
            .await?
            .ok_or_else(|| DriveError::NotFound("folder".to_string()))?;
        let path = repo.get_path(id).await?;
        Ok((folder, path))
    }

    /// List a folder's children; `None` lists the caller's own root.
    pub async fn list_children(&self, user_id: i64, folder_id: Option<i64>) -> Result<FolderListing> {
        let (folder, breadcrumbs, owner_id) = match folder_id {
            None => (None, Vec::new(), user_id),
            Some(id) => {
                let (folder, path) = self.get_folder(user_id, id).await?;
                let owner_id = folder.owner_id;
                (Some(folder), path, owner_id)
            }
        };

        let folders = FolderRepository::new(self.pool)
            .list_children(owner_id, folder_id)
            .await?;
        let files = FileRepository::new(self.pool)
            .list_live(owner_id, folder_id)
            .await?;

        Ok(FolderListing {
            folder,
            breadcrumbs,
            folders,
            files,
        })
    }

    /// Rename a folder.
    pub async fn rename_folder(&self, user_id: i64, id: i64, name: &str) -> Result<Folder> {
        let name = normalize_item_name(name)?;
        let mut conn = self.connection().await?;
        require_access(&mut conn, user_id, ShareTarget::Folder(id), Permission::Edit).await?;

        let folder = FolderRepository::fetch(&mut conn, id)
            .await?
            .ok_or_else(|| DriveError::NotFound("folder".to_string()))?;
        if FolderRepository::name_taken(&mut conn, folder.owner_id, folder.parent_id, &name, Some(id))
            .await?
        {
            return Err(DriveError::Conflict(format!(
                "a folder named '{name}' already exists here"
            )));
        }

        FolderRepository::apply_update(&mut conn, id, &FolderUpdate::new().name(name))
            .await?
            .ok_or_else(|| DriveError::NotFound("folder".to_string()))
    }

    /// Move a folder under `new_parent` (None for the caller's root).
    ///
    /// Only the owner may move a folder, and only within their own tree.
    pub async fn move_folder(&self, user_id: i64, id: i64, new_parent: Option<i64>) -> Result<Folder> {
        let mut tx = self.begin().await?;

        let folder = FolderRepository::fetch(&mut tx, id)
            .await?
            .ok_or_else(|| DriveError::NotFound("folder".to_string()))?;
        if folder.owner_id != user_id {
            return Err(DriveError::Permission("only the owner can move a folder".to_string()));
        }

        if let Some(parent_id) = new_parent {
            let parent = FolderRepository::fetch(&mut tx, parent_id)
                .await?
                .ok_or_else(|| DriveError::NotFound("destination folder".to_string()))?;
            if parent.owner_id != user_id {
                return Err(DriveError::Permission(
                    "destination belongs to another user".to_string(),
                ));
            }
            let subtree = FolderRepository::subtree_ids(&mut tx, id).await?;
            if subtree.contains(&parent_id) {
                return Err(DriveError::Conflict(
                    "cannot move a folder into itself or one of its descendants".to_string(),
                ));
            }
        }

        if FolderRepository::name_taken(&mut tx, user_id, new_parent, &folder.name, Some(id)).await? {
            return Err(DriveError::Conflict(format!(
                "a folder named '{}' already exists at the destination",
                folder.name
            )));
        }

        let moved = FolderRepository::apply_update(&mut tx, id, &FolderUpdate::new().parent_id(new_parent))
            .await?
            .ok_or_else(|| DriveError::NotFound("folder".to_string()))?;
        tx.commit()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        info!(user_id, folder_id = id, "Folder moved");
        Ok(moved)
    }

    /// Delete a folder: its subtree is removed and every file in it goes to
    /// the recycle bin.
    pub async fn delete_folder(&self, user_id: i64, id: i64) -> Result<DeleteSummary> {
        let mut tx = self.begin().await?;
        require_access(&mut tx, user_id, ShareTarget::Folder(id), Permission::Edit).await?;
        let summary = Self::remove_folder_tree(&mut tx, id).await?;
        tx.commit()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        info!(
            user_id,
            folder_id = id,
            folders_removed = summary.folders_removed,
            files_recycled = summary.files_recycled,
            "Folder deleted"
        );
        Ok(summary)
    }

    async fn remove_folder_tree(conn: &mut SqliteConnection, id: i64) -> Result<DeleteSummary> {
        let subtree = FolderRepository::subtree_ids(conn, id).await?;
        if subtree.is_empty() {
            return Ok(DeleteSummary::default());
        }

        let mut files_recycled = 0;
        for folder_id in &subtree {
            files_recycled += FileRepository::mark_deleted_in_folder(conn, *folder_id).await?;
        }
        FolderRepository::delete_in(conn, id).await?;

        Ok(DeleteSummary {
            folders_removed: subtree.len() as u64,
            files_recycled,
        })
    }

    // --- files -------------------------------------------------------------

    /// Store an upload in `folder_id` (None for the caller's root).
    ///
    /// The owner of the destination is charged for the bytes.
    pub async fn upload_file(
        &self,
        user_id: i64,
        folder_id: Option<i64>,
        filename: &str,
        content: &[u8],
    ) -> Result<FileRecord> {
        let name = normalize_item_name(filename)?;
        let size = content.len() as u64;
        if size > self.limits.max_upload_bytes {
            return Err(DriveError::QuotaExceeded(format!(
                "file is larger than the {} byte upload limit",
                self.limits.max_upload_bytes
            )));
        }

        let owner_id = {
            let mut conn = self.connection().await?;
            let owner_id = Self::destination_owner(&mut conn, user_id, folder_id).await?;
            if FileRepository::name_taken(&mut conn, owner_id, folder_id, &name, None).await? {
                return Err(DriveError::Conflict(format!(
                    "a file named '{name}' already exists here"
                )));
            }
            owner_id
        };

        let used = UserRepository::new(self.pool).storage_used(owner_id).await?;
        if used as u64 + size > self.limits.quota_bytes {
            return Err(DriveError::QuotaExceeded(format!(
                "upload would exceed the storage quota of {} bytes",
                self.limits.quota_bytes
            )));
        }

        let blob = self.storage.save(content, &name)?;
        let new_file = NewFile::new(&name, owner_id, &blob.stored_name, blob.size, &blob.checksum)
            .in_folder(folder_id);

        match self.insert_charged(&new_file).await {
            Ok(file) => {
                info!(user_id, file_id = file.id, size = file.size, "File uploaded");
                Ok(file)
            }
            Err(e) => {
                if let Err(cleanup) = self.storage.delete(&blob.stored_name) {
                    warn!(stored_name = %blob.stored_name, error = %cleanup, "Failed to remove orphaned blob");
                }
                Err(e)
            }
        }
    }

    async fn insert_charged(&self, new_file: &NewFile) -> Result<FileRecord> {
        let mut tx = self.begin().await?;
        let quota = i64::try_from(self.limits.quota_bytes).unwrap_or(i64::MAX);
        if !UserRepository::charge_storage(&mut tx, new_file.owner_id, new_file.size, quota).await? {
            return Err(DriveError::QuotaExceeded(format!(
                "upload would exceed the storage quota of {} bytes",
                self.limits.quota_bytes
            )));
        }
        let file = FileRepository::insert(&mut tx, new_file).await?;
        tx.commit()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        Ok(file)
    }

    /// Get a live file's metadata.
    pub async fn get_file(&self, user_id: i64, id: i64) -> Result<FileRecord> {
        self.authorize(user_id, ShareTarget::File(id), Permission::View)
            .await?;
        FileRepository::new(self.pool)
            .get_by_id(id)
            .await?
            .filter(FileRecord::is_live)
            .ok_or_else(|| DriveError::NotFound("file".to_string()))
    }

    /// Rename a live file.
    pub async fn rename_file(&self, user_id: i64, id: i64, name: &str) -> Result<FileRecord> {
        let name = normalize_item_name(name)?;
        {
            let mut conn = self.connection().await?;
            require_access(&mut conn, user_id, ShareTarget::File(id), Permission::Edit).await?;
            let file = FileRepository::fetch(&mut conn, id)
                .await?
                .ok_or_else(|| DriveError::NotFound("file".to_string()))?;
            if FileRepository::name_taken(&mut conn, file.owner_id, file.folder_id, &name, Some(id))
                .await?
            {
                return Err(DriveError::Conflict(format!(
                    "a file named '{name}' already exists here"
                )));
            }
        }

        FileRepository::new(self.pool)
            .rename(id, &name)
            .await?
            .ok_or_else(|| DriveError::NotFound("file".to_string()))
    }

    /// Move a file to the recycle bin.
    ///
    /// Deleting a file the caller already recycled succeeds and returns
    /// `false`.
    pub async fn delete_file(&self, user_id: i64, id: i64) -> Result<bool> {
        let mut conn = self.connection().await?;
        let deleted = Self::recycle_file(&mut conn, user_id, id).await?;
        if deleted {
            info!(user_id, file_id = id, "File moved to recycle bin");
        }
        Ok(deleted)
    }

    async fn recycle_file(conn: &mut SqliteConnection, user_id: i64, id: i64) -> Result<bool> {
        let file = FileRepository::fetch(conn, id)
            .await?
            .ok_or_else(|| DriveError::NotFound("file".to_string()))?;

        if !file.is_live() {
            return if file.owner_id == user_id {
                Ok(false)
            } else {
                Err(DriveError::NotFound("file".to_string()))
            };
        }

        require_access(conn, user_id, ShareTarget::File(id), Permission::Edit).await?;
        FileRepository::mark_deleted(conn, id).await
    }

    // --- bulk --------------------------------------------------------------

    /// Delete several folders and files at once. All or nothing.
    pub async fn bulk_delete(
        &self,
        user_id: i64,
        folder_ids: &[i64],
        file_ids: &[i64],
    ) -> Result<DeleteSummary> {
        if folder_ids.is_empty() && file_ids.is_empty() {
            return Err(DriveError::BadRequest(
                "at least one folder or file id is required".to_string(),
            ));
        }

        let mut tx = self.begin().await?;

        for &id in dedup(folder_ids).iter() {
            require_access(&mut tx, user_id, ShareTarget::Folder(id), Permission::Edit).await?;
        }

        let mut summary = DeleteSummary::default();
        for &id in dedup(file_ids).iter() {
            if Self::recycle_file(&mut tx, user_id, id).await? {
                summary.files_recycled += 1;
            }
        }
        for &id in dedup(folder_ids).iter() {
            // A folder nested in another folder of the batch is already gone.
            let removed = Self::remove_folder_tree(&mut tx, id).await?;
            summary.folders_removed += removed.folders_removed;
            summary.files_recycled += removed.files_recycled;
        }

        tx.commit()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        info!(
            user_id,
            folders_removed = summary.folders_removed,
            files_recycled = summary.files_recycled,
            "Bulk delete"
        );
        Ok(summary)
    }

    /// Move several folders and files into `parent_id` (None for the
    /// caller's root). All or nothing.
    ///
    /// Returns the destination listing after the move.
    pub async fn bulk_move(
        &self,
        user_id: i64,
        folder_ids: &[i64],
        file_ids: &[i64],
        parent_id: Option<i64>,
    ) -> Result<FolderListing> {
        if folder_ids.is_empty() && file_ids.is_empty() {
            return Err(DriveError::BadRequest(
                "at least one folder or file id is required".to_string(),
            ));
        }
        let folder_ids = dedup(folder_ids);
        let file_ids = dedup(file_ids);

        let mut tx = self.begin().await?;
        let dest_owner = Self::destination_owner(&mut tx, user_id, parent_id).await?;

        let mut folder_names: HashSet<String> = HashSet::new();
        for &id in &folder_ids {
            let owner = require_access(&mut tx, user_id, ShareTarget::Folder(id), Permission::Edit).await?;
            if owner != dest_owner {
                return Err(DriveError::Permission(
                    "items can only be moved within the same owner's drive".to_string(),
                ));
            }
            if let Some(dest) = parent_id {
                let subtree = FolderRepository::subtree_ids(&mut tx, id).await?;
                if subtree.contains(&dest) {
                    return Err(DriveError::Conflict(
                        "cannot move a folder into itself or one of its descendants".to_string(),
                    ));
                }
            }
            let folder = FolderRepository::fetch(&mut tx, id)
                .await?
                .ok_or_else(|| DriveError::NotFound("folder".to_string()))?;
            if !folder_names.insert(folder.name.clone())
                || FolderRepository::name_taken(&mut tx, dest_owner, parent_id, &folder.name, Some(id))
                    .await?
            {
                return Err(DriveError::Conflict(format!(
                    "a folder named '{}' already exists at the destination",
                    folder.name
                )));
            }
        }

        let mut file_names: HashSet<String> = HashSet::new();
        for &id in &file_ids {
            let owner = require_access(&mut tx, user_id, ShareTarget::File(id), Permission::Edit).await?;
            if owner != dest_owner {
                return Err(DriveError::Permission(
                    "items can only be moved within the same owner's drive".to_string(),
                ));
            }
            let file = FileRepository::fetch(&mut tx, id)
                .await?
                .ok_or_else(|| DriveError::NotFound("file".to_string()))?;
            if !file_names.insert(file.name.clone())
                || FileRepository::name_taken(&mut tx, dest_owner, parent_id, &file.name, Some(id)).await?
            {
                return Err(DriveError::Conflict(format!(
                    "a file named '{}' already exists at the destination",
                    file.name
                )));
            }
        }

        for &id in &folder_ids {
            FolderRepository::apply_update(&mut tx, id, &FolderUpdate::new().parent_id(parent_id)).await?;
        }
        for &id in &file_ids {
            FileRepository::set_folder(&mut tx, id, parent_id).await?;
        }

        tx.commit()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        info!(
            user_id,
            folders = folder_ids.len(),
            files = file_ids.len(),
            "Bulk move"
        );
        self.list_children(user_id, parent_id).await
    }
}

/// Remove duplicate IDs, keeping first occurrences.
fn dedup(ids: &[i64]) -> Vec<i64> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::{NewShare, ShareService};
    use crate::Database;
    use tempfile::TempDir;

    struct Fixture {
        db: Database,
        storage: FileStorage,
        _dir: TempDir,
    }

    impl Fixture {
        async fn new() -> Self {
            let db = Database::open_in_memory().await.unwrap();
            sqlx::raw_sql(
                "INSERT INTO users (username, email, password) VALUES
                    ('owner', 'owner@x.io', 'h'), ('friend', 'friend@x.io', 'h'),
                    ('stranger', 'stranger@x.io', 'h');",
            )
            .execute(db.pool())
            .await
            .unwrap();
            let dir = TempDir::new().unwrap();
            let storage = FileStorage::new(dir.path()).unwrap();
            Self {
                db,
                storage,
                _dir: dir,
            }
        }

        fn service(&self) -> DriveService<'_> {
            DriveService::new(self.db.pool(), &self.storage)
        }
    }

    #[tokio::test]
    async fn test_create_and_list_folders() {
        let fx = Fixture::new().await;
        let svc = fx.service();

        let docs = svc.create_folder(1, "  Docs ", None).await.unwrap();
        assert_eq!(docs.name, "Docs");
        let inner = svc.create_folder(1, "Inner", Some(docs.id)).await.unwrap();

        let root = svc.list_children(1, None).await.unwrap();
        assert!(root.folder.is_none());
        assert_eq!(root.folders.len(), 1);

        let listing = svc.list_children(1, Some(docs.id)).await.unwrap();
        assert_eq!(listing.folders[0].id, inner.id);

        let (_, path) = svc.get_folder(1, inner.id).await.unwrap();
        let names: Vec<_> = path.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Docs", "Inner"]);

        // Another user's root listing is their own.
        assert!(svc.list_children(2, None).await.unwrap().folders.is_empty());
    }

    #[tokio::test]
    async fn test_folder_name_rules() {
        let fx = Fixture::new().await;
        let svc = fx.service();

        svc.create_folder(1, "Docs", None).await.unwrap();
        let dup = svc.create_folder(1, "Docs", None).await;
        assert!(matches!(dup, Err(DriveError::Conflict(_))));

        let bad = svc.create_folder(1, "a/b", None).await;
        assert!(matches!(bad, Err(DriveError::Validation(_))));

        // Same name is fine for another owner.
        svc.create_folder(2, "Docs", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_folder() {
        let fx = Fixture::new().await;
        let svc = fx.service();

        let a = svc.create_folder(1, "A", None).await.unwrap();
        svc.create_folder(1, "B", None).await.unwrap();

        let renamed = svc.rename_folder(1, a.id, "C").await.unwrap();
        assert_eq!(renamed.name, "C");
        // Renaming to its own name is not a conflict.
        svc.rename_folder(1, a.id, "C").await.unwrap();

        let dup = svc.rename_folder(1, a.id, "B").await;
        assert!(matches!(dup, Err(DriveError::Conflict(_))));

        let stranger = svc.rename_folder(3, a.id, "D").await;
        assert!(matches!(stranger, Err(DriveError::Permission(_))));
    }

    #[tokio::test]
    async fn test_move_folder_rejects_cycles() {
        let fx = Fixture::new().await;
        let svc = fx.service();

        let a = svc.create_folder(1, "A", None).await.unwrap();
        let b = svc.create_folder(1, "B", Some(a.id)).await.unwrap();
        let c = svc.create_folder(1, "C", Some(b.id)).await.unwrap();

        let into_self = svc.move_folder(1, a.id, Some(a.id)).await;
        assert!(matches!(into_self, Err(DriveError::Conflict(_))));
        let into_descendant = svc.move_folder(1, a.id, Some(c.id)).await;
        assert!(matches!(into_descendant, Err(DriveError::Conflict(_))));

        let moved = svc.move_folder(1, c.id, None).await.unwrap();
        assert!(moved.parent_id.is_none());

        let other = svc.create_folder(2, "Theirs", None).await.unwrap();
        let foreign = svc.move_folder(1, b.id, Some(other.id)).await;
        assert!(matches!(foreign, Err(DriveError::Permission(_))));
    }

    #[tokio::test]
    async fn test_upload_charges_owner_and_checks_quota() {
        let fx = Fixture::new().await;
        let svc = fx.service().with_limits(UploadLimits {
            max_upload_bytes: 10,
            quota_bytes: 15,
        });

        let file = svc.upload_file(1, None, "a.txt", b"hello").await.unwrap();
        assert_eq!(file.size, 5);
        assert!(fx.storage.exists(&file.stored_name));

        let users = UserRepository::new(fx.db.pool());
        assert_eq!(users.storage_used(1).await.unwrap(), 5);

        let too_big = svc.upload_file(1, None, "big.bin", &[0u8; 11]).await;
        assert!(matches!(too_big, Err(DriveError::QuotaExceeded(_))));

        svc.upload_file(1, None, "b.txt", b"0123456789").await.unwrap();
        let over_quota = svc.upload_file(1, None, "c.txt", b"x").await;
        assert!(matches!(over_quota, Err(DriveError::QuotaExceeded(_))));

        let dup = fx.service().upload_file(1, None, "a.txt", b"again").await;
        assert!(matches!(dup, Err(DriveError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_stay_within_quota() {
        let fx = Fixture::new().await;
        let limits = UploadLimits {
            max_upload_bytes: 10,
            quota_bytes: 15,
        };
        let a = fx.service().with_limits(limits);
        let b = fx.service().with_limits(limits);

        let (first, second) = tokio::join!(
            a.upload_file(1, None, "a.bin", &[0u8; 10]),
            b.upload_file(1, None, "b.bin", &[0u8; 10]),
        );
        assert_eq!(first.is_ok() as u8 + second.is_ok() as u8, 1);
        let failed = if first.is_ok() { second } else { first };
        assert!(matches!(failed, Err(DriveError::QuotaExceeded(_))));

        let users = UserRepository::new(fx.db.pool());
        assert_eq!(users.storage_used(1).await.unwrap(), 10);
        let live = FileRepository::new(fx.db.pool()).list_live(1, None).await.unwrap();
        assert_eq!(live.len(), 1);
    }

    #[tokio::test]
    async fn test_upload_into_shared_folder_belongs_to_owner() {
        let fx = Fixture::new().await;
        let svc = fx.service();
        let shared = svc.create_folder(1, "Team", None).await.unwrap();

        let denied = svc.upload_file(2, Some(shared.id), "x.txt", b"x").await;
        assert!(matches!(denied, Err(DriveError::Permission(_))));

        ShareService::new(fx.db.pool())
            .create_share(
                1,
                NewShare::new(ShareTarget::Folder(shared.id))
                    .with_permission(Permission::Edit)
                    .with_emails(vec!["friend@x.io".to_string()]),
            )
            .await
            .unwrap();

        let file = svc.upload_file(2, Some(shared.id), "x.txt", b"xyz").await.unwrap();
        assert_eq!(file.owner_id, 1);
        let sub = svc.create_folder(2, "Sub", Some(shared.id)).await.unwrap();
        assert_eq!(sub.owner_id, 1);

        let users = UserRepository::new(fx.db.pool());
        assert_eq!(users.storage_used(1).await.unwrap(), 3);
        assert_eq!(users.storage_used(2).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_file_is_idempotent_and_hides_file() {
        let fx = Fixture::new().await;
        let svc = fx.service();
        let file = svc.upload_file(1, None, "a.txt", b"abc").await.unwrap();

        assert!(svc.delete_file(1, file.id).await.unwrap());
        assert!(!svc.delete_file(1, file.id).await.unwrap());

        let hidden = svc.get_file(1, file.id).await;
        assert!(matches!(hidden, Err(DriveError::NotFound(_))));
        assert!(svc.list_children(1, None).await.unwrap().files.is_empty());

        let stranger = svc.delete_file(3, file.id).await;
        assert!(matches!(stranger, Err(DriveError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_folder_recycles_subtree_files() {
        let fx = Fixture::new().await;
        let svc = fx.service();

        let a = svc.create_folder(1, "A", None).await.unwrap();
        let b = svc.create_folder(1, "B", Some(a.id)).await.unwrap();
        svc.upload_file(1, Some(a.id), "one.txt", b"1").await.unwrap();
        svc.upload_file(1, Some(b.id), "two.txt", b"22").await.unwrap();
        svc.upload_file(1, None, "keep.txt", b"333").await.unwrap();

        let summary = svc.delete_folder(1, a.id).await.unwrap();
        assert_eq!(summary.folders_removed, 2);
        assert_eq!(summary.files_recycled, 2);

        let root = svc.list_children(1, None).await.unwrap();
        assert!(root.folders.is_empty());
        assert_eq!(root.files.len(), 1);

        let bin = FileRepository::new(fx.db.pool()).list_deleted(1).await.unwrap();
        assert_eq!(bin.len(), 2);
        // Recycled bytes stay charged.
        assert_eq!(UserRepository::new(fx.db.pool()).storage_used(1).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_bulk_delete_is_all_or_nothing() {
        let fx = Fixture::new().await;
        let svc = fx.service();

        let mine = svc.upload_file(1, None, "mine.txt", b"1").await.unwrap();
        let theirs = svc.upload_file(2, None, "theirs.txt", b"2").await.unwrap();

        let result = svc.bulk_delete(1, &[], &[mine.id, theirs.id]).await;
        assert!(matches!(result, Err(DriveError::Permission(_))));
        assert!(svc.get_file(1, mine.id).await.is_ok());

        let empty = svc.bulk_delete(1, &[], &[]).await;
        assert!(matches!(empty, Err(DriveError::BadRequest(_))));

        let folder = svc.create_folder(1, "F", None).await.unwrap();
        let nested = svc.create_folder(1, "N", Some(folder.id)).await.unwrap();
        let summary = svc
            .bulk_delete(1, &[folder.id, nested.id], &[mine.id, mine.id])
            .await
            .unwrap();
        assert_eq!(summary.files_recycled, 1);
        assert_eq!(summary.folders_removed, 2);

        // Repeating the delete of a recycled file is accepted.
        let again = svc.bulk_delete(1, &[], &[mine.id]).await.unwrap();
        assert_eq!(again.files_recycled, 0);
    }

    #[tokio::test]
    async fn test_bulk_move() {
        let fx = Fixture::new().await;
        let svc = fx.service();

        let dest = svc.create_folder(1, "Dest", None).await.unwrap();
        let f = svc.create_folder(1, "Folder", None).await.unwrap();
        let file = svc.upload_file(1, None, "a.txt", b"a").await.unwrap();

        let listing = svc
            .bulk_move(1, &[f.id], &[file.id], Some(dest.id))
            .await
            .unwrap();
        assert_eq!(listing.folders.len(), 1);
        assert_eq!(listing.files.len(), 1);

        // Collision at the destination rolls back the whole batch.
        svc.upload_file(1, None, "a.txt", b"again").await.unwrap();
        let other = svc.upload_file(1, None, "b.txt", b"b").await.unwrap();
        let root_a = svc.list_children(1, None).await.unwrap().files;
        let root_a = root_a.iter().find(|f| f.name == "a.txt").unwrap().id;
        let clash = svc.bulk_move(1, &[], &[other.id, root_a], Some(dest.id)).await;
        assert!(matches!(clash, Err(DriveError::Conflict(_))));
        assert_eq!(svc.get_file(1, other.id).await.unwrap().folder_id, None);

        // A folder cannot be moved into its own subtree.
        let cycle = svc.bulk_move(1, &[dest.id], &[], Some(f.id)).await;
        assert!(matches!(cycle, Err(DriveError::Conflict(_))));
    }
}
