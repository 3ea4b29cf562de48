//! File records and repository.

use std::path::Path;

use sqlx::SqliteConnection;

use crate::db::{is_unique_violation, DbPool};
use crate::{DriveError, Result};

const FILE_COLUMNS: &str = "id, name, folder_id, owner_id, stored_name, size, checksum, status,
                            original_folder_id, deleted_at, created_at, updated_at";

/// Lifecycle state of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Visible in the tree.
    Live,
    /// In the recycle bin.
    Deleted,
}

impl FileStatus {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Live => "live",
            FileStatus::Deleted => "deleted",
        }
    }

    /// Parse from the database representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "live" => Some(FileStatus::Live),
            "deleted" => Some(FileStatus::Deleted),
            _ => None,
        }
    }
}

/// A stored file.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct FileRecord {
    /// Unique file ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Containing folder (None for the owner's root).
    pub folder_id: Option<i64>,
    /// Owner, charged for the file's bytes.
    pub owner_id: i64,
    /// Blob name in storage.
    pub stored_name: String,
    /// Size in bytes.
    pub size: i64,
    /// SHA-256 of the content.
    pub checksum: String,
    /// "live" or "deleted".
    pub status: String,
    /// Folder the file was in when it was deleted.
    pub original_folder_id: Option<i64>,
    /// When the file entered the recycle bin.
    pub deleted_at: Option<String>,
    /// Upload timestamp.
    pub created_at: String,
    /// Last rename/move timestamp.
    pub updated_at: String,
}

impl FileRecord {
    /// Get the status as enum. Unknown values read as `Deleted`.
    pub fn status(&self) -> FileStatus {
        FileStatus::parse(&self.status).unwrap_or(FileStatus::Deleted)
    }

    /// Check if the file is live.
    pub fn is_live(&self) -> bool {
        self.status() == FileStatus::Live
    }

    /// Lowercase extension of the name, if any.
    pub fn extension(&self) -> Option<String> {
        file_extension(&self.name)
    }

    /// MIME type guessed from the name.
    pub fn mime_type(&self) -> String {
        mime_guess::from_path(&self.name)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    }
}

/// Lowercase extension of a file name (`report.PDF` → `pdf`).
pub fn file_extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|s| s.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| ext.to_lowercase())
}

/// Data for creating a file record.
#[derive(Debug, Clone)]
pub struct NewFile {
    /// Display name.
    pub name: String,
    /// Containing folder.
    pub folder_id: Option<i64>,
    /// Owner ID.
    pub owner_id: i64,
    /// Blob name in storage.
    pub stored_name: String,
    /// Size in bytes.
    pub size: i64,
    /// SHA-256 of the content.
    pub checksum: String,
}

impl NewFile {
    /// Create a new file record at the owner's root.
    pub fn new(
        name: impl Into<String>,
        owner_id: i64,
        stored_name: impl Into<String>,
        size: i64,
        checksum: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            folder_id: None,
            owner_id,
            stored_name: stored_name.into(),
            size,
            checksum: checksum.into(),
        }
    }

    /// Set the containing folder.
    pub fn in_folder(mut self, folder_id: Option<i64>) -> Self {
        self.folder_id = folder_id;
        self
    }
}

fn conflict_on_duplicate(e: sqlx::Error) -> DriveError {
    if is_unique_violation(&e) {
        DriveError::Conflict("a file with this name already exists here".to_string())
    } else {
        DriveError::Database(e.to_string())
    }
}

/// Repository for file records.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a file by ID, whatever its status.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(file)
    }

    /// List live files in a folder (None for the owner's root), by name.
    pub async fn list_live(&self, owner_id: i64, folder_id: Option<i64>) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE owner_id = ? AND folder_id IS ? AND status = 'live'
             ORDER BY name COLLATE NOCASE, id"
        ))
        .bind(owner_id)
        .bind(folder_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List every live file of an owner.
    pub async fn list_live_by_owner(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE owner_id = ? AND status = 'live' ORDER BY id"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List an owner's recycle bin, most recently deleted first.
    pub async fn list_deleted(&self, owner_id: i64) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE owner_id = ? AND status = 'deleted'
             ORDER BY deleted_at DESC, id DESC"
        ))
        .bind(owner_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(files)
    }

    /// List recycled files (any owner) deleted before `cutoff`.
    pub async fn list_expired(&self, cutoff: &str) -> Result<Vec<FileRecord>> {
        let files = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files
             WHERE status = 'deleted' AND deleted_at < ?
             ORDER BY deleted_at, id"
        ))
        .bind(cutoff)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(files)
    }

    /// Rename a live file.
    pub async fn rename(&self, id: i64, name: &str) -> Result<Option<FileRecord>> {
        let result = sqlx::query(
            "UPDATE files SET name = ?, updated_at = datetime('now') WHERE id = ? AND status = 'live'",
        )
        .bind(name)
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(conflict_on_duplicate)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Insert a file record on an existing connection.
    pub async fn insert(conn: &mut SqliteConnection, file: &NewFile) -> Result<FileRecord> {
        let result = sqlx::query(
            "INSERT INTO files (name, folder_id, owner_id, stored_name, size, checksum)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&file.name)
        .bind(file.folder_id)
        .bind(file.owner_id)
        .bind(&file.stored_name)
        .bind(file.size)
        .bind(&file.checksum)
        .execute(&mut *conn)
        .await
        .map_err(conflict_on_duplicate)?;

        Self::fetch(conn, result.last_insert_rowid())
            .await?
            .ok_or_else(|| DriveError::NotFound("file".to_string()))
    }

    /// Get a file by ID on an existing connection, whatever its status.
    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<FileRecord>> {
        let file = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(file)
    }

    /// Check if a live sibling file already uses `name`.
    pub async fn name_taken(
        conn: &mut SqliteConnection,
        owner_id: i64,
        folder_id: Option<i64>,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM files
                 WHERE owner_id = ? AND folder_id IS ? AND name = ? AND status = 'live'
                   AND id IS NOT ?)",
        )
        .bind(owner_id)
        .bind(folder_id)
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(taken)
    }

    /// Move a live file to another folder.
    pub async fn set_folder(conn: &mut SqliteConnection, id: i64, folder_id: Option<i64>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET folder_id = ?, updated_at = datetime('now')
             WHERE id = ? AND status = 'live'",
        )
        .bind(folder_id)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(conflict_on_duplicate)?;

        Ok(result.rows_affected() > 0)
    }

    /// Move a live file to the recycle bin. Returns `false` if it was not live.
    pub async fn mark_deleted(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET status = 'deleted', original_folder_id = folder_id,
                              deleted_at = datetime('now')
             WHERE id = ? AND status = 'live'",
        )
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Move every live file directly inside `folder_id` to the recycle bin.
    pub async fn mark_deleted_in_folder(conn: &mut SqliteConnection, folder_id: i64) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE files SET status = 'deleted', original_folder_id = folder_id,
                              deleted_at = datetime('now')
             WHERE folder_id = ? AND status = 'live'",
        )
        .bind(folder_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected())
    }

    /// Bring a recycled file back into `folder_id`.
    pub async fn restore(conn: &mut SqliteConnection, id: i64, folder_id: Option<i64>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE files SET status = 'live', folder_id = ?, original_folder_id = NULL,
                              deleted_at = NULL, updated_at = datetime('now')
             WHERE id = ? AND status = 'deleted'",
        )
        .bind(folder_id)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(conflict_on_duplicate)?;

        Ok(result.rows_affected() > 0)
    }

    /// Remove a file row.
    pub async fn delete_row(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::raw_sql(
            "INSERT INTO users (username, email, password) VALUES ('owner', 'o@x.io', 'h');
             INSERT INTO folders (name, owner_id) VALUES ('Docs', 1);",
        )
        .execute(db.pool())
        .await
        .unwrap();
        db
    }

    async fn insert(db: &Database, name: &str, folder_id: Option<i64>) -> FileRecord {
        let mut conn = db.pool().acquire().await.unwrap();
        let stored = format!("{name}.blob");
        FileRepository::insert(
            &mut conn,
            &NewFile::new(name, 1, stored, 42, "abc").in_folder(folder_id),
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_file_status_roundtrip() {
        assert_eq!(FileStatus::parse("live"), Some(FileStatus::Live));
        assert_eq!(FileStatus::parse("deleted"), Some(FileStatus::Deleted));
        assert_eq!(FileStatus::parse("gone"), None);
        assert_eq!(FileStatus::Deleted.as_str(), "deleted");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("Report.PDF").as_deref(), Some("pdf"));
        assert_eq!(file_extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(file_extension("Makefile"), None);
        assert_eq!(file_extension(".bashrc"), None);
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = setup_db().await;
        let file = insert(&db, "notes.txt", Some(1)).await;
        insert(&db, "root.txt", None).await;

        assert!(file.is_live());
        assert_eq!(file.size, 42);
        assert_eq!(file.mime_type(), "text/plain");

        let repo = FileRepository::new(db.pool());
        assert_eq!(repo.list_live(1, Some(1)).await.unwrap().len(), 1);
        assert_eq!(repo.list_live(1, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_live_name_conflicts() {
        let db = setup_db().await;
        insert(&db, "a.txt", None).await;

        let mut conn = db.pool().acquire().await.unwrap();
        let dup = FileRepository::insert(&mut conn, &NewFile::new("a.txt", 1, "dup.blob", 1, "x")).await;
        assert!(matches!(dup, Err(DriveError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_deleted_files_free_their_name() {
        let db = setup_db().await;
        let first = insert(&db, "a.txt", Some(1)).await;

        {
            let mut conn = db.pool().acquire().await.unwrap();
            assert!(FileRepository::mark_deleted(&mut conn, first.id).await.unwrap());
            assert!(!FileRepository::mark_deleted(&mut conn, first.id).await.unwrap());
        }

        let second = insert(&db, "a.txt", Some(1)).await;
        assert_ne!(first.id, second.id);

        let repo = FileRepository::new(db.pool());
        let bin = repo.list_deleted(1).await.unwrap();
        assert_eq!(bin.len(), 1);
        assert_eq!(bin[0].original_folder_id, Some(1));
        assert!(bin[0].deleted_at.is_some());
        assert_eq!(bin[0].status(), FileStatus::Deleted);

        // Restoring next to a live namesake violates the live-name index.
        let mut conn = db.pool().acquire().await.unwrap();
        let restored = FileRepository::restore(&mut conn, first.id, Some(1)).await;
        assert!(matches!(restored, Err(DriveError::Conflict(_))));
        assert!(FileRepository::restore(&mut conn, first.id, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_rename_and_move() {
        let db = setup_db().await;
        let file = insert(&db, "a.txt", None).await;
        let repo = FileRepository::new(db.pool());

        let renamed = repo.rename(file.id, "b.txt").await.unwrap().unwrap();
        assert_eq!(renamed.name, "b.txt");

        {
            let mut conn = db.pool().acquire().await.unwrap();
            assert!(FileRepository::set_folder(&mut conn, file.id, Some(1)).await.unwrap());
            assert!(FileRepository::name_taken(&mut conn, 1, Some(1), "b.txt", None)
                .await
                .unwrap());
            assert!(!FileRepository::name_taken(&mut conn, 1, Some(1), "b.txt", Some(file.id))
                .await
                .unwrap());
        }

        assert_eq!(repo.list_live(1, Some(1)).await.unwrap().len(), 1);
        assert!(repo.rename(999, "x").await.unwrap().is_none());
    }
}
