//! Starred folders and files.

use tracing::debug;

use crate::db::DbPool;
use crate::file::{FileRecord, Folder};
use crate::share::{require_access, Permission, ShareTarget};
use crate::{DriveError, Result};

/// A user's starred items.
#[derive(Debug, Clone, Default)]
pub struct StarredItems {
    pub folders: Vec<Folder>,
    pub files: Vec<FileRecord>,
}

/// Repository for stars.
pub struct StarRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> StarRepository<'a> {
    /// Create a new StarRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Star a node the caller can view. Starring twice is a no-op.
    pub async fn star(&self, user_id: i64, target: ShareTarget) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        require_access(&mut conn, user_id, target, Permission::View).await?;

        sqlx::query("INSERT OR IGNORE INTO starred (user_id, file_id, folder_id) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(target.file_id())
            .bind(target.folder_id())
            .execute(&mut *conn)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        debug!(user_id, target = target.kind(), target_id = target.id(), "Starred");
        Ok(())
    }

    /// Remove a star. Returns `false` if it was not starred.
    pub async fn unstar(&self, user_id: i64, target: ShareTarget) -> Result<bool> {
        let sql = match target {
            ShareTarget::File(_) => "DELETE FROM starred WHERE user_id = ? AND file_id = ?",
            ShareTarget::Folder(_) => "DELETE FROM starred WHERE user_id = ? AND folder_id = ?",
        };
        let result = sqlx::query(sql)
            .bind(user_id)
            .bind(target.id())
            .execute(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Starred folders and live files, most recently starred first.
    pub async fn starred(&self, user_id: i64) -> Result<StarredItems> {
        let folders = sqlx::query_as::<_, Folder>(
            "SELECT d.id, d.name, d.parent_id, d.owner_id, d.created_at, d.updated_at
             FROM starred s JOIN folders d ON d.id = s.folder_id
             WHERE s.user_id = ?
             ORDER BY s.created_at DESC, s.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        let files = sqlx::query_as::<_, FileRecord>(
            "SELECT f.id, f.name, f.folder_id, f.owner_id, f.stored_name, f.size, f.checksum,
                    f.status, f.original_folder_id, f.deleted_at, f.created_at, f.updated_at
             FROM starred s JOIN files f ON f.id = s.file_id
             WHERE s.user_id = ? AND f.status = 'live'
             ORDER BY s.created_at DESC, s.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(StarredItems { folders, files })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::raw_sql(
            "INSERT INTO users (username, email, password) VALUES
                ('owner', 'o@x.io', 'h'), ('other', 'x@x.io', 'h');
             INSERT INTO folders (id, name, owner_id) VALUES (1, 'Docs', 1);
             INSERT INTO files (id, name, folder_id, owner_id, stored_name, size, checksum) VALUES
                (1, 'a.txt', 1, 1, 's1', 1, 'c'), (2, 'b.txt', 1, 1, 's2', 1, 'c');",
        )
        .execute(db.pool())
        .await
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_star_is_idempotent() {
        let db = setup().await;
        let stars = StarRepository::new(db.pool());

        stars.star(1, ShareTarget::File(1)).await.unwrap();
        stars.star(1, ShareTarget::File(1)).await.unwrap();
        stars.star(1, ShareTarget::Folder(1)).await.unwrap();

        let items = stars.starred(1).await.unwrap();
        assert_eq!(items.files.len(), 1);
        assert_eq!(items.folders.len(), 1);
        assert_eq!(items.folders[0].name, "Docs");
    }

    #[tokio::test]
    async fn test_unstar() {
        let db = setup().await;
        let stars = StarRepository::new(db.pool());
        stars.star(1, ShareTarget::File(2)).await.unwrap();

        assert!(stars.unstar(1, ShareTarget::File(2)).await.unwrap());
        assert!(!stars.unstar(1, ShareTarget::File(2)).await.unwrap());
        assert!(stars.starred(1).await.unwrap().files.is_empty());
    }

    #[tokio::test]
    async fn test_star_requires_view_access() {
        let db = setup().await;
        let stars = StarRepository::new(db.pool());

        let denied = stars.star(2, ShareTarget::Folder(1)).await;
        assert!(matches!(denied, Err(DriveError::Permission(_))));
        let missing = stars.star(1, ShareTarget::File(42)).await;
        assert!(matches!(missing, Err(DriveError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_recycled_files_hidden() {
        let db = setup().await;
        let stars = StarRepository::new(db.pool());
        stars.star(1, ShareTarget::File(1)).await.unwrap();

        sqlx::query("UPDATE files SET status = 'deleted' WHERE id = 1")
            .execute(db.pool())
            .await
            .unwrap();
        assert!(stars.starred(1).await.unwrap().files.is_empty());
    }
}
