//! Share repository.

use rand::Rng;
use sqlx::SqliteConnection;

use super::types::{Permission, Share, ShareTarget};
use crate::db::DbPool;
use crate::{DriveError, Result};

const SHARE_COLUMNS: &str =
    "id, file_id, folder_id, token, permission, is_public, created_by, created_at, updated_at";

/// Length of generated share tokens.
pub const TOKEN_LENGTH: usize = 22;

const TOKEN_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Generate a random URL-safe share token.
pub fn generate_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..TOKEN_CHARS.len());
            TOKEN_CHARS[idx] as char
        })
        .collect()
}

/// A user on a share's access list.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ShareUser {
    /// User ID.
    pub id: i64,
    /// Display name.
    pub username: String,
    /// Email.
    pub email: String,
}

/// A node shared with a user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SharedItem {
    /// Share ID.
    pub share_id: i64,
    /// Share token.
    pub token: String,
    /// Stored permission.
    pub permission: String,
    /// Shared file.
    pub file_id: Option<i64>,
    /// Shared folder.
    pub folder_id: Option<i64>,
    /// Name of the shared node.
    pub name: String,
    /// Display name of the user who shared it.
    pub shared_by: String,
    /// When it was shared.
    pub created_at: String,
}

/// Repository for shares and their access lists.
pub struct ShareRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ShareRepository<'a> {
    /// Create a new ShareRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Get a share by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Share>> {
        let share = sqlx::query_as::<_, Share>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(share)
    }

    /// Get a share by token.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Share>> {
        let share = sqlx::query_as::<_, Share>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE token = ?"
        ))
        .bind(token)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(share)
    }

    /// List every share on a node, newest first.
    pub async fn list_for_target(&self, target: ShareTarget) -> Result<Vec<Share>> {
        let column = match target {
            ShareTarget::File(_) => "file_id",
            ShareTarget::Folder(_) => "folder_id",
        };
        let shares = sqlx::query_as::<_, Share>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE {column} = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(target.id())
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(shares)
    }

    /// List the users on a share's access list.
    pub async fn access_users(&self, share_id: i64) -> Result<Vec<ShareUser>> {
        let users = sqlx::query_as::<_, ShareUser>(
            "SELECT u.id, u.username, u.email FROM share_access a
             JOIN users u ON u.id = a.user_id
             WHERE a.share_id = ? ORDER BY u.username COLLATE NOCASE, u.id",
        )
        .bind(share_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(users)
    }

    /// Check if a user is on a share's access list.
    pub async fn is_listed(&self, share_id: i64, user_id: i64) -> Result<bool> {
        let listed: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM share_access WHERE share_id = ? AND user_id = ?)",
        )
        .bind(share_id)
        .bind(user_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(listed)
    }

    /// Nodes shared with a user through user shares. Recycled files are left out.
    pub async fn shared_with(&self, user_id: i64) -> Result<Vec<SharedItem>> {
        let items = sqlx::query_as::<_, SharedItem>(
            "SELECT s.id AS share_id, s.token, s.permission, s.file_id, s.folder_id,
                    COALESCE(f.name, d.name) AS name, u.username AS shared_by, s.created_at
             FROM share_access a
             JOIN shares s ON s.id = a.share_id
             JOIN users u ON u.id = s.created_by
             LEFT JOIN files f ON f.id = s.file_id
             LEFT JOIN folders d ON d.id = s.folder_id
             WHERE a.user_id = ? AND s.is_public = 0
               AND (d.id IS NOT NULL OR f.status = 'live')
             ORDER BY s.created_at DESC, s.id DESC",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(items)
    }

    /// Insert a share with a fresh token.
    pub async fn insert(
        conn: &mut SqliteConnection,
        target: ShareTarget,
        permission: Permission,
        is_public: bool,
        created_by: i64,
    ) -> Result<Share> {
        let result = sqlx::query(
            "INSERT INTO shares (file_id, folder_id, token, permission, is_public, created_by)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(target.file_id())
        .bind(target.folder_id())
        .bind(generate_token())
        .bind(permission.as_str())
        .bind(is_public)
        .bind(created_by)
        .execute(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Self::fetch(conn, result.last_insert_rowid())
            .await?
            .ok_or_else(|| DriveError::NotFound("share".to_string()))
    }

    /// Get a share by ID on an existing connection.
    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Share>> {
        let share = sqlx::query_as::<_, Share>(&format!(
            "SELECT {SHARE_COLUMNS} FROM shares WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(share)
    }

    /// Change a share's permission and public flag.
    pub async fn update_flags(
        conn: &mut SqliteConnection,
        id: i64,
        permission: Permission,
        is_public: bool,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE shares SET permission = ?, is_public = ?, updated_at = datetime('now')
             WHERE id = ?",
        )
        .bind(permission.as_str())
        .bind(is_public)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace a share's access list.
    pub async fn replace_access(conn: &mut SqliteConnection, share_id: i64, user_ids: &[i64]) -> Result<()> {
        sqlx::query("DELETE FROM share_access WHERE share_id = ?")
            .bind(share_id)
            .execute(&mut *conn)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        for user_id in user_ids {
            sqlx::query("INSERT OR IGNORE INTO share_access (share_id, user_id) VALUES (?, ?)")
                .bind(share_id)
                .bind(user_id)
                .execute(&mut *conn)
                .await
                .map_err(|e| DriveError::Database(e.to_string()))?;
        }

        Ok(())
    }

    /// Delete a share. Its access list goes with it.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM shares WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }
}
