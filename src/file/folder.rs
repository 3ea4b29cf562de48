//! Folder types and repository.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use crate::db::{is_unique_violation, DbPool};
use crate::{DriveError, Result};

const FOLDER_COLUMNS: &str = "id, name, parent_id, owner_id, created_at, updated_at";

/// A folder in a user's drive.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Folder {
    /// Unique folder ID.
    pub id: i64,
    /// Folder name, unique among its siblings.
    pub name: String,
    /// Parent folder ID (None for the owner's root).
    pub parent_id: Option<i64>,
    /// Owner of the folder and everything below it.
    pub owner_id: i64,
    /// When the folder was created.
    pub created_at: String,
    /// When the folder was last renamed or moved.
    pub updated_at: String,
}

/// Data for creating a new folder.
#[derive(Debug, Clone)]
pub struct NewFolder {
    /// Folder name.
    pub name: String,
    /// Parent folder ID (None for the root).
    pub parent_id: Option<i64>,
    /// Owner ID.
    pub owner_id: i64,
}

impl NewFolder {
    /// Create a new root-level folder.
    pub fn new(name: impl Into<String>, owner_id: i64) -> Self {
        Self {
            name: name.into(),
            parent_id: None,
            owner_id,
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: Option<i64>) -> Self {
        self.parent_id = parent_id;
        self
    }
}

/// Builder for updating a folder.
#[derive(Debug, Clone, Default)]
pub struct FolderUpdate {
    /// New folder name.
    pub name: Option<String>,
    /// New parent folder ID.
    pub parent_id: Option<Option<i64>>,
}

impl FolderUpdate {
    /// Create a new FolderUpdate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the parent folder ID.
    pub fn parent_id(mut self, parent_id: Option<i64>) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.parent_id.is_none()
    }
}

fn conflict_on_duplicate(e: sqlx::Error) -> DriveError {
    if is_unique_violation(&e) {
        DriveError::Conflict("a folder with this name already exists here".to_string())
    } else {
        DriveError::Database(e.to_string())
    }
}

/// Repository for folder operations.
pub struct FolderRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FolderRepository<'a> {
    /// Create a new FolderRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new folder.
    ///
    /// A sibling with the same name yields `Conflict`.
    pub async fn create(&self, folder: &NewFolder) -> Result<Folder> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        Self::insert(&mut conn, folder).await
    }

    /// Get a folder by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(folder)
    }

    /// List the child folders of `parent_id` (None for the owner's root), by name.
    pub async fn list_children(&self, owner_id: i64, parent_id: Option<i64>) -> Result<Vec<Folder>> {
        let folders = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders
             WHERE owner_id = ? AND parent_id IS ?
             ORDER BY name COLLATE NOCASE, id"
        ))
        .bind(owner_id)
        .bind(parent_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(folders)
    }

    /// Update a folder.
    pub async fn update(&self, id: i64, update: &FolderUpdate) -> Result<Option<Folder>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        Self::apply_update(&mut conn, id, update).await
    }

    /// Delete a folder by ID. Descendant folders go with it.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Get the path from root to a folder (both ends included).
    pub async fn get_path(&self, id: i64) -> Result<Vec<Folder>> {
        let mut path: Vec<Folder> = Vec::new();
        let mut current_id = Some(id);

        while let Some(folder_id) = current_id {
            if path.iter().any(|f| f.id == folder_id) {
                break;
            }
            match self.get_by_id(folder_id).await? {
                Some(folder) => {
                    current_id = folder.parent_id;
                    path.push(folder);
                }
                None => break,
            }
        }

        path.reverse();
        Ok(path)
    }

    /// Insert a folder on an existing connection.
    pub async fn insert(conn: &mut SqliteConnection, folder: &NewFolder) -> Result<Folder> {
        let result = sqlx::query("INSERT INTO folders (name, parent_id, owner_id) VALUES (?, ?, ?)")
            .bind(&folder.name)
            .bind(folder.parent_id)
            .bind(folder.owner_id)
            .execute(&mut *conn)
            .await
            .map_err(conflict_on_duplicate)?;

        Self::fetch(conn, result.last_insert_rowid())
            .await?
            .ok_or_else(|| DriveError::NotFound("folder".to_string()))
    }

    /// Get a folder by ID on an existing connection.
    pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Folder>> {
        let folder = sqlx::query_as::<_, Folder>(&format!(
            "SELECT {FOLDER_COLUMNS} FROM folders WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(folder)
    }

    /// Apply an update on an existing connection.
    pub async fn apply_update(
        conn: &mut SqliteConnection,
        id: i64,
        update: &FolderUpdate,
    ) -> Result<Option<Folder>> {
        if update.is_empty() {
            return Self::fetch(conn, id).await;
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE folders SET ");
        let mut separated = query.separated(", ");

        if let Some(ref name) = update.name {
            separated.push("name = ");
            separated.push_bind_unseparated(name.clone());
        }
        if let Some(parent_id) = update.parent_id {
            separated.push("parent_id = ");
            separated.push_bind_unseparated(parent_id);
        }
        separated.push("updated_at = datetime('now')");

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(&mut *conn)
            .await
            .map_err(conflict_on_duplicate)?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::fetch(conn, id).await
    }

    /// Delete a folder on an existing connection.
    pub async fn delete_in(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM folders WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// IDs of a folder and all of its descendants.
    pub async fn subtree_ids(conn: &mut SqliteConnection, id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "WITH RECURSIVE subtree(id) AS (
                 SELECT id FROM folders WHERE id = ?
                 UNION
                 SELECT f.id FROM folders f JOIN subtree s ON f.parent_id = s.id
             )
             SELECT id FROM subtree",
        )
        .bind(id)
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(ids)
    }

    /// Check if a sibling folder already uses `name`.
    pub async fn name_taken(
        conn: &mut SqliteConnection,
        owner_id: i64,
        parent_id: Option<i64>,
        name: &str,
        exclude_id: Option<i64>,
    ) -> Result<bool> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM folders
                 WHERE owner_id = ? AND parent_id IS ? AND name = ? AND id IS NOT ?)",
        )
        .bind(owner_id)
        .bind(parent_id)
        .bind(name)
        .bind(exclude_id)
        .fetch_one(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(taken)
    }
}
