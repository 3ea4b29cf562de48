//! Name search over a user's folders and live files.

use crate::db::DbPool;
use crate::file::{FileRecord, Folder};
use crate::{DriveError, Result};

/// Matching folders and files, most recently updated first.
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    /// Folders whose name contains the query.
    pub folders: Vec<Folder>,
    /// Live files whose name contains the query.
    pub files: Vec<FileRecord>,
}

/// Unicode case-folded substring test.
///
/// SQLite's `LOWER()` only folds ASCII, so names are compared here instead.
fn name_matches(name: &str, folded_query: &str) -> bool {
    name.to_lowercase().contains(folded_query)
}

/// Case-insensitive substring search on the caller's own names.
///
/// `parent_id` narrows the search to the direct children of one folder
/// (`Some(None)` is the root). Wildcard characters in `query` have no
/// special meaning.
pub async fn search(
    pool: &DbPool,
    user_id: i64,
    query: &str,
    parent_id: Option<Option<i64>>,
) -> Result<SearchResults> {
    let query = query.trim();
    if query.is_empty() {
        return Err(DriveError::BadRequest("query 'q' is required".to_string()));
    }
    let folded = query.to_lowercase();
    let scoped = parent_id.is_some();
    let parent = parent_id.flatten();

    let folders = sqlx::query_as::<_, Folder>(
        "SELECT id, name, parent_id, owner_id, created_at, updated_at FROM folders
         WHERE owner_id = ? AND (? = 0 OR parent_id IS ?)
         ORDER BY updated_at DESC, id DESC",
    )
    .bind(user_id)
    .bind(scoped)
    .bind(parent)
    .fetch_all(pool)
    .await
    .map_err(|e| DriveError::Database(e.to_string()))?;

    let files = sqlx::query_as::<_, FileRecord>(
        "SELECT id, name, folder_id, owner_id, stored_name, size, checksum, status,
                original_folder_id, deleted_at, created_at, updated_at
         FROM files
         WHERE owner_id = ? AND status = 'live' AND (? = 0 OR folder_id IS ?)
         ORDER BY updated_at DESC, id DESC",
    )
    .bind(user_id)
    .bind(scoped)
    .bind(parent)
    .fetch_all(pool)
    .await
    .map_err(|e| DriveError::Database(e.to_string()))?;

    Ok(SearchResults {
        folders: folders
            .into_iter()
            .filter(|f| name_matches(&f.name, &folded))
            .collect(),
        files: files
            .into_iter()
            .filter(|f| name_matches(&f.name, &folded))
            .collect(),
    })
}
