//! Storage accounting.
//!
//! Usage totals come from the owner's `storage_used` counter, which covers
//! live files and the recycle bin. Breakdowns only count live files.

use std::collections::HashMap;

use serde::Serialize;

use crate::db::{DbPool, UserRepository};
use crate::file::{file_extension, FileRepository, FolderRepository};
use crate::share::{require_access, Permission, ShareTarget};
use crate::{DriveError, Result};

/// Name reported for the root of a drive.
pub const ROOT_NAME: &str = "Root";

/// Extension bucket for files without one.
pub const OTHER_TYPE: &str = "other";

/// Bytes per file extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeUsage {
    /// Lowercase extension, or `other`.
    pub extension: String,
    /// Total size in bytes.
    pub bytes: i64,
    /// Number of files.
    pub count: i64,
}

/// Bytes below a folder (recursive). `folder_id` 0 is the root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct FolderUsage {
    /// Top-level folder ID (0 for files in the root).
    pub folder_id: i64,
    /// Folder name.
    pub folder_name: String,
    /// Bytes in the whole subtree.
    pub bytes: i64,
    /// Files in the whole subtree.
    pub count: i64,
}

/// Bytes uploaded per month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct MonthUsage {
    /// Upload month.
    pub month: String,
    /// Bytes uploaded that month.
    pub bytes: i64,
    /// Files uploaded that month.
    pub count: i64,
}

/// Storage summary for one owner.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageSummary {
    /// Charged bytes, recycle bin included.
    pub total_used_bytes: i64,
    /// Quota in bytes.
    pub limit_bytes: i64,
    /// Share of the quota in use.
    pub percent_used: f64,
    /// Bytes in live files.
    pub live_bytes: i64,
    /// Bytes in the recycle bin.
    pub recycle_bytes: i64,
    /// Number of live files.
    pub file_count: i64,
    /// Live bytes per extension, largest first.
    pub by_type: Vec<TypeUsage>,
    /// Live bytes per top-level folder, largest first.
    pub by_folder: Vec<FolderUsage>,
    /// Live bytes per upload month, oldest first.
    pub by_month: Vec<MonthUsage>,
}

/// Kind of a breakdown entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    File,
}

/// One child in a folder breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakdownEntry {
    /// Folder or file.
    pub kind: EntryKind,
    /// Folder or file ID.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// File size, or the subtree total for folders.
    pub bytes: i64,
    /// 1 for files, subtree file count for folders.
    pub count: i64,
}

/// Children of a folder with their sizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderBreakdown {
    /// Folder ID (0 for the root).
    pub folder_id: i64,
    /// Folder name (`Root` for the root).
    pub folder_name: String,
    /// Direct children, largest first.
    pub children: Vec<BreakdownEntry>,
}

/// `used / limit * 100` rounded to two decimals; 0 without a limit.
pub fn percent_used(used: i64, limit: i64) -> f64 {
    if limit <= 0 {
        return 0.0;
    }
    let pct = used as f64 / limit as f64 * 100.0;
    (pct * 100.0).round() / 100.0
}

/// Storage accounting queries.
pub struct StorageAccounting<'a> {
    pool: &'a DbPool,
    quota_bytes: u64,
}

impl<'a> StorageAccounting<'a> {
    /// Create a new StorageAccounting reporting against `quota_bytes`.
    pub fn new(pool: &'a DbPool, quota_bytes: u64) -> Self {
        Self { pool, quota_bytes }
    }

    /// Usage summary for the caller's drive.
    pub async fn summary(&self, user_id: i64) -> Result<StorageSummary> {
        let total_used_bytes = UserRepository::new(self.pool).storage_used(user_id).await?;
        let limit_bytes = i64::try_from(self.quota_bytes).unwrap_or(i64::MAX);

        let (live_bytes, file_count, recycle_bytes): (i64, i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(CASE WHEN status = 'live' THEN size END), 0),
                    COUNT(CASE WHEN status = 'live' THEN 1 END),
                    COALESCE(SUM(CASE WHEN status = 'deleted' THEN size END), 0)
             FROM files WHERE owner_id = ?",
        )
        .bind(user_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        let by_month = sqlx::query_as::<_, MonthUsage>(
            "SELECT strftime('%Y-%m', created_at) AS month, SUM(size) AS bytes, COUNT(*) AS count
             FROM files WHERE owner_id = ? AND status = 'live'
             GROUP BY month ORDER BY month",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        let mut by_folder = self.folder_totals(user_id, None).await?;
        let (root_bytes, root_count) = self.direct_file_totals(user_id, None).await?;
        by_folder.push(FolderUsage {
            folder_id: 0,
            folder_name: ROOT_NAME.to_string(),
            bytes: root_bytes,
            count: root_count,
        });
        by_folder.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.folder_name.cmp(&b.folder_name)));

        Ok(StorageSummary {
            total_used_bytes,
            limit_bytes,
            percent_used: percent_used(total_used_bytes, limit_bytes),
            live_bytes,
            recycle_bytes,
            file_count,
            by_type: self.by_type(user_id).await?,
            by_folder,
            by_month,
        })
    }

    async fn by_type(&self, user_id: i64) -> Result<Vec<TypeUsage>> {
        let files = FileRepository::new(self.pool).list_live_by_owner(user_id).await?;

        let mut totals: HashMap<String, (i64, i64)> = HashMap::new();
        for file in files {
            let ext = file_extension(&file.name).unwrap_or_else(|| OTHER_TYPE.to_string());
            let entry = totals.entry(ext).or_default();
            entry.0 += file.size;
            entry.1 += 1;
        }

        let mut by_type: Vec<TypeUsage> = totals
            .into_iter()
            .map(|(extension, (bytes, count))| TypeUsage {
                extension,
                bytes,
                count,
            })
            .collect();
        by_type.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.extension.cmp(&b.extension)));
        Ok(by_type)
    }

    /// Child folders of `parent_id` with the live bytes of their subtrees.
    async fn folder_totals(&self, owner_id: i64, parent_id: Option<i64>) -> Result<Vec<FolderUsage>> {
        let rows = sqlx::query_as::<_, FolderUsage>(
            "WITH RECURSIVE tree(id, top_id) AS (
                 SELECT id, id FROM folders WHERE owner_id = ? AND parent_id IS ?
                 UNION ALL
                 SELECT f.id, t.top_id FROM folders f JOIN tree t ON f.parent_id = t.id
             )
             SELECT d.id AS folder_id, d.name AS folder_name,
                    COALESCE(SUM(fl.size), 0) AS bytes, COUNT(fl.id) AS count
             FROM folders d
             LEFT JOIN tree t ON t.top_id = d.id
             LEFT JOIN files fl ON fl.folder_id = t.id AND fl.status = 'live'
             WHERE d.owner_id = ? AND d.parent_id IS ?
             GROUP BY d.id, d.name",
        )
        .bind(owner_id)
        .bind(parent_id)
        .bind(owner_id)
        .bind(parent_id)
        .fetch_all(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(rows)
    }

    async fn direct_file_totals(&self, owner_id: i64, folder_id: Option<i64>) -> Result<(i64, i64)> {
        let totals: (i64, i64) = sqlx::query_as(
            "SELECT COALESCE(SUM(size), 0), COUNT(*) FROM files
             WHERE owner_id = ? AND folder_id IS ? AND status = 'live'",
        )
        .bind(owner_id)
        .bind(folder_id)
        .fetch_one(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(totals)
    }

    /// Children of a folder (None for the caller's root) with their sizes.
    pub async fn folder_breakdown(&self, user_id: i64, folder_id: Option<i64>) -> Result<FolderBreakdown> {
        let (owner_id, folder_name) = match folder_id {
            None => (user_id, ROOT_NAME.to_string()),
            Some(id) => {
                {
                    let mut conn = self
                        .pool
                        .acquire()
                        .await
                        .map_err(|e| DriveError::Database(e.to_string()))?;
                    require_access(&mut conn, user_id, ShareTarget::Folder(id), Permission::View)
                        .await?;
                }
                let folder = FolderRepository::new(self.pool)
                    .get_by_id(id)
                    .await?
                    .ok_or_else(|| DriveError::NotFound("folder".to_string()))?;
                (folder.owner_id, folder.name)
            }
        };

        let mut children: Vec<BreakdownEntry> = self
            .folder_totals(owner_id, folder_id)
            .await?
            .into_iter()
            .map(|f| BreakdownEntry {
                kind: EntryKind::Folder,
                id: f.folder_id,
                name: f.folder_name,
                bytes: f.bytes,
                count: f.count,
            })
            .collect();

        let files = FileRepository::new(self.pool)
            .list_live(owner_id, folder_id)
            .await?;
        children.extend(files.into_iter().map(|f| BreakdownEntry {
            kind: EntryKind::File,
            id: f.id,
            name: f.name,
            bytes: f.size,
            count: 1,
        }));
        children.sort_by(|a, b| b.bytes.cmp(&a.bytes).then_with(|| a.name.cmp(&b.name)));

        Ok(FolderBreakdown {
            folder_id: folder_id.unwrap_or(0),
            folder_name,
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::raw_sql(
            "INSERT INTO users (id, username, email, password, storage_used) VALUES
                (1, 'owner', 'o@x.io', 'h', 1700), (2, 'other', 'x@x.io', 'h', 0);
             INSERT INTO folders (id, name, parent_id, owner_id) VALUES
                (1, 'Photos', NULL, 1), (2, 'Trips', 1, 1), (3, 'Docs', NULL, 1), (4, 'Empty', NULL, 1);
             INSERT INTO files (name, folder_id, owner_id, stored_name, size, checksum, created_at) VALUES
                ('a.jpg', 1, 1, 's1', 300, 'c', '2024-01-05 10:00:00'),
                ('b.JPG', 2, 1, 's2', 500, 'c', '2024-02-01 10:00:00'),
                ('notes.txt', 3, 1, 's3', 100, 'c', '2024-02-11 10:00:00'),
                ('README', NULL, 1, 's4', 50, 'c', '2024-02-12 10:00:00');
             INSERT INTO files (name, folder_id, owner_id, stored_name, size, checksum, status, deleted_at)
                VALUES ('gone.bin', 3, 1, 's5', 750, 'c', 'deleted', datetime('now'));",
        )
        .execute(db.pool())
        .await
        .unwrap();
        db
    }

    #[test]
    fn test_percent_used() {
        assert_eq!(percent_used(0, 0), 0.0);
        assert_eq!(percent_used(50, 200), 25.0);
        assert_eq!(percent_used(1, 3), 33.33);
        assert_eq!(percent_used(2, 3), 66.67);
    }

    #[tokio::test]
    async fn test_summary() {
        let db = setup().await;
        let summary = StorageAccounting::new(db.pool(), 10_000)
            .summary(1)
            .await
            .unwrap();

        assert_eq!(summary.total_used_bytes, 1700);
        assert_eq!(summary.limit_bytes, 10_000);
        assert_eq!(summary.percent_used, 17.0);
        assert_eq!(summary.live_bytes, 950);
        assert_eq!(summary.recycle_bytes, 750);
        assert_eq!(summary.file_count, 4);

        let types: Vec<(&str, i64, i64)> = summary
            .by_type
            .iter()
            .map(|t| (t.extension.as_str(), t.bytes, t.count))
            .collect();
        assert_eq!(types, vec![("jpg", 800, 2), ("txt", 100, 1), ("other", 50, 1)]);

        let folders: Vec<(i64, &str, i64)> = summary
            .by_folder
            .iter()
            .map(|f| (f.folder_id, f.folder_name.as_str(), f.bytes))
            .collect();
        assert_eq!(
            folders,
            vec![(1, "Photos", 800), (3, "Docs", 100), (0, "Root", 50), (4, "Empty", 0)]
        );

        let months: Vec<(&str, i64, i64)> = summary
            .by_month
            .iter()
            .map(|m| (m.month.as_str(), m.bytes, m.count))
            .collect();
        assert_eq!(months, vec![("2024-01", 300, 1), ("2024-02", 650, 3)]);
    }

    #[tokio::test]
    async fn test_folder_breakdown() {
        let db = setup().await;
        let accounting = StorageAccounting::new(db.pool(), 10_000);

        let root = accounting.folder_breakdown(1, None).await.unwrap();
        assert_eq!(root.folder_id, 0);
        assert_eq!(root.folder_name, "Root");
        let names: Vec<&str> = root.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Photos", "Docs", "README", "Empty"]);
        assert_eq!(root.children[2].kind, EntryKind::File);

        let photos = accounting.folder_breakdown(1, Some(1)).await.unwrap();
        assert_eq!(photos.folder_name, "Photos");
        let entries: Vec<(EntryKind, &str, i64)> = photos
            .children
            .iter()
            .map(|c| (c.kind, c.name.as_str(), c.bytes))
            .collect();
        assert_eq!(
            entries,
            vec![(EntryKind::Folder, "Trips", 500), (EntryKind::File, "a.jpg", 300)]
        );
    }

    #[tokio::test]
    async fn test_folder_breakdown_access() {
        let db = setup().await;
        let accounting = StorageAccounting::new(db.pool(), 10_000);

        let denied = accounting.folder_breakdown(2, Some(1)).await;
        assert!(matches!(denied, Err(DriveError::Permission(_))));

        let missing = accounting.folder_breakdown(1, Some(99)).await;
        assert!(matches!(missing, Err(DriveError::NotFound(_))));

        let empty = accounting.folder_breakdown(2, None).await.unwrap();
        assert!(empty.children.is_empty());
    }
}
