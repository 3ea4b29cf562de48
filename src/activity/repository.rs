//! Activity log repository.

use sqlx::{QueryBuilder, Sqlite};
use tracing::warn;

use super::types::{ActivityFilter, ActivityLog, NewActivity, SECURITY_ACTIONS};
use crate::datetime::{end_of_day, start_of_day};
use crate::db::DbPool;
use crate::{DriveError, Result};

const LOG_SELECT: &str = "SELECT a.id, a.user_id, u.username, a.action, a.resource_type,
                                 a.resource_id, a.details, a.ip_address, a.created_at
                          FROM activity_logs a JOIN users u ON u.id = a.user_id
                          WHERE a.user_id = ";

/// Default page size for listings.
pub const DEFAULT_LIMIT: i64 = 50;

/// Largest page size for listings.
pub const MAX_LIMIT: i64 = 200;

/// Default number of security highlights.
pub const DEFAULT_SECURITY_LIMIT: i64 = 20;

/// Largest number of security highlights.
pub const MAX_SECURITY_LIMIT: i64 = 100;

/// Paging for listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: i64,
    pub offset: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl Page {
    /// Build a page, checking `limit` is 1..=200 and `offset` is not negative.
    pub fn new(limit: Option<i64>, offset: Option<i64>) -> Result<Self> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        let offset = offset.unwrap_or(0);
        if !(1..=MAX_LIMIT).contains(&limit) {
            return Err(DriveError::Validation(format!(
                "limit must be between 1 and {MAX_LIMIT}"
            )));
        }
        if offset < 0 {
            return Err(DriveError::Validation("offset must not be negative".to_string()));
        }
        Ok(Self { limit, offset })
    }
}

/// Append-only store of user actions.
pub struct ActivityRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> ActivityRepository<'a> {
    /// Create a new ActivityRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Append an entry and return its ID.
    pub async fn record(&self, entry: &NewActivity) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO activity_logs (user_id, action, resource_type, resource_id, details, ip_address)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.user_id)
        .bind(entry.action.as_str())
        .bind(entry.resource_type.as_str())
        .bind(entry.resource_id)
        .bind(&entry.details)
        .bind(&entry.ip_address)
        .execute(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result.last_insert_rowid())
    }

    /// Append an entry, logging instead of failing.
    pub async fn record_quietly(&self, entry: NewActivity) {
        if let Err(e) = self.record(&entry).await {
            warn!(
                user_id = entry.user_id,
                action = %entry.action,
                error = %e,
                "Failed to record activity"
            );
        }
    }

    /// List a user's entries, newest first. `None` returns every match.
    pub async fn list(
        &self,
        user_id: i64,
        filter: &ActivityFilter,
        page: Option<Page>,
    ) -> Result<Vec<ActivityLog>> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(LOG_SELECT);
        query.push_bind(user_id);

        if let Some(action) = filter.action {
            query.push(" AND a.action = ").push_bind(action.as_str());
        }
        if let Some(resource_type) = filter.resource_type {
            query
                .push(" AND a.resource_type = ")
                .push_bind(resource_type.as_str());
        }
        if let Some(start) = filter.start_date {
            query.push(" AND a.created_at >= ").push_bind(start_of_day(start));
        }
        if let Some(end) = filter.end_date {
            query.push(" AND a.created_at <= ").push_bind(end_of_day(end));
        }

        query.push(" ORDER BY a.created_at DESC, a.id DESC");
        if let Some(page) = page {
            query
                .push(" LIMIT ")
                .push_bind(page.limit)
                .push(" OFFSET ")
                .push_bind(page.offset);
        }

        let logs = query
            .build_query_as::<ActivityLog>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(logs)
    }

    /// Most recent destructive and share-changing entries.
    pub async fn security_highlights(&self, user_id: i64, limit: i64) -> Result<Vec<ActivityLog>> {
        if !(1..=MAX_SECURITY_LIMIT).contains(&limit) {
            return Err(DriveError::Validation(format!(
                "limit must be between 1 and {MAX_SECURITY_LIMIT}"
            )));
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(LOG_SELECT);
        query.push_bind(user_id);
        query.push(" AND a.action IN (");
        let mut separated = query.separated(", ");
        for action in SECURITY_ACTIONS {
            separated.push_bind(action.as_str());
        }
        separated.push_unseparated(")");
        query
            .push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(limit);

        let logs = query
            .build_query_as::<ActivityLog>()
            .fetch_all(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(logs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{Action, ResourceType};
    use crate::datetime::parse_date;
    use crate::Database;

    async fn setup() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        sqlx::raw_sql(
            "INSERT INTO users (username, email, password) VALUES
                ('alice', 'a@x.io', 'h'), ('bob', 'b@x.io', 'h');",
        )
        .execute(db.pool())
        .await
        .unwrap();
        db
    }

    async fn backdate(db: &Database, id: i64, created_at: &str) {
        sqlx::query("UPDATE activity_logs SET created_at = ? WHERE id = ?")
            .bind(created_at)
            .bind(id)
            .execute(db.pool())
            .await
            .unwrap();
    }

    #[test]
    fn test_page_bounds() {
        assert_eq!(Page::new(None, None).unwrap(), Page::default());
        assert!(Page::new(Some(200), Some(0)).is_ok());
        assert!(Page::new(Some(0), None).is_err());
        assert!(Page::new(Some(201), None).is_err());
        assert!(Page::new(None, Some(-1)).is_err());
    }

    #[tokio::test]
    async fn test_record_and_list() {
        let db = setup().await;
        let repo = ActivityRepository::new(db.pool());

        let id = repo
            .record(
                &NewActivity::new(1, Action::UploadFile, ResourceType::File)
                    .resource(7)
                    .details("report.pdf"),
            )
            .await
            .unwrap();
        repo.record(&NewActivity::new(2, Action::Login, ResourceType::User))
            .await
            .unwrap();

        let logs = repo
            .list(1, &ActivityFilter::default(), Some(Page::default()))
            .await
            .unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, id);
        assert_eq!(logs[0].username, "alice");
        assert_eq!(logs[0].action, "upload_file");
        assert_eq!(logs[0].resource_id, Some(7));
    }

    #[tokio::test]
    async fn test_list_filters_and_paging() {
        let db = setup().await;
        let repo = ActivityRepository::new(db.pool());
        let entries = [
            (Action::CreateFolder, ResourceType::Folder, "2024-01-01 10:00:00"),
            (Action::UploadFile, ResourceType::File, "2024-01-02 10:00:00"),
            (Action::DeleteFile, ResourceType::File, "2024-01-03 23:59:59"),
            (Action::UploadFile, ResourceType::File, "2024-01-04 00:00:00"),
        ];
        for (action, resource_type, at) in entries {
            let id = repo
                .record(&NewActivity::new(1, action, resource_type))
                .await
                .unwrap();
            backdate(&db, id, at).await;
        }

        let by_type = ActivityFilter {
            resource_type: Some(ResourceType::File),
            ..Default::default()
        };
        let logs = repo.list(1, &by_type, None).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].created_at, "2024-01-04 00:00:00");

        let by_action = ActivityFilter {
            action: Some(Action::UploadFile),
            ..Default::default()
        };
        assert_eq!(repo.list(1, &by_action, None).await.unwrap().len(), 2);

        let by_date = ActivityFilter {
            start_date: parse_date("2024-01-02"),
            end_date: parse_date("2024-01-03"),
            ..Default::default()
        };
        let logs = repo.list(1, &by_date, None).await.unwrap();
        assert_eq!(logs.len(), 2);

        let page = Page::new(Some(2), Some(1)).unwrap();
        let logs = repo
            .list(1, &ActivityFilter::default(), Some(page))
            .await
            .unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].created_at, "2024-01-03 23:59:59");
    }

    #[tokio::test]
    async fn test_security_highlights() {
        let db = setup().await;
        let repo = ActivityRepository::new(db.pool());
        for action in [
            Action::Login,
            Action::DeleteFile,
            Action::CreateShare,
            Action::UploadFile,
            Action::PermanentDelete,
        ] {
            repo.record(&NewActivity::new(1, action, ResourceType::File))
                .await
                .unwrap();
        }

        let logs = repo.security_highlights(1, DEFAULT_SECURITY_LIMIT).await.unwrap();
        assert_eq!(logs.len(), 3);
        assert!(logs
            .iter()
            .all(|l| l.action.parse::<Action>().unwrap().is_security()));

        assert_eq!(repo.security_highlights(1, 1).await.unwrap().len(), 1);
        assert!(repo.security_highlights(1, 0).await.is_err());
        assert!(repo.security_highlights(1, 101).await.is_err());
    }

    #[tokio::test]
    async fn test_record_quietly_swallows_errors() {
        let db = setup().await;
        let repo = ActivityRepository::new(db.pool());
        // Unknown user violates the foreign key.
        repo.record_quietly(NewActivity::new(99, Action::Login, ResourceType::User))
            .await;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM activity_logs")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
