//! User repository for driveshelf.

use sqlx::{QueryBuilder, SqliteConnection};

use super::user::{NewUser, User, UserUpdate};
use super::DbPool;
use crate::{DriveError, Result};

const USER_COLUMNS: &str = "id, username, email, password, profile, storage_used, created_at";

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    ///
    /// Returns the created user with the assigned ID.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password, profile) VALUES (?, ?, ?, ?)",
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password)
        .bind(&new_user.profile)
        .execute(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        let id = result.last_insert_rowid();
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DriveError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE"
        ))
        .bind(email.trim())
        .fetch_optional(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Update a user by ID.
    ///
    /// Only fields that are set in the update will be modified.
    /// Returns the updated user, or None if not found.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = query.separated(", ");

        if let Some(ref password) = update.password {
            separated.push("password = ");
            separated.push_bind_unseparated(password);
        }
        if let Some(ref username) = update.username {
            separated.push("username = ");
            separated.push_bind_unseparated(username);
        }
        if let Some(ref profile) = update.profile {
            separated.push("profile = ");
            separated.push_bind_unseparated(profile.clone());
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Check if an email is already registered (case-insensitive).
    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let exists: (bool,) =
            sqlx::query_as("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? COLLATE NOCASE)")
                .bind(email.trim())
                .fetch_one(self.pool)
                .await
                .map_err(|e| DriveError::Database(e.to_string()))?;
        Ok(exists.0)
    }

    /// Get the bytes currently charged to a user.
    pub async fn storage_used(&self, id: i64) -> Result<i64> {
        let used: Option<i64> = sqlx::query_scalar("SELECT storage_used FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        used.ok_or_else(|| DriveError::NotFound("user".to_string()))
    }

    /// Adjust a user's storage usage by `delta` bytes, never going below zero.
    pub async fn adjust_storage_used(conn: &mut SqliteConnection, id: i64, delta: i64) -> Result<()> {
        sqlx::query("UPDATE users SET storage_used = MAX(storage_used + ?, 0) WHERE id = ?")
            .bind(delta)
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        Ok(())
    }

    /// Charge `bytes` to a user unless the new total would pass `quota`.
    ///
    /// Returns `false` and leaves the row untouched when the quota would be
    /// exceeded.
    pub async fn charge_storage(
        conn: &mut SqliteConnection,
        id: i64,
        bytes: i64,
        quota: i64,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET storage_used = storage_used + ? WHERE id = ? AND storage_used + ? <= ?",
        )
        .bind(bytes)
        .bind(id)
        .bind(bytes)
        .bind(quota)
        .execute(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Resolve emails to users.
    ///
    /// Returns the users found and the emails that matched nobody, each in
    /// input order with duplicates removed.
    pub async fn resolve_emails(&self, emails: &[String]) -> Result<(Vec<User>, Vec<String>)> {
        let mut found: Vec<User> = Vec::new();
        let mut unknown: Vec<String> = Vec::new();

        for email in emails {
            let email = email.trim();
            if email.is_empty() {
                continue;
            }
            match self.get_by_email(email).await? {
                Some(user) => {
                    if !found.iter().any(|u| u.id == user.id) {
                        found.push(user);
                    }
                }
                None => {
                    if !unknown.iter().any(|e| e.eq_ignore_ascii_case(email)) {
                        unknown.push(email.to_string());
                    }
                }
            }
        }

        Ok((found, unknown))
    }
}
