//! User model for driveshelf.

/// A registered account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Display name.
    pub username: String,
    /// Login email (unique, case-insensitive).
    pub email: String,
    /// Password hash (Argon2).
    pub password: String,
    /// Free-form profile text.
    pub profile: Option<String>,
    /// Bytes charged to this user, live files plus recycle bin.
    pub storage_used: i64,
    /// Account creation timestamp.
    pub created_at: String,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Display name.
    pub username: String,
    /// Login email.
    pub email: String,
    /// Password hash (should be pre-hashed with Argon2).
    pub password: String,
    /// Profile text.
    pub profile: Option<String>,
}

impl NewUser {
    /// Create a new user with the required fields.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            profile: None,
        }
    }

    /// Set the profile text.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }
}

/// Data for updating an existing user.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New password hash.
    pub password: Option<String>,
    /// New display name.
    pub username: Option<String>,
    /// New profile text.
    pub profile: Option<Option<String>>,
}

impl UserUpdate {
    /// Create an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set new password hash.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set new display name.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set new profile.
    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.password.is_none() && self.username.is_none() && self.profile.is_none()
    }
}
