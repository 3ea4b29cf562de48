//! Account registration, login and password changes.

use tracing::info;

use crate::auth::validation::{validate_email, validate_username};
use crate::auth::{hash_password, validate_password, verify_password};
use crate::db::{NewUser, User, UserRepository, UserUpdate};
use crate::{DriveError, Result};

/// Message used for every failed login, whichever part was wrong.
pub const INVALID_CREDENTIALS: &str = "invalid email or password";

/// Registration request data.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    /// Display name (3..=50 characters).
    pub username: String,
    /// Login email.
    pub email: String,
    /// Password (8..=128 characters).
    pub password: String,
}

impl RegistrationRequest {
    /// Create a new registration request.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Register a new user.
///
/// Validates the input, rejects an email that is already registered and
/// stores the Argon2 hash of the password.
pub async fn register(repo: &UserRepository<'_>, request: RegistrationRequest) -> Result<User> {
    let username = request.username.trim();
    let email = request.email.trim();

    validate_username(username)?;
    validate_email(email)?;
    validate_password(&request.password)?;

    if repo.email_exists(email).await? {
        return Err(DriveError::Conflict("email already registered".to_string()));
    }

    let hash = hash_password(&request.password)?;
    let user = repo
        .create(&NewUser::new(username, email, hash))
        .await
        .map_err(|e| match e {
            DriveError::Database(msg) if msg.contains("UNIQUE") => {
                DriveError::Conflict("email already registered".to_string())
            }
            other => other,
        })?;

    info!(user_id = user.id, "User registered");
    Ok(user)
}

/// Check an email/password pair.
///
/// Unknown emails and wrong passwords fail with the same message.
pub async fn authenticate(repo: &UserRepository<'_>, email: &str, password: &str) -> Result<User> {
    let user = repo
        .get_by_email(email)
        .await?
        .ok_or_else(|| DriveError::Auth(INVALID_CREDENTIALS.to_string()))?;

    verify_password(password, &user.password)
        .map_err(|_| DriveError::Auth(INVALID_CREDENTIALS.to_string()))?;

    Ok(user)
}

/// Change a user's password after checking the current one.
pub async fn change_password(
    repo: &UserRepository<'_>,
    user_id: i64,
    current_password: &str,
    new_password: &str,
) -> Result<()> {
    let user = repo
        .get_by_id(user_id)
        .await?
        .ok_or_else(|| DriveError::NotFound("user".to_string()))?;

    verify_password(current_password, &user.password)
        .map_err(|_| DriveError::Auth("current password is incorrect".to_string()))?;
    validate_password(new_password)?;

    let hash = hash_password(new_password)?;
    repo.update(user_id, &UserUpdate::new().password(hash)).await?;

    info!(user_id, "Password changed");
    Ok(())
}
