//! Input validation for accounts and drive item names.

use thiserror::Error;

use crate::DriveError;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 50;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum folder or file name length.
pub const MAX_ITEM_NAME_LENGTH: usize = 100;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is too short.
    #[error("username must be at least {MIN_USERNAME_LENGTH} characters")]
    UsernameTooShort,

    /// Username is too long.
    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    /// Username contains control characters.
    #[error("username contains invalid characters")]
    UsernameInvalidChars,

    /// Email is too long.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Email format is invalid.
    #[error("invalid email format")]
    EmailInvalidFormat,

    /// Item name is empty after trimming.
    #[error("name cannot be empty")]
    NameEmpty,

    /// Item name is too long.
    #[error("name must be at most {MAX_ITEM_NAME_LENGTH} characters")]
    NameTooLong,

    /// Item name contains a path separator or is a dot entry.
    #[error("name cannot contain '/' or '\\' or be '.' or '..'")]
    NameInvalidChars,
}

impl From<ValidationError> for DriveError {
    fn from(e: ValidationError) -> Self {
        DriveError::Validation(e.to_string())
    }
}

/// Validate a username (3..=50 characters, no control characters).
///
/// # Examples
///
/// ```
/// use driveshelf::auth::validation::validate_username;
///
/// assert!(validate_username("jane").is_ok());
/// assert!(validate_username("ab").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    let len = username.trim().chars().count();
    if len < MIN_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooShort);
    }
    if len > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }
    if username.chars().any(|c| c.is_control()) {
        return Err(ValidationError::UsernameInvalidChars);
    }
    Ok(())
}

/// Validate an email address.
///
/// A basic format check: one `@`, a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }

    let mut parts = email.split('@');
    let (local, domain) = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => (local, domain),
        _ => return Err(ValidationError::EmailInvalidFormat),
    };

    if local.is_empty() || email.chars().any(char::is_whitespace) {
        return Err(ValidationError::EmailInvalidFormat);
    }
    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

/// Validate and normalize a folder or file name.
///
/// Returns the trimmed name.
///
/// # Examples
///
/// ```
/// use driveshelf::auth::validation::normalize_item_name;
///
/// assert_eq!(normalize_item_name("  Reports ").unwrap(), "Reports");
/// assert!(normalize_item_name("a/b").is_err());
/// ```
pub fn normalize_item_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::NameEmpty);
    }
    if name.chars().count() > MAX_ITEM_NAME_LENGTH {
        return Err(ValidationError::NameTooLong);
    }
    if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
        return Err(ValidationError::NameInvalidChars);
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(ValidationError::NameInvalidChars);
    }
    Ok(name.to_string())
}
