//! Error types for driveshelf.

use thiserror::Error;

/// Common error type for driveshelf.
#[derive(Error, Debug)]
pub enum DriveError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Permission denied error.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Malformed request (missing or contradictory parameters).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The operation collides with existing state (duplicate names, cycles).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Upload would exceed a size limit or the owner's quota.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Error returned by an external service (code runner).
    #[error("upstream error: {0}")]
    Upstream(String),

    /// A required external service is not configured.
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for DriveError {
    fn from(e: sqlx::Error) -> Self {
        DriveError::Database(e.to_string())
    }
}

/// Result type alias for driveshelf operations.
pub type Result<T> = std::result::Result<T, DriveError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_display() {
        let err = DriveError::Auth("invalid password".to_string());
        assert_eq!(err.to_string(), "authentication error: invalid password");
    }

    #[test]
    fn test_permission_error_display() {
        let err = DriveError::Permission("edit access required".to_string());
        assert_eq!(err.to_string(), "permission denied: edit access required");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = DriveError::NotFound("folder".to_string());
        assert_eq!(err.to_string(), "folder not found");
    }

    #[test]
    fn test_conflict_error_display() {
        let err = DriveError::Conflict("folder already exists".to_string());
        assert_eq!(err.to_string(), "conflict: folder already exists");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "blob missing");
        let err: DriveError = io_err.into();
        assert!(matches!(err, DriveError::Io(_)));
        assert!(err.to_string().contains("blob missing"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: DriveError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, DriveError::Database(_)));
    }
}
