//! Authentication module for driveshelf.
//!
//! Password hashing, account registration and credential checks. Token
//! issuing and verification live in the web middleware.

mod account;
mod password;
pub mod validation;

pub use account::{
    authenticate, change_password, register, RegistrationRequest, INVALID_CREDENTIALS,
};
pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use validation::ValidationError;
