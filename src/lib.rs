//! driveshelf - a self-hosted drive backend.
//!
//! Users keep folders and files in a private tree, share them by link or with
//! named accounts, recover deletions from a recycle bin and review an
//! activity log of everything that happened to their drive.

pub mod accounting;
pub mod activity;
pub mod auth;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod execute;
pub mod file;
pub mod logging;
pub mod recycle;
pub mod search;
pub mod share;
pub mod star;
pub mod web;

pub use auth::{
    authenticate, change_password, hash_password, register, validate_password, verify_password,
    PasswordError, RegistrationRequest,
};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository, UserUpdate};
pub use error::{DriveError, Result};
pub use file::{DriveService, FileStorage};
