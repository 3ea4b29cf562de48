//! Configuration module for driveshelf.

use serde::Deserialize;
use std::path::Path;

use crate::{DriveError, Result};

/// General server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Timezone for exported timestamps (e.g., "Europe/Berlin", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    "data/driveshelf.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// File storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FilesConfig {
    /// Path to the blob storage directory.
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// Maximum upload size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
    /// Per-user storage quota in megabytes.
    #[serde(default = "default_quota")]
    pub quota_mb: u64,
}

fn default_storage_path() -> String {
    "data/uploads".to_string()
}

fn default_max_upload_size() -> u64 {
    100
}

fn default_quota() -> u64 {
    1024
}

impl FilesConfig {
    /// Maximum upload size in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_size_mb * 1024 * 1024
    }

    /// Per-user quota in bytes.
    pub fn quota_bytes(&self) -> u64 {
        self.quota_mb * 1024 * 1024
    }
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_upload_size_mb: default_max_upload_size(),
            quota_mb: default_quota(),
        }
    }
}

/// Recycle bin retention configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RecycleConfig {
    /// Days a deleted file stays in the recycle bin.
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Retention in minutes; overrides `retention_days` when greater than zero.
    #[serde(default)]
    pub retention_minutes: u64,
    /// Run the cleanup every minute instead of once a day.
    #[serde(default)]
    pub clean_every_minute: bool,
    /// Hour (UTC) of the daily cleanup.
    #[serde(default = "default_clean_hour")]
    pub clean_hour: u32,
    /// Minute of the daily cleanup.
    #[serde(default = "default_clean_minute")]
    pub clean_minute: u32,
}

fn default_retention_days() -> u64 {
    30
}

fn default_clean_hour() -> u32 {
    2
}

fn default_clean_minute() -> u32 {
    30
}

impl Default for RecycleConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            retention_minutes: 0,
            clean_every_minute: false,
            clean_hour: default_clean_hour(),
            clean_minute: default_clean_minute(),
        }
    }
}

impl RecycleConfig {
    /// How long a deleted file is kept before it is purged.
    pub fn retention(&self) -> chrono::Duration {
        if self.retention_minutes > 0 {
            chrono::Duration::minutes(self.retention_minutes as i64)
        } else {
            chrono::Duration::days(self.retention_days as i64)
        }
    }
}

/// Code execution (Judge0) configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteConfig {
    /// Base URL of the Judge0 service. Execution is disabled when empty.
    #[serde(default)]
    pub judge0_url: String,
    /// API key sent to Judge0.
    #[serde(default)]
    pub judge0_key: String,
    /// Request timeout in seconds.
    #[serde(default = "default_execute_timeout")]
    pub timeout_secs: u64,
}

fn default_execute_timeout() -> u64 {
    30
}

impl Default for ExecuteConfig {
    fn default() -> Self {
        Self {
            judge0_url: String::new(),
            judge0_key: String::new(),
            timeout_secs: default_execute_timeout(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/driveshelf.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Web API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WebConfig {
    /// Host address to bind.
    #[serde(default = "default_web_host")]
    pub host: String,
    /// Port number for the API.
    #[serde(default = "default_web_port")]
    pub port: u16,
    /// CORS allowed origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// JWT secret key.
    #[serde(default)]
    pub jwt_secret: String,
    /// Access token expiry in seconds.
    #[serde(default = "default_jwt_access_expiry")]
    pub jwt_access_token_expiry_secs: u64,
    /// Rate limit for the login endpoint (requests per minute).
    #[serde(default = "default_login_rate_limit")]
    pub login_rate_limit: u32,
    /// Rate limit for general API endpoints (requests per minute).
    #[serde(default = "default_api_rate_limit")]
    pub api_rate_limit: u32,
}

fn default_web_host() -> String {
    "127.0.0.1".to_string()
}

fn default_web_port() -> u16 {
    8000
}

fn default_jwt_access_expiry() -> u64 {
    60 * 60 * 24 // 1 day
}

fn default_login_rate_limit() -> u32 {
    10
}

fn default_api_rate_limit() -> u32 {
    300
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_web_host(),
            port: default_web_port(),
            cors_origins: vec![],
            jwt_secret: String::new(),
            jwt_access_token_expiry_secs: default_jwt_access_expiry(),
            login_rate_limit: default_login_rate_limit(),
            api_rate_limit: default_api_rate_limit(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage configuration.
    #[serde(default)]
    pub files: FilesConfig,
    /// Recycle bin configuration.
    #[serde(default)]
    pub recycle: RecycleConfig,
    /// Code execution configuration.
    #[serde(default)]
    pub execute: ExecuteConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Web API configuration.
    #[serde(default)]
    pub web: WebConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(DriveError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| DriveError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `DRIVESHELF_JWT_SECRET`
    /// - `DRIVESHELF_JUDGE0_URL`
    /// - `DRIVESHELF_JUDGE0_KEY`
    pub fn apply_env_overrides(&mut self) {
        if let Some(secret) = non_empty_env("DRIVESHELF_JWT_SECRET") {
            self.web.jwt_secret = secret;
        }
        if let Some(url) = non_empty_env("DRIVESHELF_JUDGE0_URL") {
            self.execute.judge0_url = url;
        }
        if let Some(key) = non_empty_env("DRIVESHELF_JUDGE0_KEY") {
            self.execute.judge0_key = key;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.web.jwt_secret.is_empty() {
            return Err(DriveError::Config(
                "jwt_secret is not set. \
                 Set it in config.toml or via DRIVESHELF_JWT_SECRET environment variable."
                    .to_string(),
            ));
        }
        if self.recycle.clean_hour > 23 || self.recycle.clean_minute > 59 {
            return Err(DriveError::Config(format!(
                "invalid recycle cleanup time {:02}:{:02}",
                self.recycle.clean_hour, self.recycle.clean_minute
            )));
        }
        if self.server.timezone.parse::<chrono_tz::Tz>().is_err() {
            return Err(DriveError::Config(format!(
                "unknown timezone: {}",
                self.server.timezone
            )));
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
