//! Shared helpers for the web API integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};
use tempfile::TempDir;

use driveshelf::config::Config;
use driveshelf::file::FileStorage;
use driveshelf::web::{create_app, AppState, RateLimitState};
use driveshelf::Database;

/// A running test app. Keep `_dir` alive for the blob storage.
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<Database>,
    pub storage: Arc<FileStorage>,
    _dir: TempDir,
}

/// Create a test configuration.
pub fn create_test_config() -> Config {
    let mut config = Config::default();
    config.web.jwt_secret = "test-secret-key-for-testing-only".to_string();
    config.web.login_rate_limit = 100;
    config.web.api_rate_limit = 10_000;
    config.files.max_upload_size_mb = 1;
    config.files.quota_mb = 2;
    config
}

/// Create a test server with an in-memory database and temporary storage.
pub async fn create_test_app_with(config: Config) -> TestApp {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db = Arc::new(
        Database::open_in_memory()
            .await
            .expect("Failed to create test database"),
    );
    let storage = Arc::new(FileStorage::new(dir.path()).expect("Failed to create storage"));

    let app_state = Arc::new(
        AppState::new(db.clone(), storage.clone(), &config).expect("Failed to build app state"),
    );
    let rate_limits = Arc::new(RateLimitState::new(
        config.web.login_rate_limit,
        config.web.api_rate_limit,
    ));
    let router = create_app(app_state, rate_limits, &config.web.cors_origins);

    TestApp {
        server: TestServer::new(router).expect("Failed to create test server"),
        db,
        storage,
        _dir: dir,
    }
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with(create_test_config()).await
}

/// Register a user and return `(user_id, access_token)`.
pub async fn register_user(server: &TestServer, username: &str) -> (i64, String) {
    let response = server
        .post("/api/auth/register")
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "password123"
        }))
        .await;
    response.assert_status(StatusCode::CREATED);

    let body = response.json::<Value>();
    let id = body["data"]["user"]["id"].as_i64().unwrap();
    let token = body["data"]["access_token"].as_str().unwrap().to_string();
    (id, token)
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Create a folder through the API and return its id.
pub async fn create_folder(
    server: &TestServer,
    token: &str,
    name: &str,
    parent_id: Option<i64>,
) -> i64 {
    let response = server
        .post("/api/folders")
        .add_header(AUTHORIZATION, bearer(token))
        .json(&json!({ "name": name, "parent_id": parent_id }))
        .await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"]["id"].as_i64().unwrap()
}

/// Upload a file and return the raw response.
pub async fn upload(
    server: &TestServer,
    token: &str,
    folder_id: Option<i64>,
    filename: &str,
    content: &[u8],
) -> TestResponse {
    let mut form = MultipartForm::new().add_part(
        "file",
        Part::bytes(content.to_vec())
            .file_name(filename)
            .mime_type("application/octet-stream"),
    );
    if let Some(id) = folder_id {
        form = form.add_text("folder_id", id.to_string());
    }
    server
        .post("/api/files")
        .add_header(AUTHORIZATION, bearer(token))
        .multipart(form)
        .await
}

/// Upload a file and return its id.
pub async fn upload_file(
    server: &TestServer,
    token: &str,
    folder_id: Option<i64>,
    filename: &str,
    content: &[u8],
) -> i64 {
    let response = upload(server, token, folder_id, filename, content).await;
    response.assert_status(StatusCode::CREATED);
    response.json::<Value>()["data"]["id"].as_i64().unwrap()
}
