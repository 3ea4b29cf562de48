//! Web API File/Folder Tests
//!
//! Integration tests for the folder tree, uploads, downloads and bulk operations.

mod common;

use axum::http::header::{AUTHORIZATION, CONTENT_DISPOSITION, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::StatusCode;
use serde_json::{json, Value};

use common::{bearer, create_folder, create_test_app, register_user, upload, upload_file};

#[tokio::test]
async fn test_folder_tree_and_breadcrumbs() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;

    let docs = create_folder(&app.server, &token, "Docs", None).await;
    let work = create_folder(&app.server, &token, "Work", Some(docs)).await;

    let response = app
        .server
        .get(&format!("/api/folders/{}", work))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["folder"]["name"], "Work");
    let path: Vec<&str> = body["data"]["path"]
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert_eq!(path, vec!["Docs", "Work"]);

    let root = app
        .server
        .get("/api/folders/0/children")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    root.assert_status_ok();
    let body = root.json::<Value>();
    assert!(body["data"]["folder"].is_null());
    assert_eq!(body["data"]["folders"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["folders"][0]["id"], docs);
}

#[tokio::test]
async fn test_create_folder_conflict_and_invalid_name() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;
    create_folder(&app.server, &token, "Docs", None).await;

    let dup = app
        .server
        .post("/api/folders")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "name": "Docs" }))
        .await;
    dup.assert_status(StatusCode::CONFLICT);

    let slash = app
        .server
        .post("/api/folders")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "name": "a/b" }))
        .await;
    slash.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_folders_are_private() {
    let app = create_test_app().await;
    let (_, alice) = register_user(&app.server, "alice").await;
    let (_, bob) = register_user(&app.server, "bob").await;
    let docs = create_folder(&app.server, &alice, "Docs", None).await;

    let response = app
        .server
        .get(&format!("/api/folders/{}", docs))
        .add_header(AUTHORIZATION, bearer(&bob))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    let missing = app
        .server
        .get("/api/folders/9999")
        .add_header(AUTHORIZATION, bearer(&alice))
        .await;
    missing.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_move_folder_rejects_cycle() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;
    let a = create_folder(&app.server, &token, "A", None).await;
    let b = create_folder(&app.server, &token, "B", Some(a)).await;

    let cycle = app
        .server
        .put(&format!("/api/folders/{}/move", a))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "parent_id": b }))
        .await;
    cycle.assert_status(StatusCode::CONFLICT);

    let to_root = app
        .server
        .put(&format!("/api/folders/{}/move", b))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "parent_id": 0 }))
        .await;
    to_root.assert_status_ok();
    assert!(to_root.json::<Value>()["data"]["parent_id"].is_null());
}

#[tokio::test]
async fn test_upload_and_download() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;
    let docs = create_folder(&app.server, &token, "Docs", None).await;

    let response = upload(&app.server, &token, Some(docs), "notes.txt", b"hello drive").await;
    response.assert_status(StatusCode::CREATED);
    let file = response.json::<Value>()["data"].clone();
    assert_eq!(file["name"], "notes.txt");
    assert_eq!(file["folder_id"], docs);
    assert_eq!(file["size"], 11);
    assert_eq!(file["mime_type"], "text/plain");
    let id = file["id"].as_i64().unwrap();

    let download = app
        .server
        .get(&format!("/api/files/{}/download", id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    download.assert_status_ok();
    assert_eq!(download.as_bytes().as_ref(), b"hello drive");
    assert!(download
        .header(CONTENT_TYPE)
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(
        download.header(CONTENT_DISPOSITION),
        "attachment; filename=\"notes.txt\""
    );

    let etag = download.header(ETAG).to_str().unwrap().to_string();
    let cached = app
        .server
        .get(&format!("/api/files/{}/download", id))
        .add_header(AUTHORIZATION, bearer(&token))
        .add_header(IF_NONE_MATCH, etag)
        .await;
    cached.assert_status(StatusCode::NOT_MODIFIED);

    let me = app
        .server
        .get("/api/auth/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(me.json::<Value>()["data"]["storage_used"], 11);
}

#[tokio::test]
async fn test_upload_name_collision() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;
    upload_file(&app.server, &token, None, "a.txt", b"one").await;

    let dup = upload(&app.server, &token, None, "a.txt", b"two").await;
    dup.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_upload_limits() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;

    let too_big = vec![0u8; 1024 * 1024 + 1];
    let response = upload(&app.server, &token, None, "big.bin", &too_big).await;
    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);

    let chunk = vec![1u8; 900 * 1024];
    upload_file(&app.server, &token, None, "one.bin", &chunk).await;
    upload_file(&app.server, &token, None, "two.bin", &chunk).await;
    let over_quota = upload(&app.server, &token, None, "three.bin", &chunk).await;
    over_quota.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_upload_without_file() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;

    let form = axum_test::multipart::MultipartForm::new().add_text("folder_id", "0");
    let response = app
        .server
        .post("/api/files")
        .add_header(AUTHORIZATION, bearer(&token))
        .multipart(form)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rename_and_move_file() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;
    let docs = create_folder(&app.server, &token, "Docs", None).await;
    let id = upload_file(&app.server, &token, None, "draft.md", b"# draft").await;

    let renamed = app
        .server
        .patch(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "name": "final.md" }))
        .await;
    renamed.assert_status_ok();
    assert_eq!(renamed.json::<Value>()["data"]["name"], "final.md");

    let moved = app
        .server
        .put(&format!("/api/files/{}/move", id))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "parent_id": docs }))
        .await;
    moved.assert_status_ok();
    assert_eq!(moved.json::<Value>()["data"]["folder_id"], docs);
}

#[tokio::test]
async fn test_delete_folder_recycles_files() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;
    let docs = create_folder(&app.server, &token, "Docs", None).await;
    let inner = create_folder(&app.server, &token, "Inner", Some(docs)).await;
    upload_file(&app.server, &token, Some(docs), "a.txt", b"a").await;
    upload_file(&app.server, &token, Some(inner), "b.txt", b"b").await;

    let response = app
        .server
        .delete(&format!("/api/folders/{}", docs))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["data"]["folders_removed"], 2);
    assert_eq!(body["data"]["files_recycled"], 2);

    let bin = app
        .server
        .get("/api/recycle")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(bin.json::<Value>()["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_delete_file_twice() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;
    let id = upload_file(&app.server, &token, None, "a.txt", b"a").await;

    let first = app
        .server
        .delete(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    first.assert_status_ok();
    assert_eq!(first.json::<Value>()["data"]["deleted"], true);

    let gone = app
        .server
        .get(&format!("/api/files/{}", id))
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    gone.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_bulk_move_and_delete() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;
    let target = create_folder(&app.server, &token, "Target", None).await;
    let loose = create_folder(&app.server, &token, "Loose", None).await;
    let file = upload_file(&app.server, &token, None, "a.txt", b"a").await;

    let moved = app
        .server
        .post("/api/bulk/move")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "folder_ids": [loose], "file_ids": [file], "parent_id": target }))
        .await;
    moved.assert_status_ok();
    let body = moved.json::<Value>();
    assert_eq!(body["data"]["folder"]["id"], target);
    assert_eq!(body["data"]["folders"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["files"].as_array().unwrap().len(), 1);

    let empty = app
        .server
        .post("/api/bulk/delete")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({}))
        .await;
    empty.assert_status(StatusCode::BAD_REQUEST);

    let deleted = app
        .server
        .post("/api/bulk/delete")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "folder_ids": [target] }))
        .await;
    deleted.assert_status_ok();
    assert_eq!(deleted.json::<Value>()["data"]["files_recycled"], 1);
}

#[tokio::test]
async fn test_search_and_stars() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;
    let reports = create_folder(&app.server, &token, "Reports", None).await;
    let file = upload_file(&app.server, &token, Some(reports), "report-q1.pdf", b"%PDF").await;
    upload_file(&app.server, &token, None, "notes.txt", b"n").await;

    let found = app
        .server
        .get("/api/search")
        .add_query_param("q", "REPORT")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    found.assert_status_ok();
    let body = found.json::<Value>();
    assert_eq!(body["data"]["folders"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["files"].as_array().unwrap().len(), 1);

    let in_root = app
        .server
        .get("/api/search")
        .add_query_param("q", "report")
        .add_query_param("parent_id", 0)
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    let body = in_root.json::<Value>();
    assert_eq!(body["data"]["files"].as_array().unwrap().len(), 0);

    let blank = app
        .server
        .get("/api/search")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    blank.assert_status(StatusCode::BAD_REQUEST);

    app.server
        .post("/api/stars")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "file_id": file }))
        .await
        .assert_status_ok();
    let starred = app
        .server
        .get("/api/stars")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    assert_eq!(starred.json::<Value>()["data"]["files"][0]["id"], file);

    let unstar = app
        .server
        .delete("/api/stars")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "file_id": file }))
        .await;
    unstar.assert_status_ok();
    assert_eq!(unstar.json::<Value>()["data"]["starred"], false);

    let neither = app
        .server
        .post("/api/stars")
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({}))
        .await;
    neither.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_run_file_without_judge0() {
    let app = create_test_app().await;
    let (_, token) = register_user(&app.server, "alice").await;
    let script = upload_file(&app.server, &token, None, "hello.py", b"print('hi')").await;
    let image = upload_file(&app.server, &token, None, "photo.jpg", b"\xff\xd8").await;

    let unsupported = app
        .server
        .post(&format!("/api/files/{}/run", image))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({}))
        .await;
    unsupported.assert_status(StatusCode::BAD_REQUEST);

    let unconfigured = app
        .server
        .post(&format!("/api/files/{}/run", script))
        .add_header(AUTHORIZATION, bearer(&token))
        .json(&json!({ "stdin": "" }))
        .await;
    unconfigured.assert_status(StatusCode::SERVICE_UNAVAILABLE);
}
