//! Web API integration tests.
//!
//! Endpoint-level coverage of the HTTP boundary over a real service.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::Value;

use hoard::web::{create_router, AppState};

use common::test_service;

/// Build a test server over a fresh service, keeping the temp root alive.
async fn create_test_server() -> (TestServer, tempfile::TempDir) {
    let t = test_service().await;
    let state = Arc::new(AppState::new(t.service));
    let server = TestServer::new(create_router(state)).expect("Failed to create test server");
    (server, t.temp_dir)
}

fn chunk_form(path: &str, index: u32, total: u32, payload: &[u8]) -> MultipartForm {
    MultipartForm::new()
        .add_text("filename", path.to_string())
        .add_text("chunk_index", index.to_string())
        .add_text("total_chunks", total.to_string())
        .add_part("chunk", Part::bytes(payload.to_vec()).file_name("blob"))
}

#[tokio::test]
async fn test_status() {
    let (server, _root) = create_test_server().await;

    let response = server.get("/status").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert!(body["message"].as_str().unwrap().contains("running"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_upload_merge_download_roundtrip() {
    let (server, _root) = create_test_server().await;

    // Two chunks, out of order.
    let response = server
        .post("/upload")
        .multipart(chunk_form("docs/hello.txt", 1, 2, b" world"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["session_complete"], false);

    let response = server
        .post("/upload")
        .multipart(chunk_form("docs/hello.txt", 0, 2, b"hello"))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["session_complete"], true);

    let response = server
        .post("/merge")
        .json(&serde_json::json!({
            "filename": "docs/hello.txt",
            "total_chunks": 2
        }))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["file"]["size"], 11);
    assert_eq!(body["data"]["file"]["mime_type"], "text/plain");
    assert_eq!(body["data"]["size_mismatch"], false);

    let response = server.get("/download/docs/hello.txt").await;
    response.assert_status_ok();
    assert_eq!(response.as_bytes().as_ref(), b"hello world");
    assert_eq!(
        response.headers()["content-type"].to_str().unwrap(),
        "text/plain"
    );
    assert!(response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .contains("hello.txt"));
}

#[tokio::test]
async fn test_upload_rejects_traversal() {
    let (server, _root) = create_test_server().await;

    let response = server
        .post("/upload")
        .multipart(chunk_form("../escape.txt", 0, 1, b"x"))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_upload_rejects_non_numeric_index() {
    let (server, _root) = create_test_server().await;

    let form = MultipartForm::new()
        .add_text("filename", "a.txt")
        .add_text("chunk_index", "zero")
        .add_text("total_chunks", "1")
        .add_part("chunk", Part::bytes(b"x".to_vec()).file_name("blob"));

    let response = server.post("/upload").multipart(form).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_upload_requires_chunk_field() {
    let (server, _root) = create_test_server().await;

    let form = MultipartForm::new()
        .add_text("filename", "a.txt")
        .add_text("chunk_index", "0")
        .add_text("total_chunks", "1");

    let response = server.post("/upload").multipart(form).await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_merge_with_missing_chunk() {
    let (server, _root) = create_test_server().await;

    server
        .post("/upload")
        .multipart(chunk_form("gap.bin", 0, 3, b"a"))
        .await
        .assert_status_ok();
    server
        .post("/upload")
        .multipart(chunk_form("gap.bin", 2, 3, b"c"))
        .await
        .assert_status_ok();

    let response = server
        .post("/merge")
        .json(&serde_json::json!({
            "filename": "gap.bin",
            "total_chunks": 3
        }))
        .await;

    response.assert_status_bad_request();
    let body: Value = response.json();
    assert!(body["error"]["message"].as_str().unwrap().contains("1"));
}

#[tokio::test]
async fn test_files_listing() {
    let (server, _root) = create_test_server().await;

    for (path, content) in [("docs/a.txt", "aaa"), ("docs/b.txt", "bb"), ("top.txt", "t")] {
        server
            .post("/upload")
            .multipart(chunk_form(path, 0, 1, content.as_bytes()))
            .await
            .assert_status_ok();
        server
            .post("/merge")
            .json(&serde_json::json!({ "filename": path, "total_chunks": 1 }))
            .await
            .assert_status_ok();
    }

    // Heal the `docs` directory record so the tree is complete.
    server.post("/scan").await.assert_status_ok();

    let response = server.get("/files").await;
    response.assert_status_ok();

    let body: Value = response.json();
    let files = body["data"]["files"].as_array().unwrap();
    let folders = body["data"]["folders"].as_array().unwrap();
    assert_eq!(files.len(), 3);
    assert_eq!(folders.len(), 1);
    assert_eq!(folders[0]["path"], "docs");

    // Scoped to the docs subtree.
    let response = server.get("/files").add_query_param("subtree", "docs").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["files"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_listing_never_exposes_part_files() {
    let (server, _root) = create_test_server().await;

    server
        .post("/upload")
        .multipart(chunk_form("pending.bin", 0, 2, b"half"))
        .await
        .assert_status_ok();

    server.post("/scan").await.assert_status_ok();

    let response = server.get("/files").await;
    let body: Value = response.json();
    assert!(body["data"]["files"].as_array().unwrap().is_empty());

    let response = server.get("/download/pending.bin.part0").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_download_missing_file() {
    let (server, _root) = create_test_server().await;

    let response = server.get("/download/ghost.txt").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_delete_file_and_folder() {
    let (server, _root) = create_test_server().await;

    for path in ["trash/one.txt", "trash/sub/two.txt", "keep.txt"] {
        server
            .post("/upload")
            .multipart(chunk_form(path, 0, 1, b"x"))
            .await
            .assert_status_ok();
        server
            .post("/merge")
            .json(&serde_json::json!({ "filename": path, "total_chunks": 1 }))
            .await
            .assert_status_ok();
    }

    // Whole-subtree delete.
    let response = server.delete("/delete/trash").await;
    response.assert_status_ok();

    server.get("/download/trash/one.txt").await.assert_status_not_found();
    server.get("/download/keep.txt").await.assert_status_ok();

    // Single-file delete.
    server.delete("/delete/keep.txt").await.assert_status_ok();
    server.delete("/delete/keep.txt").await.assert_status_not_found();
}

#[tokio::test]
async fn test_scan_endpoint_reports_counts() {
    let (server, root) = create_test_server().await;

    tokio::fs::create_dir_all(root.path().join("manual/drop"))
        .await
        .unwrap();
    tokio::fs::write(root.path().join("manual/drop/file.zip"), b"zipzip")
        .await
        .unwrap();

    let response = server.post("/scan").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["data"]["folders_created"], 2);
    assert_eq!(body["data"]["files_created"], 1);

    // Convergence: the second pass finds nothing new.
    let response = server.post("/scan").await;
    let body: Value = response.json();
    assert_eq!(body["data"]["folders_created"], 0);
    assert_eq!(body["data"]["files_created"], 0);
}

#[tokio::test]
async fn test_upload_with_owner_and_visibility() {
    let (server, _root) = create_test_server().await;

    let form = chunk_form("mine.txt", 0, 1, b"private data")
        .add_text("owner_id", "42")
        .add_text("is_public", "false");

    server.post("/upload").multipart(form).await.assert_status_ok();

    let response = server
        .post("/merge")
        .json(&serde_json::json!({
            "filename": "mine.txt",
            "total_chunks": 1,
            "owner_id": 42
        }))
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["data"]["file"]["owner_id"], 42);
    assert_eq!(body["data"]["file"]["is_public"], false);
}
