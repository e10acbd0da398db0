use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use serde_json::{Value, json};
use tower::ServiceExt;

use bucket_store::Sandbox;
use bucket_store::config::StoreConfig;
use bucket_store::server::{AppState, router};

const BOUNDARY: &str = "bucket-store-test-boundary";

// Helper to build the app on a fresh store root
fn setup_app() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        store_root: dir.path().to_string_lossy().into_owned(),
        ..StoreConfig::default()
    };
    let sandbox = Sandbox::open(dir.path()).unwrap();
    (dir, router(AppState::new(sandbox, config)))
}

fn multipart_body(fields: &[(&str, &[u8])]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        if *name == "file" {
            body.extend_from_slice(
                b"Content-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\n",
            );
            body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        } else {
            body.extend_from_slice(
                format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
            );
        }
        body.extend_from_slice(value);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = send(app, request).await;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn put(app: &Router, bucket: &str, filename: &str, data: &[u8]) -> (StatusCode, Value) {
    let body = multipart_body(&[
        ("filename", filename.as_bytes()),
        ("bucket", bucket.as_bytes()),
        ("file", data),
    ]);
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/file/put")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap();
    let response = send(app, request).await;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn get(app: &Router, bucket: &str, filename: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/file/get")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"bucket": bucket, "filename": filename}).to_string(),
        ))
        .unwrap();
    let response = send(app, request).await;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_hello() {
    let (_dir, app) = setup_app();
    let request = Request::builder()
        .uri("/api/v1/hello")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value, json!({"error": false, "message": "hello"}));
}

#[tokio::test]
async fn test_photos_scenario() {
    let (_dir, app) = setup_app();
    let (status, _) = put(&app, "photos", "a.jpg", &[1u8; 100]).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = put(&app, "photos", "b.png", &[2u8; 200]).await;
    assert_eq!(status, StatusCode::OK);

    let (status, value) = post_json(
        &app,
        "/api/v1/bucket/pagelist",
        json!({"pattern": "photos", "offset": 0, "limit": 10}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["error"], false);
    assert_eq!(value["result"]["total"], 1);
    assert_eq!(
        value["result"]["items"],
        json!([{"name": "photos", "size": 300}])
    );

    let (_, value) = post_json(
        &app,
        "/api/v1/file/pagelist",
        json!({"bucket": "photos", "pattern": "*.jpg", "offset": 0, "limit": 10}),
    )
    .await;
    assert_eq!(value["result"]["total"], 1);
    assert_eq!(value["result"]["items"][0]["name"], "a.jpg");
    assert_eq!(value["result"]["items"][0]["size"], 100);
    assert!(value["result"]["items"][0]["modtime"].is_string());

    let (status, value) = post_json(
        &app,
        "/api/v1/file/drop",
        json!({"bucket": "photos", "filename": "a.jpg"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value, json!({"error": false, "result": []}));

    let (_, value) = post_json(
        &app,
        "/api/v1/file/pagelist",
        json!({"bucket": "photos", "pattern": "*", "offset": 0, "limit": 10}),
    )
    .await;
    assert_eq!(value["result"]["total"], 1);
    assert_eq!(value["result"]["items"][0]["name"], "b.png");
}

#[tokio::test]
async fn test_put_get_round_trip() {
    let (_dir, app) = setup_app();
    let data: Vec<u8> = (0..=255u8).cycle().take(200_000).collect();

    let (status, value) = put(&app, "docs/2024", "blob.bin", &data).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["result"][0]["name"], "blob.bin");
    assert_eq!(value["result"][0]["size"], data.len());

    let (status, body) = get(&app, "docs/2024", "blob.bin").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, data);

    let request = Request::builder()
        .uri("/api/v1/file/down/docs/2024/blob.bin")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"blob.bin\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.to_vec(), data);
}

#[tokio::test]
async fn test_traversal_is_rejected() {
    let parent = tempfile::tempdir().unwrap();
    let root = parent.path().join("store");
    std::fs::create_dir(&root).unwrap();
    let config = StoreConfig {
        store_root: root.to_string_lossy().into_owned(),
        ..StoreConfig::default()
    };
    let app = router(AppState::new(Sandbox::open(&root).unwrap(), config));

    let (status, value) = put(&app, "../evil", "x", b"data").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], true);
    assert!(value["message"].as_str().unwrap().contains("bucket"));
    assert!(!parent.path().join("evil").exists());

    let (status, _) = get(&app, "", "../../etc/passwd").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, value) = post_json(
        &app,
        "/api/v1/file/list",
        json!({"bucket": "a/../../etc"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], true);
}

#[tokio::test]
async fn test_drop_twice_is_not_found() {
    let (_dir, app) = setup_app();
    put(&app, "tmp", "once", b"x").await;

    let body = json!({"bucket": "tmp", "filename": "once"});
    let (status, _) = post_json(&app, "/api/v1/file/drop", body.clone()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, value) = post_json(&app, "/api/v1/file/drop", body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value["error"], true);
    assert_eq!(value["message"], "file tmp/once not found");
}

#[tokio::test]
async fn test_pagination_past_end() {
    let (_dir, app) = setup_app();
    put(&app, "a", "f", b"1").await;
    put(&app, "b", "f", b"2").await;

    for offset in [2, 7] {
        let (status, value) = post_json(
            &app,
            "/api/v1/bucket/pagelist",
            json!({"offset": offset, "limit": 10}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["result"]["total"], 2);
        assert_eq!(value["result"]["items"], json!([]));
    }

    let (_, value) = post_json(
        &app,
        "/api/v1/bucket/pagelist",
        json!({"offset": 1, "limit": 1}),
    )
    .await;
    assert_eq!(value["result"]["items"], json!([{"name": "b", "size": 1}]));
}

#[tokio::test]
async fn test_unpaged_lists() {
    let (_dir, app) = setup_app();
    put(&app, "music", "song.mp3", b"la").await;

    let (_, value) = post_json(&app, "/api/v1/bucket/list", json!({})).await;
    assert_eq!(value["result"], json!([{"name": "music", "size": 2}]));

    let (_, value) = post_json(&app, "/api/v1/file/list", json!({"bucket": "music"})).await;
    assert_eq!(value["result"][0]["name"], "song.mp3");
}

async fn put_form(app: &Router, fields: &[(&str, &[u8])]) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/file/put")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(fields)))
        .unwrap();
    let response = send(app, request).await;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_put_fields_in_any_order() {
    let (dir, app) = setup_app();
    let (status, value) = put_form(
        &app,
        &[
            ("filename", &b"x.txt"[..]),
            ("file", &b"DATA"[..]),
            ("bucket", &b"photos"[..]),
        ],
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(value["result"][0]["name"], "x.txt");
    assert!(dir.path().join("photos/x.txt").is_file());
    assert!(!dir.path().join("x.txt").exists());

    let (status, body) = get(&app, "photos", "x.txt").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"DATA");
}

#[tokio::test]
async fn test_put_without_filename_leaves_nothing() {
    let (dir, app) = setup_app();
    let (status, value) = put_form(&app, &[("bucket", &b"docs"[..]), ("file", &b"data"[..])]).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(value["error"], true);
    assert!(value["message"].as_str().unwrap().contains("filename"));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_missing_bucket_listing() {
    let (_dir, app) = setup_app();
    let (status, value) = post_json(
        &app,
        "/api/v1/file/pagelist",
        json!({"bucket": "nope", "offset": 0, "limit": 10}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(value, json!({"error": true, "message": "bucket nope not found"}));
}
