use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;
use url::Url;

use gitdrop::http::http_router;
use gitdrop_core::git::{HostOperation, MemoryGitHost};
use gitdrop_core::{
    AccessToken, FileStatus, HttpRelay, RepositoryCoordinate, UploadDriver, Uploader,
};

const TOKEN: &str = "ghp_relay_fixture";

fn main_branch() -> RepositoryCoordinate {
    RepositoryCoordinate::new("adeshgg", "test-upload", "main")
}

fn seeded_host() -> Arc<MemoryGitHost> {
    let host = Arc::new(MemoryGitHost::new(TOKEN));
    host.seed_branch(&main_branch(), "abc123", &[("README.md", &b"# test-upload"[..])]);
    host
}

fn router(host: Arc<MemoryGitHost>, token: Option<&str>) -> Router {
    let uploader = Uploader::new(host, token.map(AccessToken::new));
    http_router(Arc::new(uploader))
}

async fn post_upload(router: Router, body: String) -> (StatusCode, Value) {
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/upload-to-github")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();

    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_upload_commits_file_to_branch() {
    let host = seeded_host();

    let (status, body) = post_upload(
        router(host.clone(), Some(TOKEN)),
        json!({
            "fileName": "hello.txt",
            "content": "hi",
            "owner": "adeshgg",
            "repo": "test-upload"
        })
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["message"],
        "File uploaded successfully @ https://github.com/adeshgg/test-upload/blob/main/hello.txt"
    );

    assert_eq!(host.read_file(&main_branch(), "hello.txt"), Some(b"hi".to_vec()));
    assert_eq!(
        host.read_file(&main_branch(), "README.md"),
        Some(b"# test-upload".to_vec())
    );

    let head = host.head(&main_branch()).unwrap();
    let commit = host.commit(&head).unwrap();
    assert_eq!(commit.message, "Upload hello.txt");
    assert_eq!(commit.parents, vec!["abc123".into()]);
}

#[tokio::test]
async fn test_missing_token_fails_without_calling_github() {
    let host = seeded_host();

    let (status, body) = post_upload(
        router(host.clone(), None),
        json!({
            "fileName": "hello.txt",
            "content": "hi",
            "owner": "adeshgg",
            "repo": "test-upload"
        })
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "GitHub token is not configured");
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn test_missing_branch_is_a_generic_failure() {
    let host = seeded_host();

    let (status, body) = post_upload(
        router(host.clone(), Some(TOKEN)),
        json!({
            "fileName": "hello.txt",
            "content": "hi",
            "owner": "adeshgg",
            "repo": "test-upload",
            "branch": "does-not-exist"
        })
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error uploading file");
    assert_eq!(host.operations(), vec![HostOperation::GetRef]);
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let host = seeded_host();

    let (status, body) = post_upload(
        router(host.clone(), Some(TOKEN)),
        json!({ "fileName": "hello.txt" }).to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], "Error uploading file");
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn test_invalid_base64_is_rejected() {
    let host = seeded_host();

    let (status, _) = post_upload(
        router(host.clone(), Some(TOKEN)),
        json!({
            "fileName": "logo.png",
            "content": "%%%",
            "owner": "adeshgg",
            "repo": "test-upload",
            "encoding": "base64"
        })
        .to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(host.calls().is_empty());
}

#[tokio::test]
async fn test_health_reports_token_presence() {
    let response = router(seeded_host(), None)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();

    assert_eq!(body, json!({ "status": "ok", "githubTokenConfigured": false }));
}

#[tokio::test]
async fn test_driver_uploads_batch_through_relay() {
    let host = seeded_host();

    // The relay refuses a nameless file; the rest of the batch still goes through.
    let app = router(host.clone(), Some(TOKEN));

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(app.into_make_service())
            .await
            .unwrap();
    });

    let endpoint = Url::parse(&format!("http://{addr}")).unwrap();
    let relay = HttpRelay::new(&endpoint, Duration::from_secs(5)).unwrap();
    let driver = UploadDriver::new(Arc::new(relay), main_branch());

    let uploads = driver
        .run(vec![
            ("".to_string(), b"1".to_vec()),
            ("logo.bin".to_string(), vec![0x89, 0x50, 0x00, 0xff]),
        ])
        .await;

    assert_eq!(
        uploads[0].status,
        FileStatus::Error("Error uploading file. Please try again.".to_string())
    );
    assert_eq!(
        uploads[1].status,
        FileStatus::Success(
            "File uploaded successfully @ https://github.com/adeshgg/test-upload/blob/main/logo.bin"
                .to_string()
        )
    );

    assert_eq!(host.call_count(HostOperation::CreateBlob), 1);
    assert_eq!(
        host.read_file(&main_branch(), "logo.bin"),
        Some(vec![0x89, 0x50, 0x00, 0xff])
    );
}
