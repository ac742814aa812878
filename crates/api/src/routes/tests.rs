use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use fileserver_core::service::ServiceSettings;
use fileserver_core::staging::StagingDir;
use fileserver_core::store::{MemoryDocumentRepository, MemoryObjectStore};
use fileserver_core::DocumentService;
use serde_json::Value;
use tower::ServiceExt;

use super::build_router;
use crate::state::AppState;

const BOUNDARY: &str = "XBOUNDARYX";

struct TestApp {
    router: Router,
    objects: Arc<MemoryObjectStore>,
    staging: tempfile::TempDir,
}

fn app_with(settings: ServiceSettings) -> TestApp {
    let staging = tempfile::tempdir().unwrap();
    let objects = Arc::new(MemoryObjectStore::new());
    let service = DocumentService::new(
        Arc::new(MemoryDocumentRepository::new()),
        objects.clone(),
        StagingDir::new(staging.path()),
        settings,
    );
    TestApp {
        router: build_router(AppState::new(service)),
        objects,
        staging,
    }
}

fn app() -> TestApp {
    app_with(ServiceSettings::default())
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    async fn get(&self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn delete(&self, uri: &str) -> Response {
        self.send(Request::delete(uri).body(Body::empty()).unwrap()).await
    }

    async fn upload(&self, field: &str, file_name: &str, content: &[u8]) -> Response {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::post("/file")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn list(&self, uri: &str) -> Vec<Value> {
        let response = self.get(uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        match serde_json::from_slice(&body_bytes(response).await).unwrap() {
            Value::Array(items) => items,
            other => panic!("expected array, got {other}"),
        }
    }

    fn staged_files(&self) -> usize {
        std::fs::read_dir(self.staging.path()).unwrap().count()
    }
}

async fn body_bytes(response: Response) -> Vec<u8> {
    to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
}

async fn body_text(response: Response) -> String {
    String::from_utf8(body_bytes(response).await).unwrap()
}

#[tokio::test]
async fn welcome_page() {
    let app = app();
    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, super::health::WELCOME);
}

#[tokio::test]
async fn health_reports_database() {
    let app = app();
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
    assert_eq!(json["database"], "connected");
}

#[tokio::test]
async fn upload_list_delete_scenario() {
    let app = app();

    let response = app.upload("file", "a.txt", b"X").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("a.txt uploaded successfully"));

    let response = app.upload("file", "b.txt", b"X").await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(app.objects.put_count(), 1);

    let found = app.list("/files?searchQuery=a").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "a.txt");
    assert!(found[0]["deletedAt"].is_null());
    let file_id = found[0]["fileId"].as_str().unwrap().to_string();

    let response = app.delete(&format!("/file/{file_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains(&file_id));

    let response = app.get(&format!("/file/{file_id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    assert!(app.list("/files").await.is_empty());
    assert!(app.objects.contains("documents", &file_id));
}

#[tokio::test]
async fn download_returns_exact_bytes_with_headers() {
    let app = app();
    let content = b"\x00\x01binary\xffpayload";
    let response = app.upload("file", "blob.bin", content).await;
    assert_eq!(response.status(), StatusCode::OK);

    let file_id = app.list("/files").await[0]["fileId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.get(&format!("/file/{file_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(headers[header::CONTENT_LENGTH], content.len().to_string().as_str());
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains(&file_id));

    assert_eq!(body_bytes(response).await, content);
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn listing_is_case_insensitive_substring() {
    let app = app();
    for (name, content) in [("Report.PDF", "1"), ("notes.txt", "2"), ("old-report.doc", "3")] {
        let response = app.upload("file", name, content.as_bytes()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let names: Vec<_> = app
        .list("/files?searchQuery=REPORT")
        .await
        .iter()
        .map(|d| d["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["Report.PDF", "old-report.doc"]);
    assert_eq!(app.list("/files?searchQuery=").await.len(), 3);
}

#[tokio::test]
async fn search_term_whitespace_is_literal() {
    let app = app();
    for (name, content) in [("my report.pdf", "1"), ("summary.pdf", "2")] {
        assert_eq!(app.upload("file", name, content.as_bytes()).await.status(), StatusCode::OK);
    }

    let found = app.list("/files?searchQuery=%20").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["name"], "my report.pdf");
}

#[tokio::test]
async fn long_file_name_uploads() {
    let app = app();
    let name = format!("{}.txt", "a".repeat(300));
    let response = app.upload("file", &name, b"X").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.list("/files").await[0]["name"], name.as_str());
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn staged_download_lives_until_body_is_dropped() {
    let app = app();
    app.upload("file", "a.txt", b"X").await;
    let file_id = app.list("/files").await[0]["fileId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = app.get(&format!("/file/{file_id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.staged_files(), 1);
    drop(response);
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn malformed_identifier_is_bad_request() {
    let app = app();
    assert_eq!(app.get("/file/not-a-uuid").await.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.delete("/file/not-a-uuid").await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_identifier_is_not_found() {
    let app = app();
    let id = "1b4e28ba-2fa1-11d2-883f-0016d3cca427";
    assert_eq!(app.get(&format!("/file/{id}")).await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&format!("/file/{id}")).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_upload_is_bad_request() {
    let app = app_with(ServiceSettings {
        max_upload_bytes: 8,
        ..ServiceSettings::default()
    });
    let response = app.upload("file", "big.bin", &[7u8; 32]).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(app.objects.put_count(), 0);
    assert_eq!(app.staged_files(), 0);
}

#[tokio::test]
async fn upload_without_file_field_is_bad_request() {
    let app = app();
    let response = app.upload("attachment", "a.txt", b"X").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn non_multipart_upload_is_bad_request() {
    let app = app();
    let request = Request::post("/file")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn store_failure_is_internal_error() {
    let app = app();
    app.objects.fail_puts(true);
    let response = app.upload("file", "a.txt", b"X").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.list("/files").await.is_empty());
}

#[tokio::test]
async fn wrong_method_is_not_allowed() {
    let app = app();
    let request = Request::builder()
        .method(Method::PUT)
        .uri("/file")
        .body(Body::empty())
        .unwrap();
    assert_eq!(app.send(request).await.status(), StatusCode::METHOD_NOT_ALLOWED);
}
