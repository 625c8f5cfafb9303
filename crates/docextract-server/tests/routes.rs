//! Router-level tests: real handlers, in-process fake upstream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use docextract_core::DocExtractConfig;
use docextract_server::{build_router, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "docextract-test-boundary";

/// base64("FORBID"): the fake upstream answers 403 for this payload.
const FORBIDDEN_PAYLOAD_B64: &str = "Rk9SQklE";

enum Part<'a> {
    File {
        field: &'a str,
        name: &'a str,
        bytes: &'a [u8],
    },
    Text {
        field: &'a str,
        value: &'a str,
    },
}

fn multipart_body(parts: &[Part]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File { field, name, bytes } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: image/png\r\n\r\n",
                        field, name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
            Part::Text { field, value } => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn multipart_request(uri: &str, parts: &[Part]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Upstream that accepts the first probe unless the payload is "FORBID".
async fn spawn_upstream() -> (String, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let app = Router::new().route(
        "/extract",
        post(move |Json(body): Json<Value>| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                if body["images"][0]["value"] == FORBIDDEN_PAYLOAD_B64 {
                    return (StatusCode::FORBIDDEN, "no".to_string());
                }
                let payload = json!({"predictions": [{
                    "extracted_text": "hello",
                    "tables": [{"rows": [1, 2, 3]}]
                }]});
                (StatusCode::OK, payload.to_string())
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}/extract", addr), calls)
}

async fn test_app() -> (Router, Arc<AtomicUsize>) {
    let (url, calls) = spawn_upstream().await;
    let config = DocExtractConfig {
        upstream_url: url,
        upstream_timeout: Duration::from_secs(5),
        progress_interval: Duration::from_millis(10),
        ..DocExtractConfig::default()
    };
    let state = Arc::new(AppState::from_config(config).unwrap());
    (build_router(state), calls)
}

async fn wait_for_batch(app: &Router, batch_id: &str) -> Value {
    for _ in 0..200 {
        let response = app
            .clone()
            .oneshot(get(&format!("/api/batches/{}", batch_id)))
            .await
            .unwrap();
        let body = json_body(response).await;
        if body["progress"]["settled"] == body["progress"]["total"] {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("batch {} never settled", batch_id);
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app().await;
    let response = app.oneshot(get("/api/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["upstream"].as_str().unwrap().starts_with("http://127.0.0.1"));
}

#[tokio::test]
async fn test_extract_success_shape() {
    let (app, calls) = test_app().await;
    let request = multipart_request(
        "/api/extract",
        &[
            Part::File {
                field: "file",
                name: "scan.png",
                bytes: b"PNGDATA",
            },
            Part::Text {
                field: "apiKey",
                value: "key-123",
            },
        ],
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;

    assert_eq!(body["fileName"], "scan.png");
    assert_eq!(body["fileSize"], 7);
    assert_eq!(body["extractedText"], "hello");
    assert_eq!(
        body["entities"],
        json!([{"type": "Table", "value": "Table 1 (3 rows)", "confidence": 0.0}])
    );
    assert!(body["data"]["predictions"].is_array());
    assert!(body["processedAt"].is_string());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_extract_without_api_key_is_rejected_locally() {
    let (app, calls) = test_app().await;
    let request = multipart_request(
        "/api/extract",
        &[Part::File {
            field: "file",
            name: "scan.png",
            bytes: b"PNGDATA",
        }],
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_extract_without_file_is_rejected() {
    let (app, calls) = test_app().await;
    let request = multipart_request(
        "/api/extract",
        &[Part::Text {
            field: "apiKey",
            value: "key-123",
        }],
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_extract_forbidden_maps_to_403() {
    let (app, calls) = test_app().await;
    let request = multipart_request(
        "/api/extract",
        &[
            Part::File {
                field: "file",
                name: "secret.png",
                bytes: b"FORBID",
            },
            Part::Text {
                field: "apiKey",
                value: "key-123",
            },
        ],
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("forbidden"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_batch_lifecycle_and_export() {
    let (app, calls) = test_app().await;
    let request = multipart_request(
        "/api/batches",
        &[
            Part::File {
                field: "files",
                name: "a.png",
                bytes: b"AAAA",
            },
            Part::File {
                field: "files",
                name: "b.png",
                bytes: b"FORBID",
            },
            Part::Text {
                field: "apiKey",
                value: "key-123",
            },
        ],
    );

    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let accepted = json_body(response).await;
    assert_eq!(accepted["total"], 2);
    let batch_id = accepted["batchId"].as_str().unwrap().to_string();

    let batch = wait_for_batch(&app, &batch_id).await;
    assert_eq!(batch["progress"]["percent"], 100);
    assert_eq!(batch["results"][0]["fileName"], "a.png");
    assert_eq!(batch["results"][0]["status"], "completed");
    assert_eq!(batch["results"][1]["fileName"], "b.png");
    assert_eq!(batch["results"][1]["status"], "error");
    assert!(batch["results"][1]["errorMessage"].is_string());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let response = app
        .clone()
        .oneshot(get(&format!("/api/batches/{}/export", batch_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("extraction-results-"));
    assert!(disposition.ends_with(".json\""));

    let exported = json_body(response).await;
    let items = exported.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["fileName"], "a.png");
    assert_eq!(items[0]["extractedText"], "hello");
}

#[tokio::test]
async fn test_export_with_nothing_completed_is_empty_array() {
    let (app, _) = test_app().await;
    let request = multipart_request(
        "/api/batches",
        &[
            Part::File {
                field: "files",
                name: "b.png",
                bytes: b"FORBID",
            },
            Part::Text {
                field: "apiKey",
                value: "key-123",
            },
        ],
    );
    let accepted = json_body(app.clone().oneshot(request).await.unwrap()).await;
    let batch_id = accepted["batchId"].as_str().unwrap().to_string();
    wait_for_batch(&app, &batch_id).await;

    let response = app
        .oneshot(get(&format!("/api/batches/{}/export", batch_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn test_batch_without_files_is_rejected() {
    let (app, calls) = test_app().await;
    let request = multipart_request(
        "/api/batches",
        &[Part::Text {
            field: "apiKey",
            value: "key-123",
        }],
    );

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_unknown_batch_is_404() {
    let (app, _) = test_app().await;
    let response = app
        .clone()
        .oneshot(get("/api/batches/does-not-exist"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/batches/does-not-exist")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(delete).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
