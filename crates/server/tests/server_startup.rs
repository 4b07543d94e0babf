//! Server surface tests: health, config sanitization, metrics, auth.

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};

use common::TestApp;

#[tokio::test]
async fn test_health_endpoint() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/api/v1/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_config_endpoint_redacts_secrets() {
    let app = TestApp::spawn_with_auth(
        "method = \"api_key\"\napi_key = \"super-secret-key\"",
    )
    .await;

    let request = Request::builder()
        .uri("/api/v1/config")
        .header(header::AUTHORIZATION, "Bearer super-secret-key")
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.request(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["auth"]["method"], "api_key");
    assert_eq!(body["auth"]["api_key_configured"], true);
    assert!(!body.to_string().contains("super-secret-key"));
}

#[tokio::test]
async fn test_metrics_endpoint_is_unauthenticated() {
    let app = TestApp::spawn_with_auth(
        "method = \"api_key\"\napi_key = \"super-secret-key\"",
    )
    .await;

    // A couple of requests so counters exist
    let _ = app.get("/api/v1/health").await;

    let (status, body) = app.get_raw("/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("verbatim_http_requests_total"));
}

#[tokio::test]
async fn test_api_requires_key_when_configured() {
    let app = TestApp::spawn_with_auth(
        "method = \"api_key\"\napi_key = \"super-secret-key\"",
    )
    .await;

    let (status, _) = app.get("/api/v1/tasks").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/v1/tasks")
        .header(header::AUTHORIZATION, "Bearer super-secret-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.request(request).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .uri("/api/v1/tasks")
        .header("X-API-Key", "super-secret-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.request(request).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_wrong_api_key_rejected() {
    let app = TestApp::spawn_with_auth(
        "method = \"api_key\"\napi_key = \"super-secret-key\"",
    )
    .await;

    let request = Request::builder()
        .uri("/api/v1/tasks")
        .header(header::AUTHORIZATION, "Bearer wrong-key")
        .body(Body::empty())
        .unwrap();
    let (status, _) = app.request(request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_created_by_comes_from_auth_identity() {
    let app = TestApp::spawn_with_auth(
        "method = \"api_key\"\napi_key = \"super-secret-key\"",
    )
    .await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/v1/tasks")
        .header(header::AUTHORIZATION, "Bearer super-secret-key")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::json!({ "source_url": "https://example.com/a.mp3" }).to_string(),
        ))
        .unwrap();
    let (status, body) = app.request(request).await;

    assert_eq!(status, StatusCode::CREATED);
    let created_by = body["created_by"].as_str().unwrap();
    assert_ne!(created_by, "anonymous");
    assert!(!created_by.contains("super-secret-key"));
}
