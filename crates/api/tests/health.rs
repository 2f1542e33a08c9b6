//! Integration tests for the health check endpoint and general HTTP behaviour.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, get, TestApp};
use tower::ServiceExt;

// ---------------------------------------------------------------------------
// Test: GET /health returns 200 with expected JSON fields
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_json() {
    let app = TestApp::new();
    let response = get(app.router(), "/health", None).await;

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["db_healthy"], true);
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let app = TestApp::new();
    let response = get(app.router(), "/this-route-does-not-exist", None).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let app = TestApp::new();
    let response = get(app.router(), "/health", None).await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("Response must contain an x-request-id header");
    assert_eq!(request_id.to_str().unwrap().len(), 36, "x-request-id should be a UUID string");
}

// ---------------------------------------------------------------------------
// Test: CORS preflight allows any origin and the client headers
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cors_preflight_allows_any_origin() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/functions/v1/queue-job")
        .header("Origin", "https://app.example.com")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "authorization, x-client-info, apikey, content-type")
        .body(Body::empty())
        .unwrap();

    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(
        headers.get("access-control-allow-origin").unwrap().to_str().unwrap(),
        "*"
    );
    let allow_headers = headers
        .get("access-control-allow-headers")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(allow_headers.contains("x-client-info"), "got: {allow_headers}");
    assert!(allow_headers.contains("apikey"), "got: {allow_headers}");
}
