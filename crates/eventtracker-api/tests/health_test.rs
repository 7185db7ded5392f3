//! Integration tests for the health endpoint.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use eventtracker_test_support::{MemoryMirror, ScriptedLedger};

#[tokio::test]
async fn test_health_returns_200_without_touching_ledger() {
    let ledger = ScriptedLedger::new().failing_connect("gateway down");
    let app = common::build_test_app(Arc::new(ledger.clone()), Arc::new(MemoryMirror::new()));

    let (status, json) = common::get_json(app, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(ledger.sessions_opened(), 0);
}

#[tokio::test]
async fn test_unknown_route_returns_404() {
    let app = common::build_test_app(
        Arc::new(ScriptedLedger::new()),
        Arc::new(MemoryMirror::new()),
    );

    let request = axum::http::Request::builder()
        .method("GET")
        .uri("/api/nonexistent/route")
        .body(axum::body::Body::empty())
        .unwrap();

    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
