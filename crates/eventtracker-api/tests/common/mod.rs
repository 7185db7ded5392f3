//! Shared test helpers for API integration tests.
#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use eventtracker_core::clock::Clock;
use eventtracker_core::ledger::LedgerConnector;
use eventtracker_core::mirror::MirrorRepository;
use eventtracker_events::application::coordinator::{CoordinatorConfig, DualWriteCoordinator};
use eventtracker_mirror::PgMirrorRepository;
use eventtracker_test_support::FixedClock;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use eventtracker_api::routes;
use eventtracker_api::state::AppState;

/// Fixed timestamp used across all integration tests.
fn fixed_clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock(
        chrono::TimeZone::with_ymd_and_hms(&chrono::Utc, 2026, 1, 15, 10, 0, 0).unwrap(),
    ))
}

/// Build the full app router over the given ledger and mirror. Uses the same
/// route structure as `main.rs`.
pub fn build_test_app(
    connector: Arc<dyn LedgerConnector>,
    mirror: Arc<dyn MirrorRepository>,
) -> Router {
    let coordinator =
        DualWriteCoordinator::new(CoordinatorConfig::default(), connector, mirror, fixed_clock());

    Router::new()
        .merge(routes::health::router())
        .nest("/api/events", routes::events::router())
        .nest("/api", routes::diagnostics::router())
        .with_state(AppState::new(coordinator))
}

/// Build the full app router with a real `PgMirrorRepository`.
pub fn build_test_app_with_pool(connector: Arc<dyn LedgerConnector>, pool: PgPool) -> Router {
    build_test_app(connector, Arc::new(PgMirrorRepository::new(pool)))
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(
    app: Router,
    uri: &str,
    body: &serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(body).unwrap()))
        .unwrap();

    send(app, request).await
}

/// Send a GET request and return the response.
pub async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    send(app, request).await
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();

    (status, json)
}
