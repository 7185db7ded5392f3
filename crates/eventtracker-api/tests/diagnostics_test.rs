//! Integration tests for the mirror diagnostics against `PostgreSQL`.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use eventtracker_ledger::InProcessLedger;
use serde_json::json;
use sqlx::PgPool;

fn ledger() -> Arc<InProcessLedger> {
    Arc::new(InProcessLedger::new("Org1MSP"))
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_status_on_empty_mirror(pool: PgPool) {
    let app = common::build_test_app_with_pool(ledger(), pool);

    let (status, json) = common::get_json(app, "/api/supabase-status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "success");
    assert_eq!(json["recordCount"], 0);
    assert_eq!(json["data"], json!([]));
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_self_test_then_status_sees_row(pool: PgPool) {
    // Arrange
    let (status, json) = common::post_json(
        common::build_test_app_with_pool(ledger(), pool.clone()),
        "/api/test-supabase",
        &json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["blockchain_tx_id"], "test_tx_1768471200000");

    // Act
    let (status, json) = common::get_json(
        common::build_test_app_with_pool(ledger(), pool.clone()),
        "/api/supabase-status",
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["recordCount"], 1);
    assert_eq!(json["data"][0]["event_type"], "test");
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_second_self_test_at_same_instant_is_duplicate(pool: PgPool) {
    common::post_json(
        common::build_test_app_with_pool(ledger(), pool.clone()),
        "/api/test-supabase",
        &json!({}),
    )
    .await;

    let (status, json) = common::post_json(
        common::build_test_app_with_pool(ledger(), pool.clone()),
        "/api/test-supabase",
        &json!({}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["duplicate"], true);
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count.0, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_record_event_against_postgres(pool: PgPool) {
    // Arrange
    let ledger = ledger();
    let body = json!({
        "eventId": "e1",
        "eventType": "flood",
        "description": "x",
        "latitude": "10.5",
        "longitude": 20
    });

    // Act
    let (status, json) = common::post_json(
        common::build_test_app_with_pool(ledger.clone(), pool.clone()),
        "/api/events",
        &body,
    )
    .await;

    // Assert
    assert_eq!(status, StatusCode::CREATED);
    let tx_id = ledger.emitted_events().unwrap()[0].tx_id.clone();
    let row: (String, Option<f64>, Option<f64>) = sqlx::query_as(
        "SELECT event_type, latitude, longitude FROM events WHERE blockchain_tx_id = $1",
    )
    .bind(&tx_id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(row, ("flood".to_owned(), Some(10.5), Some(20.0)));
    assert_eq!(json["database"][0]["id"], row_id(&pool, &tx_id).await);

    let (status, coords) = common::get_json(
        common::build_test_app_with_pool(ledger, pool),
        "/api/events/coordinates",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(coords[0]["latitude"], 10.5);
}

async fn row_id(pool: &PgPool, tx_id: &str) -> i64 {
    let row: (i64,) = sqlx::query_as("SELECT id FROM events WHERE blockchain_tx_id = $1")
        .bind(tx_id)
        .fetch_one(pool)
        .await
        .unwrap();
    row.0
}
