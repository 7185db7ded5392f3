//! Routes for recording and querying events.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eventtracker_core::error::DomainError;
use eventtracker_core::mirror::MirrorRow;
use eventtracker_events::application::query_handlers;
use eventtracker_events::domain::commands::RecordEvent;
use eventtracker_events::domain::outcomes::{Coordinate, EventsByType, RecordStatus};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

/// Request body for POST /api/events.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordEventRequest {
    /// Ledger key.
    #[serde(default)]
    pub event_id: String,
    /// Event category.
    #[serde(default)]
    pub event_type: String,
    /// Free text.
    #[serde(default)]
    pub description: String,
    /// Free-text location.
    #[serde(default)]
    pub location: Option<String>,
    /// Arbitrary JSON; absent or `null` is recorded as `{}`.
    #[serde(default)]
    pub metadata: Value,
    /// Number or numeric string.
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub latitude: Option<f64>,
    /// Number or numeric string.
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub longitude: Option<f64>,
}

/// Accepts a JSON number or a numeric string. Anything else becomes `None`.
fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

/// Mirror side of a record-event response.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum MirrorWrite {
    /// Rows written by this request.
    Inserted(Vec<MirrorRow>),
    /// The row that already held the transaction id.
    Existing(MirrorRow),
}

/// Response body for POST /api/events.
#[derive(Debug, Serialize)]
pub struct RecordEventResponse {
    /// Outcome summary.
    pub message: &'static str,
    /// The record as returned by the contract.
    pub blockchain: Value,
    /// Inserted rows (201) or the existing row (200).
    pub database: MirrorWrite,
}

/// POST /api/events
#[instrument(skip(state, request))]
async fn record_event(
    State(state): State<AppState>,
    Json(request): Json<RecordEventRequest>,
) -> Result<Response, ApiError> {
    if request.event_id.trim().is_empty() || request.event_type.trim().is_empty() {
        return Err(DomainError::Validation("eventId and eventType are required".into()).into());
    }

    let command = RecordEvent {
        correlation_id: Uuid::new_v4(),
        event_id: request.event_id,
        event_type: request.event_type,
        description: request.description,
        location: request.location,
        metadata: request.metadata,
        latitude: request.latitude,
        longitude: request.longitude,
    };

    info!(correlation_id = %command.correlation_id, "handling record_event command");

    let outcome = state.coordinator.handle_record_event(&command).await?;

    let (status, message, database) = match outcome.status {
        RecordStatus::Recorded => (
            StatusCode::CREATED,
            "Event recorded successfully",
            MirrorWrite::Inserted(vec![outcome.database]),
        ),
        RecordStatus::AlreadyRecorded => (
            StatusCode::OK,
            "Event already recorded",
            MirrorWrite::Existing(outcome.database),
        ),
    };

    Ok((
        status,
        Json(RecordEventResponse {
            message,
            blockchain: outcome.blockchain,
            database,
        }),
    )
        .into_response())
}

/// GET /api/events/type/{event_type}
#[instrument(skip(state))]
async fn query_by_type(
    State(state): State<AppState>,
    Path(event_type): Path<String>,
) -> Result<Json<EventsByType>, ApiError> {
    let coordinator = &state.coordinator;
    let view =
        query_handlers::query_by_type(&event_type, coordinator.ledger(), coordinator.mirror())
            .await?;
    Ok(Json(view))
}

/// GET /api/events/coordinates
async fn coordinates(State(state): State<AppState>) -> Result<Json<Vec<Coordinate>>, ApiError> {
    let coords = query_handlers::coordinates(state.coordinator.mirror()).await?;
    Ok(Json(coords))
}

/// GET /api/events/{event_id}
#[instrument(skip(state))]
async fn get_event(
    State(state): State<AppState>,
    Path(event_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let record = query_handlers::get_event(&event_id, state.coordinator.ledger()).await?;
    Ok(Json(record))
}

/// Returns the router for the events API.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(record_event))
        .route("/coordinates", get(coordinates))
        .route("/type/{event_type}", get(query_by_type))
        .route("/{event_id}", get(get_event))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::Request;
    use eventtracker_core::mirror::MirrorRepository;
    use eventtracker_events::application::coordinator::{CoordinatorConfig, DualWriteCoordinator};
    use eventtracker_test_support::{FailingMirror, FixedClock, MemoryMirror, ScriptedLedger};
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;

    fn app_state(ledger: &ScriptedLedger, mirror: Arc<dyn MirrorRepository>) -> AppState {
        AppState::new(DualWriteCoordinator::new(
            CoordinatorConfig::default(),
            Arc::new(ledger.clone()),
            mirror,
            Arc::new(FixedClock::reference()),
        ))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn post(body: &Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[test]
    fn test_coordinates_accept_numbers_and_numeric_strings() {
        let request: RecordEventRequest = serde_json::from_value(json!({
            "eventId": "e1",
            "eventType": "flood",
            "latitude": "40.5",
            "longitude": 0
        }))
        .unwrap();

        assert_eq!(request.latitude, Some(40.5));
        assert_eq!(request.longitude, Some(0.0));
        assert_eq!(request.metadata, Value::Null);
    }

    #[test]
    fn test_unparseable_coordinates_become_none() {
        let request: RecordEventRequest = serde_json::from_value(json!({
            "eventId": "e1",
            "eventType": "flood",
            "latitude": "north",
            "longitude": null
        }))
        .unwrap();

        assert_eq!(request.latitude, None);
        assert_eq!(request.longitude, None);
    }

    #[tokio::test]
    async fn test_record_event_returns_201_with_both_sides() {
        // Arrange
        let ledger = ScriptedLedger::new().with_tx_id("tx1");
        let app = router().with_state(app_state(&ledger, Arc::new(MemoryMirror::new())));
        let body = json!({
            "eventId": "e1",
            "eventType": "flood",
            "description": "x",
            "location": "y",
            "metadata": { "a": 1 },
            "latitude": 10,
            "longitude": 20
        });

        // Act
        let (status, json) = send(app, post(&body)).await;

        // Assert
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json["message"], "Event recorded successfully");
        assert_eq!(json["blockchain"]["eventId"], "e1");
        assert_eq!(json["database"][0]["event_type"], "flood");
        assert_eq!(json["database"][0]["latitude"], 10.0);
        assert_eq!(json["database"][0]["longitude"], 20.0);
        assert_eq!(json["database"][0]["blockchain_tx_id"], "tx1");
    }

    #[tokio::test]
    async fn test_record_event_without_event_id_returns_400() {
        let ledger = ScriptedLedger::new();
        let app = router().with_state(app_state(&ledger, Arc::new(MemoryMirror::new())));

        let (status, json) = send(app, post(&json!({ "eventType": "flood" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "eventId and eventType are required");
        assert_eq!(ledger.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_record_event_insert_failure_returns_500_with_code() {
        let ledger = ScriptedLedger::new().with_tx_id("tx1");
        let app = router().with_state(app_state(&ledger, Arc::new(FailingMirror::insert_denied())));

        let (status, json) =
            send(app, post(&json!({ "eventId": "e1", "eventType": "flood" }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Failed to store event in database");
        assert_eq!(json["code"], "42501");
        assert!(json["details"].is_string());
    }

    #[tokio::test]
    async fn test_record_event_ledger_unreachable_returns_500() {
        let ledger = ScriptedLedger::new().failing_connect("Failed to connect to gateway: refused");
        let app = router().with_state(app_state(&ledger, Arc::new(MemoryMirror::new())));

        let (status, json) =
            send(app, post(&json!({ "eventId": "e1", "eventType": "flood" }))).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json["error"],
            "connection error: Failed to connect to gateway: refused"
        );
    }

    #[tokio::test]
    async fn test_query_by_type_returns_blockchain_and_database() {
        let ledger = ScriptedLedger::new().with_evaluate_payload(b"[]".to_vec());
        let app = router().with_state(app_state(&ledger, Arc::new(MemoryMirror::new())));

        let (status, json) = send(app, get("/type/flood")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({ "blockchain": [], "database": [] }));
    }

    #[tokio::test]
    async fn test_get_event_missing_returns_404() {
        let ledger = ScriptedLedger::new().evaluate_not_found();
        let app = router().with_state(app_state(&ledger, Arc::new(MemoryMirror::new())));

        let (status, json) = send(app, get("/e404")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Event e404 does not exist");
    }

    #[tokio::test]
    async fn test_coordinates_route_is_not_shadowed_by_event_id() {
        let ledger = ScriptedLedger::new().evaluate_not_found();
        let app = router().with_state(app_state(&ledger, Arc::new(MemoryMirror::new())));

        let (status, json) = send(app, get("/coordinates")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!([]));
        assert_eq!(ledger.sessions_opened(), 0);
    }
}
