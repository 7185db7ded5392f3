//! Mirror database diagnostics.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use eventtracker_core::mirror::MirrorRow;
use eventtracker_events::application::query_handlers;
use eventtracker_events::domain::outcomes::SelfTestOutcome;
use serde::Serialize;
use serde_json::json;
use tracing::{error, instrument};

use crate::state::AppState;

/// Body of a successful self-test.
#[derive(Debug, Serialize)]
pub struct SelfTestResponse {
    /// Outcome summary.
    pub message: &'static str,
    /// The inserted test row.
    pub data: Vec<MirrorRow>,
}

/// GET /api/supabase-status
#[instrument(skip(state))]
async fn mirror_status(State(state): State<AppState>) -> Response {
    match query_handlers::mirror_status(state.coordinator.mirror()).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => {
            error!(error = %e, "mirror status check failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": "Mirror database connection failed",
                    "error": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// POST /api/test-supabase
#[instrument(skip(state))]
async fn mirror_self_test(State(state): State<AppState>) -> Response {
    let coordinator = &state.coordinator;
    match query_handlers::mirror_self_test(coordinator.mirror(), coordinator.clock()).await {
        Ok(SelfTestOutcome::Inserted(row)) => Json(SelfTestResponse {
            message: "Mirror self-test successful",
            data: vec![row],
        })
        .into_response(),
        Ok(SelfTestOutcome::Duplicate) => Json(json!({
            "message": "Duplicate detected (this should not happen for a timestamp-based ID)",
            "duplicate": true,
        }))
        .into_response(),
        Err(e) => {
            error!(error = %e, "mirror self-test failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Mirror self-test failed",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

/// Returns the diagnostics router. Both routes only touch the mirror.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/supabase-status", get(mirror_status))
        .route("/test-supabase", post(mirror_self_test))
}
