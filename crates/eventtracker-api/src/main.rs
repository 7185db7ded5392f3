//! Event tracker API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use eventtracker_api::config::{AppConfig, LedgerMode};
use eventtracker_api::error::AppError;
use eventtracker_api::routes;
use eventtracker_api::state::AppState;
use eventtracker_api::telemetry;
use eventtracker_core::clock::SystemClock;
use eventtracker_core::ledger::LedgerConnector;
use eventtracker_events::application::coordinator::{CoordinatorConfig, DualWriteCoordinator};
use eventtracker_ledger::{InProcessLedger, RestGateway};
use eventtracker_mirror::PgMirrorRepository;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let _telemetry = telemetry::init(config.otlp_endpoint.as_deref())?;

    tracing::info!("Starting event tracker API server");

    let connector: Arc<dyn LedgerConnector> = match config.ledger_mode {
        LedgerMode::Gateway => Arc::new(
            RestGateway::new(config.ledger.clone()).map_err(|e| AppError::Config(e.to_string()))?,
        ),
        LedgerMode::InProcess => {
            tracing::warn!("Using the in-process ledger; records do not outlive this process");
            Arc::new(InProcessLedger::new(config.ledger.msp_id.clone()))
        }
    };

    // Create the mirror pool and bring its schema up to date.
    let pool = config.mirror.connect().await?;
    eventtracker_mirror::MIGRATOR.run(&pool).await?;

    let coordinator = DualWriteCoordinator::new(
        CoordinatorConfig {
            ledger_timeout: config.ledger_timeout,
        },
        connector,
        Arc::new(PgMirrorRepository::new(pool)),
        Arc::new(SystemClock),
    );
    let app_state = AppState::new(coordinator);

    // TODO: Replace CorsLayer::permissive() with restricted origins for production.
    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/events", routes::events::router())
        .nest("/api", routes::diagnostics::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app).await?;

    Ok(())
}
