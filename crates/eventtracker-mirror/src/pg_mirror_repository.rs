//! `PostgreSQL` implementation of the `MirrorRepository` trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use eventtracker_core::error::MirrorError;
use eventtracker_core::mirror::{InsertOutcome, MirrorRepository, MirrorRow, NewMirrorRow};

const COLUMNS: &str = "id, event_type, latitude, longitude, blockchain_tx_id, created_at";

/// PostgreSQL-backed mirror repository.
#[derive(Debug, Clone)]
pub struct PgMirrorRepository {
    pool: PgPool,
}

impl PgMirrorRepository {
    /// Creates a new `PgMirrorRepository`.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EventRow {
    id: i64,
    event_type: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    blockchain_tx_id: String,
    created_at: DateTime<Utc>,
}

impl From<EventRow> for MirrorRow {
    fn from(row: EventRow) -> Self {
        Self {
            id: row.id,
            event_type: row.event_type,
            latitude: row.latitude,
            longitude: row.longitude,
            blockchain_tx_id: row.blockchain_tx_id,
            created_at: row.created_at,
        }
    }
}

/// Keeps the database's own error code (SQLSTATE) when there is one.
fn mirror_error(err: sqlx::Error) -> MirrorError {
    match &err {
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => MirrorError::with_code(db.message(), code),
            None => MirrorError::new(db.message()),
        },
        _ => MirrorError::new(err.to_string()),
    }
}

#[async_trait]
impl MirrorRepository for PgMirrorRepository {
    async fn find_by_tx_id(&self, tx_id: &str) -> Result<Option<MirrorRow>, MirrorError> {
        let row = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {COLUMNS} FROM events WHERE blockchain_tx_id = $1 LIMIT 1"
        ))
        .bind(tx_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(mirror_error)?;
        Ok(row.map(MirrorRow::from))
    }

    async fn insert(&self, row: NewMirrorRow) -> Result<InsertOutcome, MirrorError> {
        let inserted = sqlx::query_as::<_, EventRow>(&format!(
            "INSERT INTO events (event_type, latitude, longitude, blockchain_tx_id) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT (blockchain_tx_id) DO NOTHING \
             RETURNING {COLUMNS}"
        ))
        .bind(&row.event_type)
        .bind(row.latitude)
        .bind(row.longitude)
        .bind(&row.blockchain_tx_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(mirror_error)?;

        Ok(match inserted {
            Some(row) => {
                tracing::debug!(id = row.id, tx_id = %row.blockchain_tx_id, "mirror row inserted");
                InsertOutcome::Inserted(row.into())
            }
            None => {
                tracing::debug!(tx_id = %row.blockchain_tx_id, "mirror insert hit unique constraint");
                InsertOutcome::Conflict
            }
        })
    }

    async fn select_by_type(&self, event_type: &str) -> Result<Vec<MirrorRow>, MirrorError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {COLUMNS} FROM events WHERE event_type = $1 ORDER BY id"
        ))
        .bind(event_type)
        .fetch_all(&self.pool)
        .await
        .map_err(mirror_error)?;
        Ok(rows.into_iter().map(MirrorRow::from).collect())
    }

    async fn select_all(&self) -> Result<Vec<MirrorRow>, MirrorError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!("SELECT {COLUMNS} FROM events ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(mirror_error)?;
        Ok(rows.into_iter().map(MirrorRow::from).collect())
    }

    async fn sample(&self, limit: i64) -> Result<Vec<MirrorRow>, MirrorError> {
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {COLUMNS} FROM events ORDER BY id LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(mirror_error)?;
        Ok(rows.into_iter().map(MirrorRow::from).collect())
    }
}
