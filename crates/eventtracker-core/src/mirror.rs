//! Mirror database abstraction.
//!
//! The mirror holds a denormalized copy of each recorded event (type and
//! coordinates) keyed back to the ledger by `blockchain_tx_id`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::MirrorError;

/// A row of the mirror `events` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorRow {
    /// Database-assigned identifier.
    pub id: i64,
    /// Event category copied from the ledger record.
    pub event_type: String,
    /// Latitude in decimal degrees, if the submitter supplied one.
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees, if the submitter supplied one.
    pub longitude: Option<f64>,
    /// Ledger transaction that produced this row.
    pub blockchain_tx_id: String,
    /// Insert time.
    pub created_at: DateTime<Utc>,
}

/// A mirror row before insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMirrorRow {
    /// Event category.
    pub event_type: String,
    /// Latitude in decimal degrees.
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    pub longitude: Option<f64>,
    /// Ledger transaction id; unique across the table.
    pub blockchain_tx_id: String,
}

/// Result of an insert against the unique `blockchain_tx_id` constraint.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    /// The row was written.
    Inserted(MirrorRow),
    /// A row with the same `blockchain_tx_id` already exists; nothing was written.
    Conflict,
}

/// Repository trait for the mirror database.
#[async_trait]
pub trait MirrorRepository: Send + Sync {
    /// Look up the row mirrored for a ledger transaction.
    async fn find_by_tx_id(&self, tx_id: &str) -> Result<Option<MirrorRow>, MirrorError>;

    /// Insert a new row.
    async fn insert(&self, row: NewMirrorRow) -> Result<InsertOutcome, MirrorError>;

    /// All rows with the given event type.
    async fn select_by_type(&self, event_type: &str) -> Result<Vec<MirrorRow>, MirrorError>;

    /// All rows.
    async fn select_all(&self) -> Result<Vec<MirrorRow>, MirrorError>;

    /// Up to `limit` rows, used for connectivity diagnostics.
    async fn sample(&self, limit: i64) -> Result<Vec<MirrorRow>, MirrorError>;
}
