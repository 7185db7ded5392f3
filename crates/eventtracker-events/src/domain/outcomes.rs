//! Results of the event tracker operations.

use eventtracker_core::mirror::MirrorRow;
use serde::Serialize;
use serde_json::Value;

/// Whether a record-event call wrote a new mirror row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordStatus {
    /// Ledger record and mirror row were both written.
    Recorded,
    /// The ledger write went through but the mirror already held a row for
    /// its transaction id.
    AlreadyRecorded,
}

/// Result of a successful record-event call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    /// Recorded or already recorded.
    pub status: RecordStatus,
    /// Transaction id correlating the ledger write and the mirror row.
    pub tx_id: String,
    /// The record as returned by the contract.
    pub blockchain: Value,
    /// The mirror row, new or pre-existing.
    pub database: MirrorRow,
}

/// Ledger and mirror results for one event type, side by side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventsByType {
    /// `[{Key, Record}]` from the contract.
    pub blockchain: Value,
    /// Mirror rows with the same type.
    pub database: Vec<MirrorRow>,
}

/// The coordinate projection of a mirror row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coordinate {
    /// Event category.
    pub event_type: String,
    /// Latitude, if known.
    pub latitude: Option<f64>,
    /// Longitude, if known.
    pub longitude: Option<f64>,
}

impl From<MirrorRow> for Coordinate {
    fn from(row: MirrorRow) -> Self {
        Self {
            event_type: row.event_type,
            latitude: row.latitude,
            longitude: row.longitude,
        }
    }
}

/// Result of the mirror connectivity check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorStatus {
    /// Always `"success"`.
    pub status: &'static str,
    /// Human-readable summary.
    pub message: &'static str,
    /// Number of sampled rows.
    pub record_count: usize,
    /// The sampled rows.
    pub data: Vec<MirrorRow>,
}

/// Result of the mirror insert self-test.
#[derive(Debug, Clone, PartialEq)]
pub enum SelfTestOutcome {
    /// The test row was written.
    Inserted(MirrorRow),
    /// A row with the generated test id already existed.
    Duplicate,
}
