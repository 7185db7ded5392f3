//! Commands for the event tracker.

use serde_json::Value;
use uuid::Uuid;

/// Command to record an event on the ledger and mirror it.
#[derive(Debug, Clone)]
pub struct RecordEvent {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Ledger key of the record.
    pub event_id: String,
    /// Event category.
    pub event_type: String,
    /// Free-text description.
    pub description: String,
    /// Free-text location, stored on the ledger record when present.
    pub location: Option<String>,
    /// Opaque metadata; `Null` is recorded as `{}`.
    pub metadata: Value,
    /// Latitude for the mirror row.
    pub latitude: Option<f64>,
    /// Longitude for the mirror row.
    pub longitude: Option<f64>,
}
