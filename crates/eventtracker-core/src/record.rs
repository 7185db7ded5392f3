//! Ledger-side event records.

use serde::{Deserialize, Serialize};

/// Document type tag written on every event record, used by rich queries.
pub const EVENT_DOC_TYPE: &str = "event";

/// Name of the ledger notification emitted when an event is recorded.
pub const EVENT_RECORDED: &str = "EventRecorded";

/// An event as stored in the ledger world state under its `event_id` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    /// World-state key.
    pub event_id: String,
    /// Event category, e.g. `flood`.
    pub event_type: String,
    /// RFC 3339 timestamp supplied by the submitter.
    pub timestamp: String,
    /// Free-text description.
    pub description: String,
    /// Free-text location, when the submitter gave one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Opaque caller-supplied JSON.
    pub metadata: serde_json::Value,
    /// Always [`EVENT_DOC_TYPE`].
    pub doc_type: String,
}

/// Payload of the [`EVENT_RECORDED`] notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventNotification {
    /// The recorded event's key.
    pub event_id: String,
    /// The recorded event's type.
    pub event_type: String,
    /// The recorded event's timestamp.
    pub timestamp: String,
}

impl From<&EventRecord> for EventNotification {
    fn from(record: &EventRecord) -> Self {
        Self {
            event_id: record.event_id.clone(),
            event_type: record.event_type.clone(),
            timestamp: record.timestamp.clone(),
        }
    }
}

/// One item of a rich-query result: the world-state key and its decoded record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// World-state key.
    #[serde(rename = "Key")]
    pub key: String,
    /// Decoded value.
    #[serde(rename = "Record")]
    pub record: serde_json::Value,
}
