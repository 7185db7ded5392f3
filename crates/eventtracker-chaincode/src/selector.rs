//! Rich-query selectors.
//!
//! Only the equality subset of the selector language is supported: every
//! field named in `selector` must be present at the top level of the
//! document with an equal JSON value.

use serde_json::{Map, Value};

use eventtracker_core::record::EVENT_DOC_TYPE;

use crate::error::ContractError;

/// A parsed equality selector.
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    fields: Map<String, Value>,
}

impl Selector {
    /// Parses a query string of the form `{"selector": {...}}`.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::InvalidArgument` if the query is not JSON or
    /// has no `selector` object.
    pub fn parse(query: &str) -> Result<Self, ContractError> {
        let value: Value = serde_json::from_str(query)
            .map_err(|e| ContractError::InvalidArgument(format!("query is not JSON: {e}")))?;
        match value.get("selector") {
            Some(Value::Object(fields)) => Ok(Self {
                fields: fields.clone(),
            }),
            _ => Err(ContractError::InvalidArgument(
                "query has no selector object".into(),
            )),
        }
    }

    /// Whether the document satisfies every field of the selector.
    #[must_use]
    pub fn matches(&self, document: &Value) -> bool {
        self.fields
            .iter()
            .all(|(field, expected)| document.get(field) == Some(expected))
    }
}

/// Query string selecting event records of one type.
#[must_use]
pub fn events_by_type_query(event_type: &str) -> String {
    serde_json::json!({
        "selector": {
            "docType": EVENT_DOC_TYPE,
            "eventType": event_type,
        }
    })
    .to_string()
}
