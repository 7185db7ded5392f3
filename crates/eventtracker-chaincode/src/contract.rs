//! The event tracker contract.
//!
//! Records are create-or-overwrite: `recordEvent` never checks whether the
//! key already exists, matching plain world-state put semantics.

use tracing::{debug, info};

use eventtracker_core::record::{
    EVENT_DOC_TYPE, EVENT_RECORDED, EventNotification, EventRecord, LedgerEntry,
};

use crate::error::ContractError;
use crate::selector::events_by_type_query;
use crate::stub::{ChaincodeStub, QueryCursor};

/// Transaction function names exposed by the contract.
pub mod functions {
    /// Ledger initialisation.
    pub const INIT_LEDGER: &str = "InitLedger";
    /// Write an event record.
    pub const RECORD_EVENT: &str = "recordEvent";
    /// Point lookup by event id.
    pub const GET_EVENT: &str = "getEvent";
    /// Rich query by event type.
    pub const QUERY_EVENTS_BY_TYPE: &str = "queryEventsByType";
}

/// The event tracker contract. Stateless; all state lives in the stub.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventTracker;

impl EventTracker {
    /// Initialises the ledger. No records are seeded.
    ///
    /// # Errors
    ///
    /// Infallible today; the signature matches the other transactions.
    pub fn init_ledger(&self, stub: &dyn ChaincodeStub) -> Result<String, ContractError> {
        info!(tx_id = stub.tx_id(), "chaincode initialized");
        Ok("Chaincode initialized successfully".to_owned())
    }

    /// Writes an event record under `event_id` and emits `EventRecorded`.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::InvalidArgument` if `metadata` is not JSON,
    /// or the stub's error if the write or the notification fails.
    #[allow(clippy::too_many_arguments)]
    pub fn record_event(
        &self,
        stub: &mut dyn ChaincodeStub,
        event_id: &str,
        event_type: &str,
        timestamp: &str,
        description: &str,
        metadata: &str,
        location: Option<&str>,
    ) -> Result<EventRecord, ContractError> {
        let metadata: serde_json::Value = serde_json::from_str(metadata)
            .map_err(|e| ContractError::InvalidArgument(format!("metadata is not JSON: {e}")))?;

        let record = EventRecord {
            event_id: event_id.to_owned(),
            event_type: event_type.to_owned(),
            timestamp: timestamp.to_owned(),
            description: description.to_owned(),
            location: location.filter(|l| !l.is_empty()).map(ToOwned::to_owned),
            metadata,
            doc_type: EVENT_DOC_TYPE.to_owned(),
        };

        stub.put_state(event_id, serde_json::to_vec(&record)?)?;

        let notification = EventNotification::from(&record);
        stub.set_event(EVENT_RECORDED, serde_json::to_vec(&notification)?)?;

        info!(tx_id = stub.tx_id(), event_id, event_type, "event recorded");
        Ok(record)
    }

    /// Returns the stored bytes for `event_id` unchanged.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::NotFound` if the key is absent or empty.
    pub fn get_event(
        &self,
        stub: &dyn ChaincodeStub,
        event_id: &str,
    ) -> Result<Vec<u8>, ContractError> {
        let bytes = stub.get_state(event_id)?;
        if bytes.is_empty() {
            return Err(ContractError::NotFound(event_id.to_owned()));
        }
        Ok(bytes)
    }

    /// Returns every event record of `event_type` in the world state's
    /// native query order.
    ///
    /// # Errors
    ///
    /// Returns the cursor's error or `ContractError::Serialization` if a
    /// stored value is not JSON. The cursor is closed on every path.
    pub fn query_events_by_type(
        &self,
        stub: &dyn ChaincodeStub,
        event_type: &str,
    ) -> Result<Vec<LedgerEntry>, ContractError> {
        let query = events_by_type_query(event_type);
        let mut cursor = QueryCursor::new(stub.get_query_result(&query)?);

        let mut entries = Vec::new();
        while let Some(kv) = cursor.next()? {
            let record = serde_json::from_slice(&kv.value)?;
            entries.push(LedgerEntry {
                key: kv.key,
                record,
            });
        }
        cursor.close()?;

        debug!(event_type, count = entries.len(), "queried events by type");
        Ok(entries)
    }

    /// Dispatches a transaction by function name and returns the response
    /// bytes a client would receive.
    ///
    /// # Errors
    ///
    /// Returns `ContractError::UnknownFunction` for an unknown name,
    /// `ContractError::InvalidArgument` for a wrong argument count, or the
    /// transaction's own error.
    pub fn invoke(
        &self,
        stub: &mut dyn ChaincodeStub,
        function: &str,
        args: &[String],
    ) -> Result<Vec<u8>, ContractError> {
        match function {
            functions::INIT_LEDGER => Ok(self.init_ledger(stub)?.into_bytes()),
            functions::RECORD_EVENT => match args {
                [event_id, event_type, timestamp, description, metadata] => {
                    let record = self.record_event(
                        stub,
                        event_id,
                        event_type,
                        timestamp,
                        description,
                        metadata,
                        None,
                    )?;
                    Ok(serde_json::to_vec(&record)?)
                }
                [event_id, event_type, timestamp, description, metadata, location] => {
                    let record = self.record_event(
                        stub,
                        event_id,
                        event_type,
                        timestamp,
                        description,
                        metadata,
                        Some(location.as_str()),
                    )?;
                    Ok(serde_json::to_vec(&record)?)
                }
                _ => Err(arity(function, "5 or 6", args.len())),
            },
            functions::GET_EVENT => match args {
                [event_id] => self.get_event(stub, event_id),
                _ => Err(arity(function, "1", args.len())),
            },
            functions::QUERY_EVENTS_BY_TYPE => match args {
                [event_type] => Ok(serde_json::to_vec(
                    &self.query_events_by_type(stub, event_type)?,
                )?),
                _ => Err(arity(function, "1", args.len())),
            },
            other => Err(ContractError::UnknownFunction(other.to_owned())),
        }
    }
}

fn arity(function: &str, expected: &str, actual: usize) -> ContractError {
    ContractError::InvalidArgument(format!(
        "{function} expects {expected} arguments, got {actual}"
    ))
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;
    use crate::memory_state::MemoryWorldState;
    use crate::stub::{KeyValue, StateQueryIterator};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    fn record_flood(state: &mut MemoryWorldState, event_id: &str) {
        EventTracker
            .invoke(
                state,
                functions::RECORD_EVENT,
                &args(&[event_id, "flood", "2026-01-15T10:00:00.000Z", "x", r#"{"a":1}"#]),
            )
            .unwrap();
    }

    #[test]
    fn test_record_event_stores_record_under_event_id() {
        // Arrange
        let mut state = MemoryWorldState::new();
        state.begin_transaction("tx-1");

        // Act
        let record = EventTracker
            .record_event(
                &mut state,
                "e1",
                "flood",
                "2026-01-15T10:00:00.000Z",
                "x",
                r#"{"a":1}"#,
                Some("y"),
            )
            .unwrap();

        // Assert
        assert_eq!(record.doc_type, "event");
        assert_eq!(record.location.as_deref(), Some("y"));
        let stored: EventRecord = serde_json::from_slice(state.get("e1").unwrap()).unwrap();
        assert_eq!(stored, record);
    }

    #[test]
    fn test_record_event_emits_notification() {
        let mut state = MemoryWorldState::new();
        state.begin_transaction("tx-1");

        record_flood(&mut state, "e1");

        let emitted = &state.emitted_events()[0];
        assert_eq!(emitted.name, EVENT_RECORDED);
        let payload: serde_json::Value = serde_json::from_slice(&emitted.payload).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "eventId": "e1",
                "eventType": "flood",
                "timestamp": "2026-01-15T10:00:00.000Z"
            })
        );
    }

    #[test]
    fn test_record_event_overwrites_existing_key() {
        let mut state = MemoryWorldState::new();
        record_flood(&mut state, "e1");

        EventTracker
            .invoke(
                &mut state,
                functions::RECORD_EVENT,
                &args(&["e1", "fire", "2026-01-16T10:00:00.000Z", "z", "{}"]),
            )
            .unwrap();

        assert_eq!(state.len(), 1);
        let stored: EventRecord = serde_json::from_slice(state.get("e1").unwrap()).unwrap();
        assert_eq!(stored.event_type, "fire");
    }

    #[test]
    fn test_record_event_rejects_invalid_metadata() {
        let mut state = MemoryWorldState::new();

        let result = EventTracker.invoke(
            &mut state,
            functions::RECORD_EVENT,
            &args(&["e1", "flood", "t", "x", "{not json"]),
        );

        assert!(matches!(result, Err(ContractError::InvalidArgument(_))));
        assert!(state.is_empty());
        assert!(state.emitted_events().is_empty());
    }

    #[test]
    fn test_get_event_returns_stored_bytes_verbatim() {
        // Arrange
        let mut state = MemoryWorldState::new();
        record_flood(&mut state, "e1");
        let stored = state.get("e1").unwrap().to_vec();

        // Act
        let fetched = EventTracker.get_event(&state, "e1").unwrap();
        let reencoded =
            serde_json::to_vec(&serde_json::from_slice::<serde_json::Value>(&fetched).unwrap())
                .unwrap();

        // Assert
        assert_eq!(fetched, stored);
        assert_eq!(reencoded, stored);
    }

    #[test]
    fn test_metadata_key_order_survives_round_trip() {
        let mut state = MemoryWorldState::new();
        EventTracker
            .invoke(
                &mut state,
                functions::RECORD_EVENT,
                &args(&["e1", "flood", "t", "x", r#"{"zeta":1,"alpha":{"b":2,"a":1}}"#]),
            )
            .unwrap();

        let fetched = EventTracker.get_event(&state, "e1").unwrap();
        let text = String::from_utf8(fetched).unwrap();

        assert!(text.contains(r#""metadata":{"zeta":1,"alpha":{"b":2,"a":1}}"#));
    }

    #[test]
    fn test_get_event_missing_key_is_not_found() {
        let state = MemoryWorldState::new();

        let result = EventTracker.get_event(&state, "nope");

        match result {
            Err(ContractError::NotFound(id)) => assert_eq!(id, "nope"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_get_event_empty_value_is_not_found() {
        let mut state = MemoryWorldState::new();
        state.insert_raw("e1", Vec::new());

        assert!(matches!(
            EventTracker.get_event(&state, "e1"),
            Err(ContractError::NotFound(_))
        ));
    }

    #[test]
    fn test_query_events_by_type_filters_type_and_doc_type() {
        // Arrange
        let mut state = MemoryWorldState::new();
        record_flood(&mut state, "e2");
        record_flood(&mut state, "e1");
        EventTracker
            .invoke(
                &mut state,
                functions::RECORD_EVENT,
                &args(&["e3", "fire", "t", "x", "{}"]),
            )
            .unwrap();
        state.insert_raw(
            "asset1",
            br#"{"docType":"asset","eventType":"flood"}"#.to_vec(),
        );

        // Act
        let entries = EventTracker.query_events_by_type(&state, "flood").unwrap();

        // Assert
        let keys: Vec<&str> = entries.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["e1", "e2"]);
        assert!(entries.iter().all(|e| e.record["eventType"] == "flood"));
        assert!(entries.iter().all(|e| e.record["docType"] == "event"));
        assert_eq!(state.open_cursors(), 0);
    }

    #[test]
    fn test_query_events_by_type_with_no_matches_is_empty() {
        let mut state = MemoryWorldState::new();
        record_flood(&mut state, "e1");

        let bytes = EventTracker
            .invoke(&mut state, functions::QUERY_EVENTS_BY_TYPE, &args(&["quake"]))
            .unwrap();

        assert_eq!(bytes, b"[]");
    }

    /// A stub whose cursor yields one undecodable value and counts closes.
    struct CorruptCursorStub {
        closes: Rc<Cell<usize>>,
    }

    struct CorruptCursor {
        yielded: bool,
        closes: Rc<Cell<usize>>,
    }

    impl StateQueryIterator for CorruptCursor {
        fn next(&mut self) -> Result<Option<KeyValue>, ContractError> {
            if self.yielded {
                return Ok(None);
            }
            self.yielded = true;
            Ok(Some(KeyValue {
                key: "bad".to_owned(),
                value: b"\xff\xfe".to_vec(),
            }))
        }

        fn close(&mut self) -> Result<(), ContractError> {
            self.closes.set(self.closes.get() + 1);
            Ok(())
        }
    }

    impl ChaincodeStub for CorruptCursorStub {
        fn tx_id(&self) -> &str {
            "tx-corrupt"
        }

        fn get_state(&self, _key: &str) -> Result<Vec<u8>, ContractError> {
            Ok(Vec::new())
        }

        fn put_state(&mut self, _key: &str, _value: Vec<u8>) -> Result<(), ContractError> {
            Ok(())
        }

        fn set_event(&mut self, _name: &str, _payload: Vec<u8>) -> Result<(), ContractError> {
            Ok(())
        }

        fn get_query_result(
            &self,
            _query: &str,
        ) -> Result<Box<dyn StateQueryIterator + '_>, ContractError> {
            Ok(Box::new(CorruptCursor {
                yielded: false,
                closes: Rc::clone(&self.closes),
            }))
        }
    }

    #[test]
    fn test_query_closes_cursor_when_decoding_fails() {
        // Arrange
        let closes = Rc::new(Cell::new(0));
        let stub = CorruptCursorStub {
            closes: Rc::clone(&closes),
        };

        // Act
        let result = EventTracker.query_events_by_type(&stub, "flood");

        // Assert
        assert!(matches!(result, Err(ContractError::Serialization(_))));
        assert_eq!(closes.get(), 1);
    }

    #[test]
    fn test_invoke_rejects_unknown_function_and_bad_arity() {
        let mut state = MemoryWorldState::new();

        assert!(matches!(
            EventTracker.invoke(&mut state, "deleteEvent", &args(&["e1"])),
            Err(ContractError::UnknownFunction(_))
        ));
        assert!(matches!(
            EventTracker.invoke(&mut state, functions::GET_EVENT, &[]),
            Err(ContractError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_init_ledger_returns_message() {
        let mut state = MemoryWorldState::new();

        let bytes = EventTracker
            .invoke(&mut state, functions::INIT_LEDGER, &[])
            .unwrap();

        assert_eq!(bytes, b"Chaincode initialized successfully");
    }
}
