//! In-memory world state.
//!
//! Keys are held in a `BTreeMap`, so rich queries return matches in key
//! order. Writes apply immediately; callers that need transactional
//! behavior execute against a clone and swap it in on success.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::ContractError;
use crate::selector::Selector;
use crate::stub::{ChaincodeStub, KeyValue, StateQueryIterator};

/// A notification attached to a transaction via `set_event`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmittedEvent {
    /// Transaction that emitted the notification.
    pub tx_id: String,
    /// Notification name.
    pub name: String,
    /// Raw payload.
    pub payload: Vec<u8>,
}

/// World state backed by an ordered in-memory map.
#[derive(Debug, Clone, Default)]
pub struct MemoryWorldState {
    state: BTreeMap<String, Vec<u8>>,
    events: Vec<EmittedEvent>,
    tx_id: String,
    open_cursors: Arc<AtomicUsize>,
}

impl MemoryWorldState {
    /// Creates an empty world state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the id reported by `tx_id` for subsequent contract calls.
    pub fn begin_transaction(&mut self, tx_id: impl Into<String>) {
        self.tx_id = tx_id.into();
    }

    /// Raw value stored under `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&[u8]> {
        self.state.get(key).map(Vec::as_slice)
    }

    /// Stores raw bytes without going through a contract.
    pub fn insert_raw(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.state.insert(key.into(), value);
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.len()
    }

    /// Whether no keys are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state.is_empty()
    }

    /// Notifications emitted so far.
    #[must_use]
    pub fn emitted_events(&self) -> &[EmittedEvent] {
        &self.events
    }

    /// Query cursors opened and not yet closed.
    #[must_use]
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }
}

impl ChaincodeStub for MemoryWorldState {
    fn tx_id(&self) -> &str {
        &self.tx_id
    }

    fn get_state(&self, key: &str) -> Result<Vec<u8>, ContractError> {
        Ok(self.state.get(key).cloned().unwrap_or_default())
    }

    fn put_state(&mut self, key: &str, value: Vec<u8>) -> Result<(), ContractError> {
        if key.is_empty() {
            return Err(ContractError::InvalidArgument(
                "key must not be an empty string".into(),
            ));
        }
        self.state.insert(key.to_owned(), value);
        Ok(())
    }

    fn set_event(&mut self, name: &str, payload: Vec<u8>) -> Result<(), ContractError> {
        if name.is_empty() {
            return Err(ContractError::InvalidArgument(
                "event name must not be empty".into(),
            ));
        }
        self.events.push(EmittedEvent {
            tx_id: self.tx_id.clone(),
            name: name.to_owned(),
            payload,
        });
        Ok(())
    }

    fn get_query_result(
        &self,
        query: &str,
    ) -> Result<Box<dyn StateQueryIterator + '_>, ContractError> {
        let selector = Selector::parse(query)?;
        let matches: Vec<KeyValue> = self
            .state
            .iter()
            .filter(|(_, value)| {
                serde_json::from_slice::<serde_json::Value>(value)
                    .is_ok_and(|document| selector.matches(&document))
            })
            .map(|(key, value)| KeyValue {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();

        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryQueryIterator {
            items: matches.into_iter(),
            open_cursors: Arc::clone(&self.open_cursors),
            closed: false,
        }))
    }
}

struct MemoryQueryIterator {
    items: std::vec::IntoIter<KeyValue>,
    open_cursors: Arc<AtomicUsize>,
    closed: bool,
}

impl StateQueryIterator for MemoryQueryIterator {
    fn next(&mut self) -> Result<Option<KeyValue>, ContractError> {
        if self.closed {
            return Err(ContractError::State("cursor already closed".into()));
        }
        Ok(self.items.next())
    }

    fn close(&mut self) -> Result<(), ContractError> {
        if !self.closed {
            self.closed = true;
            self.open_cursors.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
