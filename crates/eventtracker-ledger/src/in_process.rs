//! In-process development ledger.
//!
//! Hosts the event tracker contract over a shared [`MemoryWorldState`].
//! Each submit runs against a copy of the world state and swaps it in only
//! if the contract succeeds, so a failed transaction leaves no writes.
//! Evaluations run against a throwaway copy.

use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use eventtracker_chaincode::memory_state::{EmittedEvent, MemoryWorldState};
use eventtracker_chaincode::{ContractError, EventTracker};
use eventtracker_core::error::DomainError;
use eventtracker_core::ledger::{LedgerConnector, LedgerSession, TransactionResult};

/// A ledger living inside this process.
#[derive(Debug, Clone)]
pub struct InProcessLedger {
    state: Arc<Mutex<MemoryWorldState>>,
    contract: EventTracker,
    creator: String,
}

impl InProcessLedger {
    /// Creates an empty ledger whose transactions are attributed to `msp_id`.
    #[must_use]
    pub fn new(msp_id: impl Into<String>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryWorldState::new())),
            contract: EventTracker,
            creator: msp_id.into(),
        }
    }

    /// A copy of the current world state.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Ledger` if the state lock is poisoned.
    pub fn snapshot(&self) -> Result<MemoryWorldState, DomainError> {
        Ok(lock(&self.state)?.clone())
    }

    /// Notifications emitted by committed transactions.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Ledger` if the state lock is poisoned.
    pub fn emitted_events(&self) -> Result<Vec<EmittedEvent>, DomainError> {
        Ok(lock(&self.state)?.emitted_events().to_vec())
    }
}

#[async_trait]
impl LedgerConnector for InProcessLedger {
    async fn connect(&self) -> Result<Box<dyn LedgerSession>, DomainError> {
        Ok(Box::new(InProcessSession {
            state: Arc::clone(&self.state),
            contract: self.contract,
            creator: self.creator.clone(),
            open: true,
        }))
    }
}

/// A session against an [`InProcessLedger`].
#[derive(Debug)]
pub struct InProcessSession {
    state: Arc<Mutex<MemoryWorldState>>,
    contract: EventTracker,
    creator: String,
    open: bool,
}

impl InProcessSession {
    fn ensure_open(&self) -> Result<(), DomainError> {
        if self.open {
            Ok(())
        } else {
            Err(DomainError::Connection("session is closed".into()))
        }
    }
}

#[async_trait]
impl LedgerSession for InProcessSession {
    async fn submit(
        &self,
        tx_name: &str,
        args: &[String],
    ) -> Result<TransactionResult, DomainError> {
        self.ensure_open()?;
        let tx_id = new_tx_id(&self.creator);

        let mut state = lock(&self.state)?;
        let mut draft = state.clone();
        draft.begin_transaction(tx_id.clone());
        let payload = self
            .contract
            .invoke(&mut draft, tx_name, args)
            .map_err(contract_error)?;
        *state = draft;

        debug!(tx_name, tx_id = %tx_id, "in-process transaction committed");
        Ok(TransactionResult {
            tx_id: Some(tx_id),
            payload,
        })
    }

    async fn evaluate(&self, tx_name: &str, args: &[String]) -> Result<Vec<u8>, DomainError> {
        self.ensure_open()?;
        let mut scratch = lock(&self.state)?.clone();
        self.contract
            .invoke(&mut scratch, tx_name, args)
            .map_err(contract_error)
    }

    fn close(&mut self) {
        self.open = false;
    }
}

fn lock(state: &Mutex<MemoryWorldState>) -> Result<MutexGuard<'_, MemoryWorldState>, DomainError> {
    state
        .lock()
        .map_err(|_| DomainError::Ledger("world state lock poisoned".into()))
}

fn contract_error(err: ContractError) -> DomainError {
    match err {
        ContractError::NotFound(_) => DomainError::NotFound(err.to_string()),
        other => DomainError::Ledger(other.to_string()),
    }
}

/// Transaction id as the hex SHA-256 of a random 24-byte nonce followed by
/// the creator identity.
fn new_tx_id(creator: &str) -> String {
    let nonce: [u8; 24] = rand::random();
    let digest = Sha256::new()
        .chain_update(nonce)
        .chain_update(creator.as_bytes())
        .finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use eventtracker_chaincode::contract::functions;

    use super::*;

    fn record_args(event_id: &str, event_type: &str) -> Vec<String> {
        vec![
            event_id.to_owned(),
            event_type.to_owned(),
            "2026-01-15T10:00:00.000Z".to_owned(),
            "x".to_owned(),
            r#"{"a":1}"#.to_owned(),
        ]
    }

    #[tokio::test]
    async fn test_submit_commits_record_and_reports_tx_id() {
        // Arrange
        let ledger = InProcessLedger::new("Org1MSP");
        let session = ledger.connect().await.unwrap();

        // Act
        let result = session
            .submit(functions::RECORD_EVENT, &record_args("e1", "flood"))
            .await
            .unwrap();

        // Assert
        let tx_id = result.tx_id.unwrap();
        assert_eq!(tx_id.len(), 64);
        assert!(ledger.snapshot().unwrap().get("e1").is_some());
        let events = ledger.emitted_events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].tx_id, tx_id);
    }

    #[tokio::test]
    async fn test_failed_submit_leaves_no_writes() {
        let ledger = InProcessLedger::new("Org1MSP");
        let session = ledger.connect().await.unwrap();
        let mut args = record_args("e1", "flood");
        args[4] = "{broken".to_owned();

        let result = session.submit(functions::RECORD_EVENT, &args).await;

        assert!(matches!(result, Err(DomainError::Ledger(_))));
        assert!(ledger.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_evaluate_get_event_missing_is_not_found() {
        let ledger = InProcessLedger::new("Org1MSP");
        let session = ledger.connect().await.unwrap();

        let result = session
            .evaluate(functions::GET_EVENT, &["missing".to_owned()])
            .await;

        match result {
            Err(DomainError::NotFound(msg)) => assert_eq!(msg, "Event missing does not exist"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_tx_ids_are_unique_per_submit() {
        let ledger = InProcessLedger::new("Org1MSP");
        let session = ledger.connect().await.unwrap();

        let first = session
            .submit(functions::RECORD_EVENT, &record_args("e1", "flood"))
            .await
            .unwrap();
        let second = session
            .submit(functions::RECORD_EVENT, &record_args("e1", "flood"))
            .await
            .unwrap();

        assert_ne!(first.tx_id, second.tx_id);
    }

    #[tokio::test]
    async fn test_closed_session_rejects_calls() {
        let ledger = InProcessLedger::new("Org1MSP");
        let mut session = ledger.connect().await.unwrap();
        session.close();

        let result = session
            .evaluate(functions::QUERY_EVENTS_BY_TYPE, &["flood".to_owned()])
            .await;

        assert!(matches!(result, Err(DomainError::Connection(_))));
    }
}
