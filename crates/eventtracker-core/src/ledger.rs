//! Ledger client abstraction.
//!
//! A [`LedgerConnector`] opens sessions against the external ledger. A
//! [`LedgerSession`] submits state-mutating transactions and evaluates
//! read-only ones against a single contract. Sessions are held through a
//! [`LedgerSessionGuard`], which closes them when dropped.

use std::ops::Deref;

use async_trait::async_trait;

use crate::error::DomainError;

/// Outcome of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResult {
    /// Transaction id assigned by the ledger, when the transport reports it.
    pub tx_id: Option<String>,
    /// Raw bytes returned by the contract.
    pub payload: Vec<u8>,
}

impl TransactionResult {
    /// Decodes the contract response as JSON.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Ledger` if the payload is not valid JSON.
    pub fn payload_json(&self) -> Result<serde_json::Value, DomainError> {
        decode_payload(&self.payload)
    }

    /// The ledger-assigned transaction id: the transport's own id if present,
    /// otherwise a `txId` string echoed inside the JSON payload.
    #[must_use]
    pub fn echoed_tx_id(&self) -> Option<String> {
        if let Some(tx_id) = self.tx_id.as_deref().filter(|id| !id.is_empty()) {
            return Some(tx_id.to_owned());
        }
        serde_json::from_slice::<serde_json::Value>(&self.payload)
            .ok()?
            .get("txId")?
            .as_str()
            .filter(|id| !id.is_empty())
            .map(ToOwned::to_owned)
    }
}

/// Decodes a contract response as JSON.
///
/// # Errors
///
/// Returns `DomainError::Ledger` if the bytes are not valid JSON.
pub fn decode_payload(payload: &[u8]) -> Result<serde_json::Value, DomainError> {
    serde_json::from_slice(payload)
        .map_err(|e| DomainError::Ledger(format!("contract returned invalid JSON: {e}")))
}

/// An open connection to one contract on one channel.
#[async_trait]
pub trait LedgerSession: Send + Sync {
    /// Submit a state-mutating transaction and wait for it to commit.
    async fn submit(&self, tx_name: &str, args: &[String])
    -> Result<TransactionResult, DomainError>;

    /// Evaluate a read-only transaction.
    async fn evaluate(&self, tx_name: &str, args: &[String]) -> Result<Vec<u8>, DomainError>;

    /// Release the connection. Must be idempotent.
    fn close(&mut self);
}

/// Opens ledger sessions.
#[async_trait]
pub trait LedgerConnector: Send + Sync {
    /// Open a session and resolve the contract handle.
    async fn connect(&self) -> Result<Box<dyn LedgerSession>, DomainError>;
}

/// Owns an open session and closes it on drop, so every exit path of the
/// holder releases the connection exactly once.
pub struct LedgerSessionGuard {
    session: Box<dyn LedgerSession>,
}

impl LedgerSessionGuard {
    /// Takes ownership of an open session.
    #[must_use]
    pub fn new(session: Box<dyn LedgerSession>) -> Self {
        Self { session }
    }
}

impl Deref for LedgerSessionGuard {
    type Target = dyn LedgerSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl Drop for LedgerSessionGuard {
    fn drop(&mut self) {
        self.session.close();
        tracing::debug!("ledger session released");
    }
}

impl std::fmt::Debug for LedgerSessionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerSessionGuard").finish_non_exhaustive()
    }
}
