//! Time-bounded access to the ledger.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use eventtracker_core::error::DomainError;
use eventtracker_core::ledger::{LedgerConnector, LedgerSessionGuard, TransactionResult};

/// Default bound on a single ledger call.
pub const DEFAULT_LEDGER_TIMEOUT: Duration = Duration::from_secs(30);

/// Wraps a connector so that every connect, submit and evaluate is bounded
/// by a timeout, and every opened session is held by a guard.
#[derive(Clone)]
pub struct LedgerAccess {
    connector: Arc<dyn LedgerConnector>,
    timeout: Duration,
}

impl std::fmt::Debug for LedgerAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerAccess")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl LedgerAccess {
    /// Creates a new `LedgerAccess`.
    #[must_use]
    pub fn new(connector: Arc<dyn LedgerConnector>, timeout: Duration) -> Self {
        Self { connector, timeout }
    }

    /// The per-call bound.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Opens a session.
    ///
    /// # Errors
    ///
    /// Returns whatever the connector reports, or `DomainError::Timeout`.
    pub async fn open(&self) -> Result<LedgerSessionGuard, DomainError> {
        let session = self.bounded("connect", self.connector.connect()).await?;
        Ok(LedgerSessionGuard::new(session))
    }

    /// Submits a transaction on `session`.
    ///
    /// # Errors
    ///
    /// Returns the session's error, or `DomainError::Timeout`.
    pub async fn submit(
        &self,
        session: &LedgerSessionGuard,
        tx_name: &str,
        args: &[String],
    ) -> Result<TransactionResult, DomainError> {
        self.bounded(tx_name, session.submit(tx_name, args)).await
    }

    /// Evaluates a read-only transaction on `session`.
    ///
    /// # Errors
    ///
    /// Returns the session's error, or `DomainError::Timeout`.
    pub async fn evaluate(
        &self,
        session: &LedgerSessionGuard,
        tx_name: &str,
        args: &[String],
    ) -> Result<Vec<u8>, DomainError> {
        self.bounded(tx_name, session.evaluate(tx_name, args)).await
    }

    async fn bounded<T>(
        &self,
        operation: &str,
        call: impl Future<Output = Result<T, DomainError>>,
    ) -> Result<T, DomainError> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| {
                tracing::warn!(operation, timeout_secs = self.timeout.as_secs(), "ledger call timed out");
                DomainError::Timeout {
                    operation: operation.to_owned(),
                    elapsed: self.timeout,
                }
            })?
    }
}

#[cfg(test)]
mod tests {
    use eventtracker_test_support::ScriptedLedger;

    use super::*;

    #[tokio::test]
    async fn test_hanging_submit_times_out_and_session_is_released() {
        // Arrange
        let ledger = ScriptedLedger::new().hanging_submit();
        let access = LedgerAccess::new(Arc::new(ledger.clone()), Duration::from_millis(50));

        // Act
        let result = async {
            let session = access.open().await?;
            access.submit(&session, "recordEvent", &[]).await
        }
        .await;

        // Assert
        match result {
            Err(DomainError::Timeout { operation, elapsed }) => {
                assert_eq!(operation, "recordEvent");
                assert_eq!(elapsed, Duration::from_millis(50));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
        assert_eq!(ledger.sessions_opened(), 1);
        assert_eq!(ledger.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_passes_payload_through() {
        let ledger = ScriptedLedger::new().with_evaluate_payload(br#"[{"Key":"e1"}]"#.to_vec());
        let access = LedgerAccess::new(Arc::new(ledger), DEFAULT_LEDGER_TIMEOUT);

        let session = access.open().await.unwrap();
        let bytes = access
            .evaluate(&session, "queryEventsByType", &["flood".to_owned()])
            .await
            .unwrap();

        assert_eq!(bytes, br#"[{"Key":"e1"}]"#);
    }
}
