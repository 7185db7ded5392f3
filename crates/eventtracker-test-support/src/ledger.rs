//! Scripted ledger: a `LedgerConnector` whose behavior is fixed up front.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use eventtracker_core::error::DomainError;
use eventtracker_core::ledger::{LedgerConnector, LedgerSession, TransactionResult};
use serde_json::json;

/// A transaction seen by a scripted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Contract function name.
    pub function: String,
    /// String arguments.
    pub args: Vec<String>,
}

#[derive(Debug, Default)]
struct Stats {
    opened: AtomicUsize,
    closed: AtomicUsize,
    submissions: Mutex<Vec<Submission>>,
}

/// A ledger connector driven by a fixed script.
///
/// By default every connect succeeds, submits echo the first four arguments
/// back as a record without reporting a transaction id, and evaluates return
/// `[]`. Clones share their session counters.
#[derive(Debug, Clone, Default)]
pub struct ScriptedLedger {
    tx_id: Option<String>,
    connect_failure: Option<String>,
    submit_failure: Option<String>,
    hang_on_submit: bool,
    evaluate_payload: Option<Vec<u8>>,
    evaluate_not_found: bool,
    stats: Arc<Stats>,
}

impl ScriptedLedger {
    /// A ledger that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `tx_id` as the transaction id of every submit.
    #[must_use]
    pub fn with_tx_id(mut self, tx_id: impl Into<String>) -> Self {
        self.tx_id = Some(tx_id.into());
        self
    }

    /// Fail `connect` with `DomainError::Connection(message)`.
    #[must_use]
    pub fn failing_connect(mut self, message: impl Into<String>) -> Self {
        self.connect_failure = Some(message.into());
        self
    }

    /// Fail every submit with `DomainError::Ledger(message)`.
    #[must_use]
    pub fn failing_submit(mut self, message: impl Into<String>) -> Self {
        self.submit_failure = Some(message.into());
        self
    }

    /// Never complete a submit.
    #[must_use]
    pub fn hanging_submit(mut self) -> Self {
        self.hang_on_submit = true;
        self
    }

    /// Return `payload` from every evaluate.
    #[must_use]
    pub fn with_evaluate_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.evaluate_payload = Some(payload.into());
        self
    }

    /// Fail every evaluate with `DomainError::NotFound`.
    #[must_use]
    pub fn evaluate_not_found(mut self) -> Self {
        self.evaluate_not_found = true;
        self
    }

    /// Sessions opened so far.
    #[must_use]
    pub fn sessions_opened(&self) -> usize {
        self.stats.opened.load(Ordering::SeqCst)
    }

    /// Sessions closed so far.
    #[must_use]
    pub fn sessions_closed(&self) -> usize {
        self.stats.closed.load(Ordering::SeqCst)
    }

    /// Every submit received, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    #[must_use]
    pub fn submissions(&self) -> Vec<Submission> {
        self.stats.submissions.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerConnector for ScriptedLedger {
    async fn connect(&self) -> Result<Box<dyn LedgerSession>, DomainError> {
        if let Some(message) = &self.connect_failure {
            return Err(DomainError::Connection(message.clone()));
        }
        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            script: self.clone(),
            closed: false,
        }))
    }
}

struct ScriptedSession {
    script: ScriptedLedger,
    closed: bool,
}

#[async_trait]
impl LedgerSession for ScriptedSession {
    async fn submit(
        &self,
        tx_name: &str,
        args: &[String],
    ) -> Result<TransactionResult, DomainError> {
        self.script
            .stats
            .submissions
            .lock()
            .unwrap()
            .push(Submission {
                function: tx_name.to_owned(),
                args: args.to_vec(),
            });

        if self.script.hang_on_submit {
            std::future::pending::<()>().await;
        }
        if let Some(message) = &self.script.submit_failure {
            return Err(DomainError::Ledger(message.clone()));
        }

        let arg = |i: usize| args.get(i).cloned().unwrap_or_default();
        let record = json!({
            "eventId": arg(0),
            "eventType": arg(1),
            "timestamp": arg(2),
            "description": arg(3),
            "docType": "event",
        });
        Ok(TransactionResult {
            tx_id: self.script.tx_id.clone(),
            payload: record.to_string().into_bytes(),
        })
    }

    async fn evaluate(&self, _tx_name: &str, args: &[String]) -> Result<Vec<u8>, DomainError> {
        if self.script.evaluate_not_found {
            let key = args.first().map_or("", String::as_str);
            return Err(DomainError::NotFound(format!("Event {key} does not exist")));
        }
        Ok(self
            .script
            .evaluate_payload
            .clone()
            .unwrap_or_else(|| b"[]".to_vec()))
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.script.stats.closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}
