//! Dual-write coordinator.
//!
//! Writes an event to the ledger first, then mirrors a denormalized row into
//! the relational database keyed by the ledger transaction id. The two
//! writes are not atomic: a mirror failure after the ledger commit leaves the
//! ledger record in place and is reported to the caller. Nothing is retried
//! or rolled back.

use std::sync::Arc;
use std::time::Duration;

use eventtracker_chaincode::contract::functions;
use eventtracker_core::clock::Clock;
use eventtracker_core::error::{DomainError, MirrorError};
use eventtracker_core::ledger::LedgerConnector;
use eventtracker_core::mirror::{InsertOutcome, MirrorRepository, MirrorRow, NewMirrorRow};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::application::ledger_access::{DEFAULT_LEDGER_TIMEOUT, LedgerAccess};
use crate::domain::commands::RecordEvent;
use crate::domain::outcomes::{RecordOutcome, RecordStatus};

/// Coordinator settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Bound on each ledger call.
    pub ledger_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            ledger_timeout: DEFAULT_LEDGER_TIMEOUT,
        }
    }
}

/// Coordinates the ledger write and the mirror write of one event.
#[derive(Clone)]
pub struct DualWriteCoordinator {
    ledger: LedgerAccess,
    mirror: Arc<dyn MirrorRepository>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for DualWriteCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualWriteCoordinator")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl DualWriteCoordinator {
    /// Creates a new `DualWriteCoordinator`.
    #[must_use]
    pub fn new(
        config: CoordinatorConfig,
        connector: Arc<dyn LedgerConnector>,
        mirror: Arc<dyn MirrorRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger: LedgerAccess::new(connector, config.ledger_timeout),
            mirror,
            clock,
        }
    }

    /// Time-bounded ledger access, shared with the query handlers.
    #[must_use]
    pub fn ledger(&self) -> &LedgerAccess {
        &self.ledger
    }

    /// The mirror repository.
    #[must_use]
    pub fn mirror(&self) -> &dyn MirrorRepository {
        self.mirror.as_ref()
    }

    /// The clock.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Handles the `RecordEvent` command: submits `recordEvent` to the
    /// ledger, then checks the mirror for the transaction id and inserts a
    /// row if none exists. The ledger session is released on every exit.
    ///
    /// # Errors
    ///
    /// - `DomainError::Connection` or `DomainError::Ledger` if the ledger
    ///   write did not happen;
    /// - `DomainError::Timeout` if a ledger call did not answer in time; a
    ///   submit the gateway already accepted may or may not have committed;
    /// - `DomainError::MirrorCheck` or `DomainError::MirrorWrite` if the
    ///   ledger write happened but the mirror step failed.
    #[instrument(
        skip(self, command),
        fields(correlation_id = %command.correlation_id, event_id = %command.event_id)
    )]
    pub async fn handle_record_event(
        &self,
        command: &RecordEvent,
    ) -> Result<RecordOutcome, DomainError> {
        let session = self.ledger.open().await?;

        let args = self.contract_args(command)?;
        let result = self
            .ledger
            .submit(&session, functions::RECORD_EVENT, &args)
            .await?;
        let blockchain = result.payload_json()?;
        let tx_id = result.echoed_tx_id().unwrap_or_else(|| {
            let fallback = format!("tx_{}", self.clock.unix_millis());
            warn!(tx_id = %fallback, "ledger reported no transaction id; using fallback");
            fallback
        });
        info!(tx_id = %tx_id, "event written to ledger");

        match self.mirror.find_by_tx_id(&tx_id).await {
            Ok(Some(existing)) => {
                info!(tx_id = %tx_id, row_id = existing.id, "event already mirrored");
                return Ok(already_recorded(command, tx_id, blockchain, existing));
            }
            Ok(None) => {}
            Err(source) => {
                error!(tx_id = %tx_id, error = %source, "mirror duplicate check failed");
                return Err(DomainError::MirrorCheck { tx_id, source });
            }
        }

        let row = NewMirrorRow {
            event_type: command.event_type.clone(),
            latitude: command.latitude,
            longitude: command.longitude,
            blockchain_tx_id: tx_id.clone(),
        };
        match self.mirror.insert(row).await {
            Ok(InsertOutcome::Inserted(row)) => {
                info!(tx_id = %tx_id, row_id = row.id, "event mirrored");
                Ok(RecordOutcome {
                    status: RecordStatus::Recorded,
                    tx_id,
                    blockchain,
                    database: row,
                })
            }
            Ok(InsertOutcome::Conflict) => {
                let existing = self.reread_after_conflict(&tx_id).await?;
                info!(tx_id = %tx_id, row_id = existing.id, "concurrent request mirrored the event first");
                Ok(already_recorded(command, tx_id, blockchain, existing))
            }
            Err(source) => {
                error!(tx_id = %tx_id, error = %source, "mirror insert failed; ledger record stands");
                Err(DomainError::MirrorWrite { tx_id, source })
            }
        }
    }

    fn contract_args(&self, command: &RecordEvent) -> Result<Vec<String>, DomainError> {
        let metadata = match &command.metadata {
            Value::Null => "{}".to_owned(),
            other => serde_json::to_string(other)
                .map_err(|e| DomainError::Validation(format!("metadata is not encodable: {e}")))?,
        };
        let mut args = vec![
            command.event_id.clone(),
            command.event_type.clone(),
            self.clock.timestamp(),
            command.description.clone(),
            metadata,
        ];
        if let Some(location) = command.location.as_deref().filter(|l| !l.is_empty()) {
            args.push(location.to_owned());
        }
        Ok(args)
    }

    async fn reread_after_conflict(
        &self,
        tx_id: &str,
    ) -> Result<MirrorRow, DomainError> {
        match self.mirror.find_by_tx_id(tx_id).await {
            Ok(Some(row)) => Ok(row),
            Ok(None) => Err(DomainError::MirrorWrite {
                tx_id: tx_id.to_owned(),
                source: MirrorError::new("row missing after unique constraint conflict"),
            }),
            Err(source) => Err(DomainError::MirrorCheck {
                tx_id: tx_id.to_owned(),
                source,
            }),
        }
    }
}

/// Whether `row` carries the fields `command` would have mirrored.
fn mirrors_command(row: &MirrorRow, command: &RecordEvent) -> bool {
    row.event_type == command.event_type
        && row.latitude == command.latitude
        && row.longitude == command.longitude
}

fn already_recorded(
    command: &RecordEvent,
    tx_id: String,
    blockchain: Value,
    existing: MirrorRow,
) -> RecordOutcome {
    // A shared fallback id from two events in the same millisecond lands here.
    if !mirrors_command(&existing, command) {
        warn!(
            tx_id = %tx_id,
            row_id = existing.id,
            row_event_type = %existing.event_type,
            event_type = %command.event_type,
            "mirror row for this transaction id belongs to a different event; this event has no row of its own"
        );
    }
    RecordOutcome {
        status: RecordStatus::AlreadyRecorded,
        tx_id,
        blockchain,
        database: existing,
    }
}
