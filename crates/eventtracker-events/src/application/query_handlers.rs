//! Query handlers for the event tracker.
//!
//! Ledger and mirror are read independently; results are returned side by
//! side and never reconciled.

use eventtracker_chaincode::contract::functions;
use eventtracker_core::clock::Clock;
use eventtracker_core::error::DomainError;
use eventtracker_core::ledger::decode_payload;
use eventtracker_core::mirror::{InsertOutcome, MirrorRepository, NewMirrorRow};
use serde_json::Value;
use tracing::instrument;

use crate::application::ledger_access::LedgerAccess;
use crate::domain::outcomes::{Coordinate, EventsByType, MirrorStatus, SelfTestOutcome};

/// Rows read by the mirror status check.
pub const MIRROR_STATUS_SAMPLE: i64 = 5;

/// Event type of rows written by the mirror self-test.
pub const SELF_TEST_EVENT_TYPE: &str = "test";

/// Ledger records and mirror rows with the given type.
///
/// # Errors
///
/// Returns the ledger error if the query fails, or `DomainError::Mirror` if
/// the mirror select fails.
#[instrument(skip(ledger, mirror))]
pub async fn query_by_type(
    event_type: &str,
    ledger: &LedgerAccess,
    mirror: &dyn MirrorRepository,
) -> Result<EventsByType, DomainError> {
    let blockchain = {
        let session = ledger.open().await?;
        let bytes = ledger
            .evaluate(&session, functions::QUERY_EVENTS_BY_TYPE, &[event_type.to_owned()])
            .await?;
        decode_payload(&bytes)?
    };
    let database = mirror.select_by_type(event_type).await?;
    Ok(EventsByType {
        blockchain,
        database,
    })
}

/// The ledger record stored under `event_id`.
///
/// # Errors
///
/// Returns `DomainError::NotFound` if the key is absent, or another ledger
/// error.
#[instrument(skip(ledger))]
pub async fn get_event(event_id: &str, ledger: &LedgerAccess) -> Result<Value, DomainError> {
    let session = ledger.open().await?;
    let bytes = ledger
        .evaluate(&session, functions::GET_EVENT, &[event_id.to_owned()])
        .await?;
    decode_payload(&bytes)
}

/// Type and coordinates of every mirror row.
///
/// # Errors
///
/// Returns `DomainError::Mirror` if the select fails.
pub async fn coordinates(mirror: &dyn MirrorRepository) -> Result<Vec<Coordinate>, DomainError> {
    let rows = mirror.select_all().await?;
    Ok(rows.into_iter().map(Coordinate::from).collect())
}

/// Reads a handful of mirror rows to prove the database is reachable.
///
/// # Errors
///
/// Returns `DomainError::Mirror` if the read fails.
pub async fn mirror_status(mirror: &dyn MirrorRepository) -> Result<MirrorStatus, DomainError> {
    let data = mirror.sample(MIRROR_STATUS_SAMPLE).await?;
    Ok(MirrorStatus {
        status: "success",
        message: "Mirror database connection successful",
        record_count: data.len(),
        data,
    })
}

/// Writes a `test` row keyed `test_tx_<millis>` after an existence check.
///
/// # Errors
///
/// Returns `DomainError::MirrorCheck` or `DomainError::MirrorWrite`.
pub async fn mirror_self_test(
    mirror: &dyn MirrorRepository,
    clock: &dyn Clock,
) -> Result<SelfTestOutcome, DomainError> {
    let tx_id = format!("test_tx_{}", clock.unix_millis());

    let existing = mirror
        .find_by_tx_id(&tx_id)
        .await
        .map_err(|source| DomainError::MirrorCheck {
            tx_id: tx_id.clone(),
            source,
        })?;
    if existing.is_some() {
        return Ok(SelfTestOutcome::Duplicate);
    }

    let row = NewMirrorRow {
        event_type: SELF_TEST_EVENT_TYPE.to_owned(),
        latitude: Some(10.0),
        longitude: Some(20.0),
        blockchain_tx_id: tx_id.clone(),
    };
    match mirror.insert(row).await {
        Ok(InsertOutcome::Inserted(row)) => Ok(SelfTestOutcome::Inserted(row)),
        Ok(InsertOutcome::Conflict) => Ok(SelfTestOutcome::Duplicate),
        Err(source) => Err(DomainError::MirrorWrite { tx_id, source }),
    }
}
