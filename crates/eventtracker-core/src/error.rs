//! Domain error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// A failure reported by the mirror database.
///
/// `code` carries the database's own error code (for `PostgreSQL`, the
/// SQLSTATE such as `23505`) verbatim when one is available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MirrorError {
    /// Human-readable error message.
    pub message: String,
    /// Raw database error code, if the driver reported one.
    pub code: Option<String>,
}

impl MirrorError {
    /// Creates a mirror error without a database code.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    /// Creates a mirror error carrying a database code.
    #[must_use]
    pub fn with_code(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for MirrorError {}

/// Top-level domain error type.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Missing or invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The ledger gateway or the mirror database could not be reached, or the
    /// ledger identity could not be loaded.
    #[error("connection error: {0}")]
    Connection(String),

    /// A ledger call did not complete within the configured bound.
    #[error("ledger call `{operation}` timed out after {}s", elapsed.as_secs())]
    Timeout {
        /// The ledger operation that timed out.
        operation: String,
        /// The configured bound.
        elapsed: Duration,
    },

    /// The ledger rejected or failed a transaction.
    #[error("ledger error: {0}")]
    Ledger(String),

    /// A ledger key was absent.
    #[error("{0}")]
    NotFound(String),

    /// A validation error in request data.
    #[error("validation error: {0}")]
    Validation(String),

    /// The mirror existence check failed after the ledger write committed.
    #[error("mirror check failed for transaction {tx_id}: {source}")]
    MirrorCheck {
        /// The ledger transaction that is now unmirrored.
        tx_id: String,
        /// The underlying database failure.
        source: MirrorError,
    },

    /// The mirror insert failed after the ledger write committed.
    #[error("mirror write failed for transaction {tx_id}: {source}")]
    MirrorWrite {
        /// The ledger transaction that is now unmirrored.
        tx_id: String,
        /// The underlying database failure.
        source: MirrorError,
    },

    /// A read-path mirror failure.
    #[error("mirror error: {0}")]
    Mirror(#[from] MirrorError),
}
