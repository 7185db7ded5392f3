//! Contract error types.

use thiserror::Error;

/// Errors raised while executing a contract transaction.
#[derive(Debug, Error)]
pub enum ContractError {
    /// The requested key is absent or holds an empty value.
    #[error("Event {0} does not exist")]
    NotFound(String),

    /// A transaction argument was missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No transaction with this name exists on the contract.
    #[error("unknown transaction function: {0}")]
    UnknownFunction(String),

    /// A world-state operation failed.
    #[error("world state error: {0}")]
    State(String),

    /// A stored value could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
