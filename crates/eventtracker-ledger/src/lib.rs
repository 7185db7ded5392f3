//! Event Tracker: ledger clients.
//!
//! [`gateway::RestGateway`] talks to a ledger gateway over HTTP using an
//! identity from the file-backed [`wallet`]. [`in_process::InProcessLedger`]
//! hosts the event tracker contract over an in-memory world state, for local
//! development and tests.

pub mod config;
pub mod connection_profile;
pub mod gateway;
pub mod in_process;
pub mod wallet;

pub use config::LedgerConfig;
pub use gateway::RestGateway;
pub use in_process::InProcessLedger;
