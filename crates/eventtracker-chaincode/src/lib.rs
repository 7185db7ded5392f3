//! Event Tracker: ledger-resident contract.
//!
//! The contract is written against the [`stub::ChaincodeStub`] world-state
//! interface. [`memory_state::MemoryWorldState`] provides an in-memory world
//! state for tests and for the in-process development ledger.

pub mod contract;
pub mod error;
pub mod memory_state;
pub mod selector;
pub mod stub;

pub use contract::EventTracker;
pub use error::ContractError;
