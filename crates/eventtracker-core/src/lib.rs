//! Event Tracker Core: shared abstractions.
//!
//! This crate defines the ledger and mirror client traits, the records they
//! exchange, and the domain error type. It contains no infrastructure code.

pub mod clock;
pub mod error;
pub mod ledger;
pub mod mirror;
pub mod record;
