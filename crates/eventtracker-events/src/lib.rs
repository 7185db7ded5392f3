//! Event tracker: records events on the ledger and mirrors them into the
//! relational database.
//!
//! The write path is the [`application::coordinator::DualWriteCoordinator`];
//! reads go through [`application::query_handlers`].

pub mod application;
pub mod domain;
