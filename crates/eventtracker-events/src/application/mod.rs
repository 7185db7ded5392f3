//! Application services.

pub mod coordinator;
pub mod ledger_access;
pub mod query_handlers;
