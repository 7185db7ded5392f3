//! Commands and results of the event tracker.

pub mod commands;
pub mod outcomes;
