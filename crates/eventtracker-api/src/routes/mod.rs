//! Route modules.

pub mod diagnostics;
pub mod events;
pub mod health;
