//! Shared test doubles for the event tracker.

mod clock;
mod ledger;
mod mirror;

pub use clock::FixedClock;
pub use ledger::{ScriptedLedger, Submission};
pub use mirror::{FailingMirror, FailurePoint, MemoryMirror};
