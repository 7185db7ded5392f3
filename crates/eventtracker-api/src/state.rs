//! Shared application state.

use eventtracker_events::application::coordinator::DualWriteCoordinator;

/// Application state shared across all request handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Write path; also hands out the ledger, mirror and clock to readers.
    pub coordinator: DualWriteCoordinator,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(coordinator: DualWriteCoordinator) -> Self {
        Self { coordinator }
    }
}
