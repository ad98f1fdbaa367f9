//! Server state management.

use std::sync::Arc;

use recall_core::RecallRuntime;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<RecallRuntime>,
}

impl AppState {
    /// Create a new application state around an opened runtime.
    pub fn new(runtime: RecallRuntime) -> Self {
        Self {
            runtime: Arc::new(runtime),
        }
    }
}
