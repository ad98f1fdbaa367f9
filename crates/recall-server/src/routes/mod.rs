//! Route definitions for the REST API.

mod health;
mod messages;
mod reminders;
mod stats;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Learner turns
        .route("/messages", post(messages::post_message))
        // Progress
        .route("/users/:user_id/stats", get(stats::get_user_stats))
        // Proactive reminders
        .route("/reminders", post(reminders::collect_reminders))
        // Attach state
        .with_state(state)
}

pub use health::*;
pub use messages::*;
pub use reminders::*;
pub use stats::*;
