//! Proactive reminder collection.

use axum::{extract::State, Json};
use chrono::Utc;
use recall_core::Reminder;
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct RemindersResponse {
    pub reminders: Vec<Reminder>,
}

/// Build a reminder for every known conversation with cards due now.
/// POST /reminders
///
/// Delivery is up to the caller.
pub async fn collect_reminders(
    State(state): State<AppState>,
) -> ApiResult<Json<RemindersResponse>> {
    let reminders = state.runtime.reminders.collect(Utc::now())?;
    Ok(Json(RemindersResponse { reminders }))
}
