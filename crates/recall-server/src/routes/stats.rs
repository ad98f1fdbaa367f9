//! Learner progress endpoint.

use axum::{
    extract::{Path, State},
    Json,
};
use recall_core::{ProgressStore, RecallError, UserStats};

use crate::error::ApiResult;
use crate::state::AppState;

/// Per-topic progress of a learner.
/// GET /users/:user_id/stats
pub async fn get_user_stats(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<UserStats>> {
    let progress = &state.runtime.progress;
    if progress.get_user(&user_id)?.is_none() {
        return Err(RecallError::user_not_found(&user_id).into());
    }
    Ok(Json(progress.user_stats(&user_id)?))
}
