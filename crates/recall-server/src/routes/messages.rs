//! Inbound learner messages.

use axum::{extract::State, Json};
use recall_core::{InboundEvent, TurnReply};
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Run one conversation turn.
/// POST /messages
///
/// The body is an [`InboundEvent`]; `timestamp` defaults to the time the
/// request was received.
pub async fn post_message(
    State(state): State<AppState>,
    Json(event): Json<InboundEvent>,
) -> ApiResult<Json<TurnReply>> {
    if event.conversation_id.trim().is_empty() {
        return Err(ApiError::validation("conversation_id must not be empty"));
    }
    if event.user_id.trim().is_empty() {
        return Err(ApiError::validation("user_id must not be empty"));
    }

    debug!(
        conversation_id = %event.conversation_id,
        user_id = %event.user_id,
        "Handling message"
    );
    let reply = state.runtime.turns.handle(&event).await?;
    Ok(Json(reply))
}
