//! Outbound reply bookkeeping.

use axum::{extract::State, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use hark_core::{GroupSnapshot, HarkError};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A reply the agent sent after being woken.
#[derive(Debug, Deserialize)]
pub struct ReplyRequest {
    pub group_id: String,
    /// The member the reply answered, if any.
    pub user_id: Option<String>,
    pub text: String,
    pub timestamp: Option<DateTime<Utc>>,
}

/// Record a bot reply so repeat detection and the wake extension can see it.
pub async fn record_reply(
    State(state): State<AppState>,
    Json(request): Json<ReplyRequest>,
) -> ApiResult<(StatusCode, Json<GroupSnapshot>)> {
    if request.group_id.trim().is_empty() {
        return Err(ApiError::validation("group_id must not be empty"));
    }
    if request.text.trim().is_empty() {
        return Err(ApiError::validation("text must not be empty"));
    }

    let now = request.timestamp.unwrap_or_else(Utc::now);
    state
        .store()
        .record_bot_reply(
            &request.group_id,
            request.user_id.as_deref(),
            &request.text,
            now,
        )
        .await;

    let snapshot = state
        .store()
        .snapshot(&request.group_id)
        .ok_or_else(|| HarkError::Internal("group state missing after reply".to_string()))?;

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}
