//! Conversation state inspection.

use axum::{
    extract::{Path, State},
    Json,
};
use hark_core::GroupSnapshot;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Get a read-only view of one conversation.
pub async fn get_group(
    State(state): State<AppState>,
    Path(group_id): Path<String>,
) -> ApiResult<Json<GroupSnapshot>> {
    state
        .store()
        .snapshot(&group_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("Group {group_id} not found")))
}
