//! Inbound message events.

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use hark_core::{EventSignals, HostEvent, Segment, StepTrace, WakeContext};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A message delivered by the chat host.
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    /// Empty for direct messages.
    #[serde(default)]
    pub group_id: String,
    pub sender_id: String,
    pub self_id: String,
    pub segments: Vec<Segment>,
    pub is_admin: Option<bool>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub woken: bool,
    pub stopped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub trace: Vec<StepTrace>,
}

/// Run the wake pipeline for one message.
pub async fn handle_event(
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> ApiResult<Json<EventResponse>> {
    if request.sender_id.trim().is_empty() {
        return Err(ApiError::validation("sender_id must not be empty"));
    }
    if request.self_id.trim().is_empty() {
        return Err(ApiError::validation("self_id must not be empty"));
    }

    let is_admin = request
        .is_admin
        .unwrap_or_else(|| state.is_admin(&request.sender_id));
    let signals = Arc::new(EventSignals::new());

    let mut ctx = WakeContext::builder(Arc::clone(&signals))
        .chain(request.segments)
        .group_id(request.group_id)
        .user_id(request.sender_id)
        .bot_id(request.self_id)
        .is_admin(is_admin)
        .now(request.timestamp.unwrap_or_else(Utc::now))
        .command_matcher(state.pipeline().command_matcher())
        .state(state.store())
        .build();

    state.pipeline().run(&mut ctx).await;

    Ok(Json(EventResponse {
        woken: signals.is_woken(),
        stopped: signals.is_stopped(),
        command: ctx.cmd.take(),
        trace: std::mem::take(&mut ctx.trace),
    }))
}
