//! Health check endpoint.

use axum::{extract::State, Json};
use hark_core::StepName;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub steps: Vec<StepName>,
    pub version: String,
}

/// Health check handler.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        steps: state.pipeline().step_names(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
