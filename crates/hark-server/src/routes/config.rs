//! Configuration checks for operators.

use axum::Json;
use hark_core::{HarkConfig, HarkError, Pipeline, StateStore, StepName};
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiResult;

#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    /// Steps the config would run, in execution order.
    pub steps: Vec<StepName>,
}

/// Check a JSON config document without applying it.
///
/// The body is parsed and a throwaway pipeline is built from it, so every
/// error a restart would hit is reported here.
pub async fn validate_config(body: String) -> ApiResult<Json<ValidateResponse>> {
    let config: HarkConfig = serde_json::from_str(&body).map_err(HarkError::from)?;
    let store = Arc::new(StateStore::new(config.state.clone()));
    let pipeline = Pipeline::new(config, store)?;

    Ok(Json(ValidateResponse {
        valid: true,
        steps: pipeline.step_names(),
    }))
}
