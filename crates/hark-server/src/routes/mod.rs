//! API routes.

mod config;
mod events;
mod groups;
mod health;
mod replies;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Create the main router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/events", post(events::handle_event))
        .route("/replies", post(replies::record_reply))
        .route("/groups/:group_id", get(groups::get_group))
        .route("/config/validate", post(config::validate_config))
        .with_state(state)
}
