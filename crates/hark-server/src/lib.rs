//! hark-server - HTTP host adapter for hark.
//!
//! Chat hosts post inbound messages to `/events` and get back whether the
//! agent should answer, plus the per-step trace.

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::{middleware as axum_middleware, Router};
use tower::limit::ConcurrencyLimitLayer;
use tower_http::trace::TraceLayer;

pub use state::AppState;

/// In-flight request cap; excess requests wait for a slot.
pub const MAX_CONCURRENT_REQUESTS: usize = 1024;

/// Create the server with all routes and middleware.
pub fn create_server(state: AppState) -> Router {
    routes::create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::cors_layer())
        .layer(axum_middleware::from_fn(middleware::logging_middleware))
        .layer(ConcurrencyLimitLayer::new(MAX_CONCURRENT_REQUESTS))
}
