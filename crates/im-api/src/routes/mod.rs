//! Route definitions

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers::{health, messages, threads};
use crate::state::AppState;

/// Create the main API router with all routes
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/v1", v1_routes())
}

/// `/v1` routes
fn v1_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(messages::create_message))
        .route("/threads/ensure", post(threads::ensure))
        .route("/threads/:id/permission", get(threads::permission))
        .route("/threads/:id/read", post(threads::mark_read))
        .route("/threads/:id/messages", get(threads::history))
}
