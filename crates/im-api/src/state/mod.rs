//! Application state
//!
//! Holds the shared state for the Axum application.

use std::sync::Arc;

use im_common::ImConfig;
use im_service::ServiceContext;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    ctx: ServiceContext,
    config: Arc<ImConfig>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(ctx: ServiceContext, config: Arc<ImConfig>) -> Self {
        Self { ctx, config }
    }

    /// Get the service context
    pub fn ctx(&self) -> &ServiceContext {
        &self.ctx
    }

    /// Get the application configuration
    pub fn config(&self) -> &ImConfig {
        &self.config
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
