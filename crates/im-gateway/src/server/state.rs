//! Gateway state
//!
//! Shared dependencies for the gateway server.

use std::sync::Arc;

use im_cache::{PresenceStore, RateLimiter};
use im_common::{ImConfig, JwtService};

use crate::client::ApiClient;
use crate::connection::Registry;

/// Gateway application state
#[derive(Clone)]
pub struct GatewayState {
    registry: Arc<Registry>,
    api: ApiClient,
    presence: PresenceStore,
    rate_limiter: RateLimiter,
    jwt_service: Arc<JwtService>,
    config: Arc<ImConfig>,
}

impl GatewayState {
    /// Create a new gateway state
    pub fn new(
        registry: Arc<Registry>,
        api: ApiClient,
        presence: PresenceStore,
        rate_limiter: RateLimiter,
        jwt_service: Arc<JwtService>,
        config: Arc<ImConfig>,
    ) -> Self {
        Self {
            registry,
            api,
            presence,
            rate_limiter,
            jwt_service,
            config,
        }
    }

    /// Get the connection registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Get the API client
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Get the presence store
    pub fn presence(&self) -> &PresenceStore {
        &self.presence
    }

    /// Get the rate limiter
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Get the JWT service
    pub fn jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Get the application configuration
    pub fn config(&self) -> &ImConfig {
        &self.config
    }

    /// This gateway's identifier, written into presence records
    pub fn gateway_id(&self) -> &str {
        &self.config.gateway.gateway_id
    }
}

impl std::fmt::Debug for GatewayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayState")
            .field("gateway_id", &self.gateway_id())
            .finish_non_exhaustive()
    }
}
