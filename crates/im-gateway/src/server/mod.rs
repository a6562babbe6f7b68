//! Gateway server setup

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use im_cache::{PresenceStore, RateLimiter, RedisPool};
use im_common::{AppError, ImConfig, JwtService};
use tokio::net::TcpListener;
use tracing::info;

use crate::client::ApiClient;
use crate::connection::Registry;

/// Initialize all dependencies and create the gateway state
pub fn create_gateway_state(config: ImConfig) -> Result<GatewayState, AppError> {
    let config = Arc::new(config);

    let redis_pool =
        RedisPool::from_config(&config.redis).map_err(|e| AppError::Cache(e.to_string()))?;

    Ok(GatewayState::new(
        Registry::new_shared(),
        ApiClient::new(&config.gateway.api_base_url),
        PresenceStore::new(redis_pool.clone(), config.presence.ttl_seconds),
        RateLimiter::new(redis_pool),
        Arc::new(JwtService::new(&config.jwt_secret)),
        config,
    ))
}

/// Build the gateway router
pub fn create_app(state: GatewayState) -> Router {
    Router::new()
        .route("/ws", get(gateway_handler))
        .with_state(state)
}

/// Run the gateway server with configuration
pub async fn run(config: ImConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    let state = create_gateway_state(config)?;
    let app = create_app(state);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("Gateway listening on ws://{addr}/ws");

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}
