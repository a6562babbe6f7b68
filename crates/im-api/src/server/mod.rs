//! Server setup and initialization
//!
//! Wires the database pool, Redis stores, and services into the Axum
//! application.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use im_cache::{PresenceStore, PushStream, RateLimiter, RedisPool};
use im_common::{AppError, ImConfig, JwtService};
use im_db::{create_pool, PgMessageRepository, PgThreadRepository};
use im_service::ServiceContext;
use tokio::net::TcpListener;
use tracing::info;

use crate::middleware::apply_middleware;
use crate::routes::create_router;
use crate::state::AppState;

/// Build the complete Axum application with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    let router = create_router();
    let router = apply_middleware(router);
    router.with_state(state)
}

/// Initialize all dependencies and create AppState
pub async fn create_app_state(config: ImConfig) -> Result<AppState, AppError> {
    let config = Arc::new(config);

    info!("Connecting to PostgreSQL...");
    let db_config = im_db::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        min_connections: config.database.min_connections,
        ..Default::default()
    };
    let pool = create_pool(&db_config)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;
    info!("PostgreSQL connection established");

    info!("Connecting to Redis...");
    let redis_pool =
        RedisPool::from_config(&config.redis).map_err(|e| AppError::Cache(e.to_string()))?;
    info!("Redis connection established");

    let jwt_service = Arc::new(JwtService::new(&config.jwt_secret));

    let ctx = ServiceContext::builder()
        .threads(Arc::new(PgThreadRepository::new(pool.clone())))
        .messages(Arc::new(PgMessageRepository::new(pool)))
        .presence(PresenceStore::new(
            redis_pool.clone(),
            config.presence.ttl_seconds,
        ))
        .rate_limiter(RateLimiter::new(redis_pool.clone()))
        .push_stream(PushStream::new(redis_pool))
        .jwt_service(jwt_service)
        .config(config.clone())
        .build()
        .map_err(AppError::Config)?;

    Ok(AppState::new(ctx, config))
}

/// Run the HTTP server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Config(format!("Failed to bind to {addr}: {e}")))?;

    info!("API listening on http://{addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Config(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete server with configuration
pub async fn run(config: ImConfig) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .api
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid API address: {e}")))?;

    let state = create_app_state(config).await?;
    let app = create_app(state);
    run_server(app, addr).await
}
