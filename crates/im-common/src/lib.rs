//! # im-common
//!
//! Shared utilities including configuration, error handling, token
//! verification, and telemetry.

pub mod auth;
pub mod config;
pub mod error;
pub mod telemetry;
pub mod trace;

// Re-export commonly used types at crate root
pub use auth::{extract_bearer, Claims, JwtService};
pub use config::{
    AppSettings, ConfigError, DatabaseConfig, Environment, GatewayConfig, ImConfig, MediaConfig,
    PresenceConfig, PushConfig, RateLimitConfig, RedisConfig, RetentionConfig, ServerConfig,
};
pub use error::{AppError, AppResult};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    TracingConfig, TracingError,
};
pub use trace::new_trace_id;
