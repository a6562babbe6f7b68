//! Configuration structs

mod app_config;

pub use app_config::{
    AppSettings, ConfigError, DatabaseConfig, Environment, GatewayConfig, ImConfig, MediaConfig,
    PresenceConfig, PushConfig, RateLimitConfig, RedisConfig, RetentionConfig, ServerConfig,
};
