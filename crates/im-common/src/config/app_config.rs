//! Application configuration structs
//!
//! Loads configuration from environment variables. Every option has a
//! default; an absent credential only disables the feature it gates.

use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ImConfig {
    pub app: AppSettings,
    pub api: ServerConfig,
    pub gateway: GatewayConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub presence: PresenceConfig,
    pub rate_limit: RateLimitConfig,
    pub push: PushConfig,
    pub media: MediaConfig,
    pub retention: RetentionConfig,
    /// HMAC-SHA256 shared secret for bearer token verification
    pub jwt_secret: String,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Environment segment used in media object keys
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "dev",
            Self::Staging => "staging",
            Self::Production => "prod",
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Gateway configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Identifier written into presence records for this gateway instance
    pub gateway_id: String,
    /// Base URL of the API the gateway bridges to
    pub api_base_url: String,
    /// Capacity of each connection's outbound queue
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue: usize,
}

impl GatewayConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

/// Redis configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    #[serde(default = "default_redis_max_connections")]
    pub max_connections: u32,
}

/// Presence configuration
///
/// The TTL must exceed the refresh period by at least 2x so transient
/// scheduling lag does not evict a live user.
#[derive(Debug, Clone, Deserialize)]
pub struct PresenceConfig {
    #[serde(default = "default_presence_ttl")]
    pub ttl_seconds: u64,
    #[serde(default = "default_presence_refresh")]
    pub refresh_seconds: u64,
}

/// Sliding-window rate limit configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_rate_user_max")]
    pub user_max: u32,
    #[serde(default = "default_rate_user_window_ms")]
    pub user_window_ms: u64,
    #[serde(default = "default_rate_thread_max")]
    pub thread_max: u32,
    #[serde(default = "default_rate_thread_window_ms")]
    pub thread_window_ms: u64,
}

/// Push pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PushConfig {
    #[serde(default = "default_push_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_push_backoff_base_ms")]
    pub backoff_base_ms: u64,
    /// Inline FCM service account JSON; takes precedence over the path
    #[serde(default)]
    pub fcm_service_account_json: Option<String>,
    #[serde(default)]
    pub fcm_service_account_path: Option<String>,
}

impl PushConfig {
    /// Whether FCM credentials are present at all
    #[must_use]
    pub fn fcm_configured(&self) -> bool {
        self.fcm_service_account_json.is_some() || self.fcm_service_account_path.is_some()
    }
}

/// Media content configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MediaConfig {
    /// Public base URL image message URLs must live under; absent disables
    /// image messages entirely
    #[serde(default)]
    pub public_base_url: Option<String>,
}

/// Message retention windows in days
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    #[serde(default = "default_retention_match_days")]
    pub match_days: i32,
    #[serde(default = "default_retention_order_days")]
    pub order_days: i32,
}

// Default value functions
fn default_app_name() -> String {
    "im-server".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_api_port() -> u16 {
    8090
}

fn default_gateway_port() -> u16 {
    8081
}

fn default_outbound_queue() -> usize {
    64
}

fn default_max_connections() -> u32 {
    20
}

fn default_min_connections() -> u32 {
    5
}

fn default_redis_max_connections() -> u32 {
    16
}

fn default_presence_ttl() -> u64 {
    75
}

fn default_presence_refresh() -> u64 {
    30
}

fn default_rate_user_max() -> u32 {
    20
}

fn default_rate_user_window_ms() -> u64 {
    10_000
}

fn default_rate_thread_max() -> u32 {
    30
}

fn default_rate_thread_window_ms() -> u64 {
    10_000
}

fn default_push_max_retries() -> u32 {
    5
}

fn default_push_backoff_base_ms() -> u64 {
    1_000
}

fn default_retention_match_days() -> i32 {
    14
}

fn default_retention_order_days() -> i32 {
    180
}

impl ImConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a set variable cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            app: AppSettings {
                name: env::var("IM_APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: env::var("IM_ENV")
                    .ok()
                    .and_then(|s| match s.to_lowercase().as_str() {
                        "production" | "prod" => Some(Environment::Production),
                        "staging" => Some(Environment::Staging),
                        "development" | "dev" => Some(Environment::Development),
                        _ => None,
                    })
                    .unwrap_or_default(),
            },
            api: ServerConfig {
                host: env::var("IM_API_HOST").unwrap_or_else(|_| default_host()),
                port: parse_var("IM_API_PORT")?.unwrap_or_else(default_api_port),
            },
            gateway: GatewayConfig {
                host: env::var("IM_WS_HOST").unwrap_or_else(|_| default_host()),
                port: parse_var("IM_WS_PORT")?.unwrap_or_else(default_gateway_port),
                gateway_id: env::var("IM_GATEWAY_ID")
                    .unwrap_or_else(|_| format!("gw_{}", uuid::Uuid::new_v4().simple())),
                api_base_url: env::var("IM_API_BASE_URL")
                    .unwrap_or_else(|_| "http://localhost:8090".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                outbound_queue: parse_var("IM_WS_OUTBOUND_QUEUE")?
                    .unwrap_or_else(default_outbound_queue),
            },
            database: DatabaseConfig {
                url: env::var("IM_DB_DSN")
                    .unwrap_or_else(|_| "postgres://localhost:5432/im".to_string()),
                max_connections: parse_var("IM_DB_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_max_connections),
                min_connections: parse_var("IM_DB_MIN_CONNECTIONS")?
                    .unwrap_or_else(default_min_connections),
            },
            redis: RedisConfig {
                url: env::var("IM_REDIS_URL")
                    .unwrap_or_else(|_| "redis://127.0.0.1:6379/0".to_string()),
                max_connections: parse_var("IM_REDIS_MAX_CONNECTIONS")?
                    .unwrap_or_else(default_redis_max_connections),
            },
            presence: PresenceConfig {
                ttl_seconds: parse_var("IM_PRESENCE_TTL_SECONDS")?
                    .unwrap_or_else(default_presence_ttl),
                refresh_seconds: parse_var("IM_PRESENCE_REFRESH_SECONDS")?
                    .unwrap_or_else(default_presence_refresh),
            },
            rate_limit: RateLimitConfig {
                user_max: parse_var("IM_RATE_USER_MAX")?.unwrap_or_else(default_rate_user_max),
                user_window_ms: parse_var("IM_RATE_USER_WINDOW_MS")?
                    .unwrap_or_else(default_rate_user_window_ms),
                thread_max: parse_var("IM_RATE_THREAD_MAX")?
                    .unwrap_or_else(default_rate_thread_max),
                thread_window_ms: parse_var("IM_RATE_THREAD_WINDOW_MS")?
                    .unwrap_or_else(default_rate_thread_window_ms),
            },
            push: PushConfig {
                max_retries: parse_var("IM_PUSH_MAX_RETRIES")?
                    .unwrap_or_else(default_push_max_retries),
                backoff_base_ms: parse_var("IM_PUSH_BACKOFF_BASE_MS")?
                    .unwrap_or_else(default_push_backoff_base_ms),
                fcm_service_account_json: env::var("FCM_SERVICE_ACCOUNT_JSON").ok(),
                fcm_service_account_path: env::var("FCM_SERVICE_ACCOUNT_PATH").ok(),
            },
            media: MediaConfig {
                public_base_url: env::var("IM_MEDIA_PUBLIC_BASE_URL")
                    .ok()
                    .map(|url| url.trim_end_matches('/').to_string()),
            },
            retention: RetentionConfig {
                match_days: parse_var("IM_RETENTION_MATCH_DAYS")?
                    .unwrap_or_else(default_retention_match_days),
                order_days: parse_var("IM_RETENTION_ORDER_DAYS")?
                    .unwrap_or_else(default_retention_order_days),
            },
            jwt_secret: env::var("AUTH_JWT_SECRET").unwrap_or_default(),
        })
    }
}

/// Parse an optional environment variable, failing only on bad values
fn parse_var<T: std::str::FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(key, raw)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_is_production() {
        assert!(!Environment::Development.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(Environment::Production.is_production());
    }

    #[test]
    fn test_environment_segment() {
        assert_eq!(Environment::Development.as_str(), "dev");
        assert_eq!(Environment::Production.as_str(), "prod");
    }

    #[test]
    fn test_server_address() {
        let config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 8090,
        };
        assert_eq!(config.address(), "0.0.0.0:8090");
    }

    #[test]
    fn test_default_values() {
        assert_eq!(default_presence_ttl(), 75);
        assert_eq!(default_presence_refresh(), 30);
        assert_eq!(default_rate_user_max(), 20);
        assert_eq!(default_rate_thread_max(), 30);
        assert_eq!(default_push_max_retries(), 5);
        assert_eq!(default_push_backoff_base_ms(), 1_000);
        // TTL >= 2x refresh keeps live users from being evicted
        assert!(default_presence_ttl() >= default_presence_refresh() * 2);
    }

    #[test]
    fn test_fcm_configured() {
        let push = PushConfig {
            max_retries: 5,
            backoff_base_ms: 1_000,
            fcm_service_account_json: None,
            fcm_service_account_path: None,
        };
        assert!(!push.fcm_configured());
    }
}
