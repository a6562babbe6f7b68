//! # im-cache
//!
//! Redis layer for presence, rate limiting, and the push job stream.
//!
//! ## Features
//!
//! - **Connection Pool**: Managed Redis connection pool with deadpool
//! - **Presence**: TTL-backed online markers refreshed by the gateway
//! - **Rate Limiting**: atomic sliding-window limiter (server-side script)
//! - **Push Stream**: consumer-group stream, DLQ, and send deduplication

pub mod pool;
pub mod presence;
pub mod rate;
pub mod stream;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolConfig, RedisPoolError, RedisResult};

// Re-export presence types
pub use presence::PresenceStore;

// Re-export rate limiter types
pub use rate::{RateDecision, RateLimiter};

// Re-export stream types
pub use stream::{DedupStore, PushJob, PushStream, StreamEntry, PUSH_GROUP};
