//! # im-db
//!
//! Database layer implementing the `im-core` repository traits with
//! PostgreSQL via SQLx.
//!
//! The message write path lives in [`repositories::PgMessageRepository`]:
//! one transaction allocates the per-thread seq and inserts the row, which
//! is what keeps seq values gap-free under concurrency.

pub mod models;
pub mod pool;
pub mod repositories;

// Re-export commonly used types
pub use pool::{create_pool, create_pool_from_env, DatabaseConfig, PgPool};
pub use repositories::{PgDeviceTokenRepository, PgMessageRepository, PgThreadRepository};
