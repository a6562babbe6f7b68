//! PostgreSQL implementation of DeviceTokenRepository
//!
//! Token registration is owned by the device-facing API; the core only
//! reads targets for push delivery.

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use im_core::traits::{DeviceTokenRepository, RepoResult};

use super::map_db_error;

/// PostgreSQL implementation of DeviceTokenRepository
#[derive(Clone)]
pub struct PgDeviceTokenRepository {
    pool: PgPool,
}

impl PgDeviceTokenRepository {
    /// Create a new PgDeviceTokenRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeviceTokenRepository for PgDeviceTokenRepository {
    #[instrument(skip(self))]
    async fn android_tokens(&self, user_id: &str) -> RepoResult<Vec<String>> {
        let tokens: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT token
            FROM device_tokens
            WHERE user_id = $1 AND platform = 'android'
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgDeviceTokenRepository>();
    }
}
