//! User presence markers in Redis.
//!
//! A key's existence means "this user is currently connected to some
//! gateway"; the value names the gateway holding the connection. The gateway
//! refreshes the key on a fixed interval while the socket is open and
//! deletes it on disconnect, so a crashed gateway just lets the TTL expire.

use redis::AsyncCommands;

use crate::pool::{RedisPool, RedisResult};

/// Key prefix for presence markers
const PRESENCE_PREFIX: &str = "im:online:";

/// Presence store backed by TTL string keys
#[derive(Debug, Clone)]
pub struct PresenceStore {
    pool: RedisPool,
    ttl_seconds: u64,
}

impl PresenceStore {
    /// Create a new presence store
    #[must_use]
    pub fn new(pool: RedisPool, ttl_seconds: u64) -> Self {
        Self { pool, ttl_seconds }
    }

    /// Generate the Redis key for a user's presence marker
    fn presence_key(user_id: &str) -> String {
        format!("{PRESENCE_PREFIX}{user_id}")
    }

    /// Mark the user online on the given gateway, resetting the TTL
    pub async fn refresh(&self, user_id: &str, gateway_id: &str) -> RedisResult<()> {
        let key = Self::presence_key(user_id);
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(&key, gateway_id, self.ttl_seconds)
            .await?;
        Ok(())
    }

    /// Remove the user's presence marker
    pub async fn clear(&self, user_id: &str) -> RedisResult<bool> {
        let key = Self::presence_key(user_id);
        let mut conn = self.pool.get().await?;
        let deleted: i32 = conn.del(&key).await?;
        Ok(deleted > 0)
    }

    /// Check whether the user is currently connected to any gateway
    pub async fn is_online(&self, user_id: &str) -> RedisResult<bool> {
        let key = Self::presence_key(user_id);
        let mut conn = self.pool.get().await?;
        let exists: bool = conn.exists(&key).await?;
        Ok(exists)
    }

    /// The gateway currently holding the user's connection, if any
    pub async fn gateway_for(&self, user_id: &str) -> RedisResult<Option<String>> {
        let key = Self::presence_key(user_id);
        let mut conn = self.pool.get().await?;
        let value: Option<String> = conn.get(&key).await?;
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence_key() {
        assert_eq!(PresenceStore::presence_key("u_42"), "im:online:u_42");
    }
}
