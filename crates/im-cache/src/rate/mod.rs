//! Sliding-window rate limiter.
//!
//! Each bucket is a sorted set of arrival timestamps in milliseconds. The
//! trim/count/add sequence runs as a single server-side script so that the
//! check stays atomic across gateway replicas; an in-process window would
//! undercount as soon as a second gateway shares the bucket.

use redis::Script;

use crate::pool::{RedisPool, RedisResult};

/// Key prefix for per-user buckets
const RATE_USER_PREFIX: &str = "im:rate:user:";
/// Key prefix for per-thread buckets
const RATE_THREAD_PREFIX: &str = "im:rate:thread:";

/// Trim expired entries, deny with a retry hint when full, otherwise admit.
/// The key expires shortly after the window so idle buckets clean themselves
/// up.
const RATE_SCRIPT: &str = r"
local key = KEYS[1]
local window_ms = tonumber(ARGV[1])
local max_hits = tonumber(ARGV[2])
local now = redis.call('TIME')
local now_ms = (now[1] * 1000) + math.floor(now[2] / 1000)
local window_start = now_ms - window_ms
redis.call('ZREMRANGEBYSCORE', key, 0, window_start)
local count = redis.call('ZCARD', key)
if count >= max_hits then
  local earliest = redis.call('ZRANGE', key, 0, 0, 'WITHSCORES')
  local oldest = tonumber(earliest[2]) or now_ms
  local retry_after_ms = oldest + window_ms - now_ms
  if retry_after_ms < 0 then retry_after_ms = 0 end
  return {0, retry_after_ms}
end
redis.call('ZADD', key, now_ms, tostring(now_ms))
redis.call('PEXPIRE', key, window_ms + 1000)
return {1, 0}
";

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    /// How long the caller should wait before retrying, when denied
    pub retry_after_ms: u64,
}

/// Redis-backed sliding-window rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    pool: RedisPool,
    script: Script,
}

impl RateLimiter {
    /// Create a new rate limiter
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self {
            pool,
            script: Script::new(RATE_SCRIPT),
        }
    }

    /// Bucket key for a sender
    #[must_use]
    pub fn user_key(user_id: &str) -> String {
        format!("{RATE_USER_PREFIX}{user_id}")
    }

    /// Bucket key for a thread
    #[must_use]
    pub fn thread_key(thread_id: &str) -> String {
        format!("{RATE_THREAD_PREFIX}{thread_id}")
    }

    /// Check and consume one admission slot on the bucket
    pub async fn check(
        &self,
        key: &str,
        window_ms: u64,
        max_hits: u32,
    ) -> RedisResult<RateDecision> {
        let mut conn = self.pool.get().await?;
        let (allowed, retry_after_ms): (i64, i64) = self
            .script
            .key(key)
            .arg(window_ms)
            .arg(max_hits)
            .invoke_async(&mut conn)
            .await?;
        Ok(RateDecision {
            allowed: allowed == 1,
            retry_after_ms: retry_after_ms.max(0) as u64,
        })
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_keys() {
        assert_eq!(RateLimiter::user_key("u_1"), "im:rate:user:u_1");
        assert_eq!(RateLimiter::thread_key("t_1"), "im:rate:thread:t_1");
    }
}
