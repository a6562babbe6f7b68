//! Push job stream in Redis.
//!
//! Jobs are string-map records on a stream consumed through a consumer
//! group. The stream has no native scheduling, so deferred retries are
//! expressed by acking a record and re-appending it with a future
//! `available_at_ms`; consumers skip records whose time has not come the
//! same way. Exhausted jobs move to a dead-letter stream.

use std::collections::{BTreeMap, HashMap};

use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;

use crate::pool::{RedisPool, RedisPoolError, RedisResult};

/// Main push stream key
pub const PUSH_STREAM_KEY: &str = "im:push:stream";
/// Dead-letter stream key
pub const PUSH_DLQ_KEY: &str = "im:push:dlq";
/// Consumer group shared by all worker processes
pub const PUSH_GROUP: &str = "im-push-workers";
/// Key prefix for per-recipient send dedup markers
const PUSH_SENT_PREFIX: &str = "im:push:sent:";
/// Dedup marker lifetime (7 days)
const PUSH_SENT_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// One push notification job
///
/// Created on message commit for each non-sender member who is offline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushJob {
    pub to_user_id: String,
    pub thread_id: String,
    pub msg_id: String,
    pub seq: i64,
    pub msg_type: String,
    pub preview: String,
    /// RFC 3339 timestamp of the message this job notifies about
    pub created_at: String,
    pub attempt: u32,
    /// Earliest wall-clock instant (ms) the job may be attempted; 0 = now
    pub available_at_ms: u64,
}

impl PushJob {
    /// Whether the job is still waiting for its retry window
    #[must_use]
    pub fn is_deferred(&self, now_ms: u64) -> bool {
        self.available_at_ms > 0 && now_ms < self.available_at_ms
    }

    /// Serialize to the stream's string-map representation
    #[must_use]
    pub fn fields(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("to_user_id".to_string(), self.to_user_id.clone()),
            ("thread_id".to_string(), self.thread_id.clone()),
            ("msg_id".to_string(), self.msg_id.clone()),
            ("seq".to_string(), self.seq.to_string()),
            ("msg_type".to_string(), self.msg_type.clone()),
            ("preview".to_string(), self.preview.clone()),
            ("created_at".to_string(), self.created_at.clone()),
            ("attempt".to_string(), self.attempt.to_string()),
            (
                "available_at_ms".to_string(),
                self.available_at_ms.to_string(),
            ),
        ])
    }

    /// Parse a stream record's value map, defaulting absent numeric fields
    #[must_use]
    pub fn from_fields(map: &HashMap<String, redis::Value>) -> Self {
        let get = |key: &str| -> String {
            map.get(key)
                .and_then(|v| redis::from_redis_value::<String>(v).ok())
                .unwrap_or_default()
        };
        Self {
            to_user_id: get("to_user_id"),
            thread_id: get("thread_id"),
            msg_id: get("msg_id"),
            seq: get("seq").parse().unwrap_or(0),
            msg_type: get("msg_type"),
            preview: get("preview"),
            created_at: get("created_at"),
            attempt: get("attempt").parse().unwrap_or(0),
            available_at_ms: get("available_at_ms").parse().unwrap_or(0),
        }
    }
}

/// A record read from the stream, with its stream id for acking
#[derive(Debug, Clone)]
pub struct StreamEntry {
    pub id: String,
    pub job: PushJob,
}

/// Push job stream operations
#[derive(Debug, Clone)]
pub struct PushStream {
    pool: RedisPool,
}

impl PushStream {
    /// Create a new push stream handle
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Create the consumer group, tolerating an existing one
    pub async fn ensure_group(&self) -> RedisResult<()> {
        let mut conn = self.pool.get().await?;
        match conn
            .xgroup_create_mkstream::<_, _, _, String>(PUSH_STREAM_KEY, PUSH_GROUP, "0")
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.to_string().contains("BUSYGROUP") => Ok(()),
            Err(e) => Err(RedisPoolError::Redis(e)),
        }
    }

    /// Append a job to the tail of the main stream
    pub async fn enqueue(&self, job: &PushJob) -> RedisResult<String> {
        let mut conn = self.pool.get().await?;
        let id: String = conn.xadd_map(PUSH_STREAM_KEY, "*", job.fields()).await?;
        Ok(id)
    }

    /// Block-read up to `count` pending records for this consumer
    pub async fn read_batch(
        &self,
        consumer: &str,
        count: usize,
        block_ms: usize,
    ) -> RedisResult<Vec<StreamEntry>> {
        let mut conn = self.pool.get().await?;
        let opts = StreamReadOptions::default()
            .group(PUSH_GROUP, consumer)
            .count(count)
            .block(block_ms);
        // A blocked read that times out answers with nil
        let reply: Option<StreamReadReply> = conn
            .xread_options(&[PUSH_STREAM_KEY], &[">"], &opts)
            .await?;
        let Some(reply) = reply else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for key in reply.keys {
            for record in key.ids {
                entries.push(StreamEntry {
                    job: PushJob::from_fields(&record.map),
                    id: record.id,
                });
            }
        }
        Ok(entries)
    }

    /// Acknowledge a record in the consumer group
    pub async fn ack(&self, id: &str) -> RedisResult<()> {
        let mut conn = self.pool.get().await?;
        conn.xack::<_, _, _, i64>(PUSH_STREAM_KEY, PUSH_GROUP, &[id])
            .await?;
        Ok(())
    }

    /// Append an exhausted job to the dead-letter stream
    pub async fn dead_letter(
        &self,
        job: &PushJob,
        error: &str,
        failed_at_ms: u64,
    ) -> RedisResult<String> {
        let mut fields = job.fields();
        fields.insert("error".to_string(), error.to_string());
        fields.insert("failed_at_ms".to_string(), failed_at_ms.to_string());
        let mut conn = self.pool.get().await?;
        let id: String = conn.xadd_map(PUSH_DLQ_KEY, "*", fields).await?;
        Ok(id)
    }
}

/// Per-recipient send deduplication markers
#[derive(Debug, Clone)]
pub struct DedupStore {
    pool: RedisPool,
}

impl DedupStore {
    /// Create a new dedup store
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Key for a `(msg_id, user_id)` pair
    fn sent_key(msg_id: &str, user_id: &str) -> String {
        format!("{PUSH_SENT_PREFIX}{msg_id}:{user_id}")
    }

    /// Record that a push was delivered for this pair
    pub async fn mark_sent(&self, msg_id: &str, user_id: &str) -> RedisResult<()> {
        let key = Self::sent_key(msg_id, user_id);
        let mut conn = self.pool.get().await?;
        conn.set_ex::<_, _, ()>(&key, "1", PUSH_SENT_TTL_SECONDS)
            .await?;
        Ok(())
    }

    /// Check whether a push was already delivered for this pair
    pub async fn was_sent(&self, msg_id: &str, user_id: &str) -> RedisResult<bool> {
        let key = Self::sent_key(msg_id, user_id);
        let mut conn = self.pool.get().await?;
        let exists: bool = conn.exists(&key).await?;
        Ok(exists)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> PushJob {
        PushJob {
            to_user_id: "u_2".to_string(),
            thread_id: "t_1".to_string(),
            msg_id: "m_1".to_string(),
            seq: 7,
            msg_type: "text".to_string(),
            preview: "hello".to_string(),
            created_at: "2026-08-01T12:00:00Z".to_string(),
            attempt: 2,
            available_at_ms: 1_000,
        }
    }

    #[test]
    fn test_fields_roundtrip() {
        let job = sample_job();
        let map: HashMap<String, redis::Value> = job
            .fields()
            .into_iter()
            .map(|(k, v)| (k, redis::Value::BulkString(v.into_bytes())))
            .collect();
        assert_eq!(PushJob::from_fields(&map), job);
    }

    #[test]
    fn test_from_fields_defaults_missing_numerics() {
        let map = HashMap::from([(
            "to_user_id".to_string(),
            redis::Value::BulkString(b"u_9".to_vec()),
        )]);
        let job = PushJob::from_fields(&map);
        assert_eq!(job.to_user_id, "u_9");
        assert_eq!(job.seq, 0);
        assert_eq!(job.attempt, 0);
        assert_eq!(job.available_at_ms, 0);
    }

    #[test]
    fn test_is_deferred() {
        let job = sample_job();
        assert!(job.is_deferred(500));
        assert!(!job.is_deferred(1_000));
        assert!(!job.is_deferred(2_000));

        let immediate = PushJob {
            available_at_ms: 0,
            ..sample_job()
        };
        assert!(!immediate.is_deferred(0));
    }

    #[test]
    fn test_dedup_key() {
        assert_eq!(DedupStore::sent_key("m_1", "u_2"), "im:push:sent:m_1:u_2");
    }
}
