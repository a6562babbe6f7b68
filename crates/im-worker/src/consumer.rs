//! Push stream consumer
//!
//! Per-record state machine: gate on `available_at_ms`, dedup, load
//! targets, send, then retry with exponential backoff or dead-letter.
//! Deferred retries are expressed as ack + re-append because the stream
//! has no native scheduling; at-least-once and the dedup contract carry
//! the correctness.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use im_cache::{DedupStore, PushJob, PushStream, StreamEntry};
use im_core::traits::DeviceTokenRepository;
use im_core::DomainError;

use crate::fcm::{PushError, PushProvider};

/// Records fetched per blocking read
const READ_BATCH: usize = 10;
/// Blocking read timeout in milliseconds
const READ_BLOCK_MS: usize = 5_000;
/// Backoff ceiling
const MAX_BACKOFF_MS: u64 = 60_000;

/// Worker-side failures
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("cache error: {0}")]
    Cache(#[from] im_cache::RedisPoolError),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// What to do with a failed job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RetryPlan {
    Retry { attempt: u32, available_at_ms: u64 },
    DeadLetter,
}

/// Exponential backoff, capped
pub(crate) fn backoff_ms(base_ms: u64, attempt: u32) -> u64 {
    let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    base_ms.saturating_mul(factor).min(MAX_BACKOFF_MS)
}

/// Decide between another retry and the dead-letter stream
pub(crate) fn plan_retry(attempt: u32, max_retries: u32, base_ms: u64, now_ms: u64) -> RetryPlan {
    if attempt + 1 >= max_retries {
        RetryPlan::DeadLetter
    } else {
        let next = attempt + 1;
        RetryPlan::Retry {
            attempt: next,
            available_at_ms: now_ms + backoff_ms(base_ms, next),
        }
    }
}

/// The data-only payload sent to the push provider
pub(crate) fn push_data(job: &PushJob) -> HashMap<String, String> {
    HashMap::from([
        ("thread_id".to_string(), job.thread_id.clone()),
        ("seq".to_string(), job.seq.to_string()),
        ("msg_id".to_string(), job.msg_id.clone()),
    ])
}

fn now_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Stream consumer driving the push state machine
pub struct PushConsumer {
    stream: PushStream,
    dedup: DedupStore,
    tokens: Arc<dyn DeviceTokenRepository>,
    provider: Option<Arc<dyn PushProvider>>,
    max_retries: u32,
    backoff_base_ms: u64,
    consumer_id: String,
}

impl PushConsumer {
    /// Create a new consumer with a unique consumer id
    pub fn new(
        stream: PushStream,
        dedup: DedupStore,
        tokens: Arc<dyn DeviceTokenRepository>,
        provider: Option<Arc<dyn PushProvider>>,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Self {
        Self {
            stream,
            dedup,
            tokens,
            provider,
            max_retries,
            backoff_base_ms,
            consumer_id: format!("worker-{}", Uuid::new_v4().simple()),
        }
    }

    /// The consumer id this process joined the group under
    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    /// Main loop; a single record failure never terminates it
    pub async fn run(&self) {
        tracing::info!(consumer = %self.consumer_id, "Push consumer started");
        loop {
            let entries = match self
                .stream
                .read_batch(&self.consumer_id, READ_BATCH, READ_BLOCK_MS)
                .await
            {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::error!(error = %e, "Stream read failed");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    continue;
                }
            };

            for entry in entries {
                if let Err(e) = self.handle(entry).await {
                    tracing::error!(error = %e, "Push handling failed");
                }
            }
        }
    }

    /// Execute the per-record state machine
    pub async fn handle(&self, entry: StreamEntry) -> Result<(), WorkerError> {
        let job = entry.job;

        // Not yet due: push it back to the tail unchanged
        if job.is_deferred(now_ms()) {
            self.stream.ack(&entry.id).await?;
            self.stream.enqueue(&job).await?;
            return Ok(());
        }

        if self.dedup.was_sent(&job.msg_id, &job.to_user_id).await? {
            self.stream.ack(&entry.id).await?;
            return Ok(());
        }

        let tokens = self.tokens.android_tokens(&job.to_user_id).await?;
        if tokens.is_empty() {
            self.stream.ack(&entry.id).await?;
            return Ok(());
        }

        let Some(provider) = &self.provider else {
            tracing::warn!(to_user_id = %job.to_user_id, "FCM not configured");
            return self
                .retry_or_dead_letter(&entry.id, job, "fcm_not_configured")
                .await;
        };

        match provider.send_data(&tokens, &push_data(&job)).await {
            Ok(outcome) if outcome.is_complete_success() => {
                self.dedup.mark_sent(&job.msg_id, &job.to_user_id).await?;
                self.stream.ack(&entry.id).await?;
                tracing::info!(
                    to_user_id = %job.to_user_id,
                    msg_id = %job.msg_id,
                    targets = tokens.len(),
                    "Push delivered"
                );
                Ok(())
            }
            Ok(outcome) => {
                tracing::warn!(
                    to_user_id = %job.to_user_id,
                    failures = outcome.failure_count,
                    "Push partially failed"
                );
                self.retry_or_dead_letter(&entry.id, job, "push_failed")
                    .await
            }
            Err(PushError::NotConfigured) => {
                self.retry_or_dead_letter(&entry.id, job, "fcm_not_configured")
                    .await
            }
            Err(e) => {
                tracing::warn!(to_user_id = %job.to_user_id, error = %e, "Push send failed");
                self.retry_or_dead_letter(&entry.id, job, "push_failed")
                    .await
            }
        }
    }

    /// Re-append with backoff, or move to the DLQ once retries are spent
    async fn retry_or_dead_letter(
        &self,
        entry_id: &str,
        mut job: PushJob,
        error: &str,
    ) -> Result<(), WorkerError> {
        match plan_retry(job.attempt, self.max_retries, self.backoff_base_ms, now_ms()) {
            RetryPlan::DeadLetter => {
                self.stream.dead_letter(&job, error, now_ms()).await?;
                self.stream.ack(entry_id).await?;
                tracing::warn!(
                    to_user_id = %job.to_user_id,
                    msg_id = %job.msg_id,
                    attempt = job.attempt,
                    error = %error,
                    "Push job dead-lettered"
                );
            }
            RetryPlan::Retry {
                attempt,
                available_at_ms,
            } => {
                self.stream.ack(entry_id).await?;
                job.attempt = attempt;
                job.available_at_ms = available_at_ms;
                self.stream.enqueue(&job).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(backoff_ms(1_000, 0), 1_000);
        assert_eq!(backoff_ms(1_000, 1), 2_000);
        assert_eq!(backoff_ms(1_000, 5), 32_000);
        assert_eq!(backoff_ms(1_000, 6), 60_000);
        assert_eq!(backoff_ms(1_000, 63), 60_000);
        assert_eq!(backoff_ms(1_000, 64), 60_000);
    }

    #[test]
    fn test_plan_retry_increments_attempt() {
        let plan = plan_retry(0, 5, 1_000, 10_000);
        assert_eq!(
            plan,
            RetryPlan::Retry {
                attempt: 1,
                available_at_ms: 12_000
            }
        );
    }

    #[test]
    fn test_plan_retry_dead_letters_at_limit() {
        assert_eq!(plan_retry(4, 5, 1_000, 0), RetryPlan::DeadLetter);
        assert_eq!(plan_retry(9, 5, 1_000, 0), RetryPlan::DeadLetter);
        assert!(matches!(
            plan_retry(3, 5, 1_000, 0),
            RetryPlan::Retry { attempt: 4, .. }
        ));
    }

    #[test]
    fn test_push_data_fields() {
        let job = PushJob {
            to_user_id: "u_2".to_string(),
            thread_id: "t_1".to_string(),
            msg_id: "m_1".to_string(),
            seq: 9,
            msg_type: "text".to_string(),
            preview: "hello".to_string(),
            created_at: String::new(),
            attempt: 0,
            available_at_ms: 0,
        };
        let data = push_data(&job);
        assert_eq!(data.get("thread_id").map(String::as_str), Some("t_1"));
        assert_eq!(data.get("seq").map(String::as_str), Some("9"));
        assert_eq!(data.get("msg_id").map(String::as_str), Some("m_1"));
        // No visible body goes over the wire
        assert!(!data.contains_key("preview"));
    }
}
