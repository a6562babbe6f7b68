//! Message service - the seq engine's write path
//!
//! Validates the payload, applies both sliding-window limits, runs the
//! idempotent append transaction, and enqueues push jobs for offline
//! members. A rate-limited request consumes no seq and enqueues nothing;
//! neither does an idempotent replay.

use im_cache::{PushJob, RateLimiter};
use im_core::traits::AppendOutcome;
use im_core::{push_preview, ImageContent, ImagePolicy, MessageType, NewMessage};

use crate::dto::CreateMessageRequest;

use super::{ServiceContext, ServiceError, ServiceResult};

/// Message creation service
#[derive(Clone)]
pub struct MessageService {
    ctx: ServiceContext,
}

impl MessageService {
    /// Create a new message service
    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a message on behalf of `sender_id`
    ///
    /// Returns the receipt plus whether the write was an idempotent replay.
    pub async fn create(
        &self,
        sender_id: &str,
        request: CreateMessageRequest,
    ) -> ServiceResult<AppendOutcome> {
        let content = self.validate_content(&request)?;

        self.check_rate_limits(sender_id, &request.thread_id.to_string())
            .await?;

        let message = NewMessage {
            thread_id: request.thread_id,
            sender_id: sender_id.to_string(),
            client_msg_id: request.client_msg_id,
            kind: request.kind,
            content,
        };
        let outcome = self.ctx.messages().append(&message).await?;

        if outcome.replayed {
            tracing::debug!(
                sender_id = %sender_id,
                thread_id = %message.thread_id,
                client_msg_id = %message.client_msg_id,
                seq = outcome.receipt.seq,
                "Message replay, returning original receipt"
            );
        } else {
            tracing::info!(
                sender_id = %sender_id,
                thread_id = %message.thread_id,
                msg_id = %outcome.receipt.msg_id,
                seq = outcome.receipt.seq,
                "Message written"
            );
            self.enqueue_push_jobs(&message, &outcome).await;
        }

        Ok(outcome)
    }

    /// Validate the message content, normalizing image payloads
    fn validate_content(&self, request: &CreateMessageRequest) -> ServiceResult<serde_json::Value> {
        if request.kind != MessageType::Image {
            return Ok(request.content.clone());
        }
        let policy = ImagePolicy::new(
            self.ctx
                .config()
                .media
                .public_base_url
                .clone()
                .unwrap_or_default(),
            self.ctx.config().app.env.as_str(),
        );
        let normalized = ImageContent::normalize(&request.content, &policy)?;
        serde_json::to_value(&normalized)
            .map_err(|e| ServiceError::Internal(format!("image content serialize: {e}")))
    }

    /// Apply per-sender then per-thread admission checks
    ///
    /// A limiter outage admits: losing rate limiting briefly is preferable
    /// to failing every send while Redis is down.
    async fn check_rate_limits(&self, sender_id: &str, thread_id: &str) -> ServiceResult<()> {
        let limits = &self.ctx.config().rate_limit;

        match self
            .ctx
            .rate_limiter()
            .check(
                &RateLimiter::user_key(sender_id),
                limits.user_window_ms,
                limits.user_max,
            )
            .await
        {
            Ok(decision) if !decision.allowed => {
                return Err(ServiceError::RateLimited {
                    retry_after_ms: decision.retry_after_ms,
                });
            }
            Err(e) => tracing::warn!(error = %e, "User rate limit check failed, admitting"),
            Ok(_) => {}
        }

        match self
            .ctx
            .rate_limiter()
            .check(
                &RateLimiter::thread_key(thread_id),
                limits.thread_window_ms,
                limits.thread_max,
            )
            .await
        {
            Ok(decision) if !decision.allowed => Err(ServiceError::RateLimited {
                retry_after_ms: decision.retry_after_ms,
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Thread rate limit check failed, admitting");
                Ok(())
            }
            Ok(_) => Ok(()),
        }
    }

    /// Enqueue one push job per offline non-sender member
    ///
    /// Failures are logged and do not fail the send; the message is already
    /// committed.
    async fn enqueue_push_jobs(&self, message: &NewMessage, outcome: &AppendOutcome) {
        let recipients = match self
            .ctx
            .threads()
            .member_ids_excluding(message.thread_id, &message.sender_id)
            .await
        {
            Ok(recipients) => recipients,
            Err(e) => {
                tracing::error!(error = %e, "Push enqueue member query failed");
                return;
            }
        };

        let preview = push_preview(message.kind, &message.content);
        for recipient in recipients {
            // A presence probe failure counts as offline: an extra push
            // beats a silently dropped one.
            let online = self
                .ctx
                .presence()
                .is_online(&recipient)
                .await
                .unwrap_or(false);
            if online {
                continue;
            }

            let job = PushJob {
                to_user_id: recipient.clone(),
                thread_id: message.thread_id.to_string(),
                msg_id: outcome.receipt.msg_id.to_string(),
                seq: outcome.receipt.seq,
                msg_type: message.kind.to_string(),
                preview: preview.clone(),
                created_at: outcome.receipt.created_at.to_rfc3339(),
                attempt: 0,
                available_at_ms: 0,
            };
            if let Err(e) = self.ctx.push_stream().enqueue(&job).await {
                tracing::error!(
                    error = %e,
                    to_user_id = %recipient,
                    msg_id = %outcome.receipt.msg_id,
                    "Push enqueue failed"
                );
            }
        }
    }
}
