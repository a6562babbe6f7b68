//! `msg` frame handler - the gateway side of the send path

use std::sync::Arc;

use im_cache::RateLimiter;

use crate::client::SendMessageBody;
use crate::connection::Connection;
use crate::protocol::{ErrorCode, MsgFrame, ServerFrame};
use crate::server::GatewayState;

use super::require_auth;

/// Handles `msg` frames
pub struct SendHandler;

impl SendHandler {
    /// Validate, rate limit, bridge the write to the API, ack the sender,
    /// and fan the message out to local subscribers.
    pub async fn handle(
        state: &GatewayState,
        conn: &Arc<Connection>,
        payload: MsgFrame,
        trace_id: String,
    ) {
        let Some((user_id, token)) = require_auth(conn, &trace_id).await else {
            return;
        };
        if payload.thread_id.is_empty()
            || payload.client_msg_id.is_empty()
            || payload.msg_type.is_empty()
        {
            conn.send_or_close(ServerFrame::error(
                trace_id,
                ErrorCode::InvalidRequest,
                "thread_id/client_msg_id/msg_type required",
            ));
            return;
        }

        // Sending requires an active subscription; permission was checked
        // when the subscription was made.
        if !conn.is_subscribed(&payload.thread_id).await {
            conn.send_or_close(ServerFrame::error(
                trace_id,
                ErrorCode::NotSubscribed,
                "subscribe to the thread before sending",
            ));
            return;
        }

        if let Some(retry_after_ms) = Self::rate_limited(state, &user_id, &payload.thread_id).await
        {
            conn.send_or_close(ServerFrame::error(
                trace_id,
                ErrorCode::RateLimited,
                format!("rate limited, retry after {retry_after_ms}ms"),
            ));
            return;
        }

        let body = SendMessageBody {
            thread_id: payload.thread_id.clone(),
            client_msg_id: payload.client_msg_id.clone(),
            msg_type: payload.msg_type.clone(),
            content: payload.content.clone(),
        };
        let receipt = match state.api().create_message(&token, &body).await {
            Ok(receipt) => receipt,
            Err(e) => {
                let code = match e.code() {
                    Some("RATE_LIMITED") => ErrorCode::RateLimited,
                    Some("FORBIDDEN") => ErrorCode::Forbidden,
                    _ => ErrorCode::SendFailed,
                };
                conn.send_or_close(ServerFrame::error(trace_id, code, e.to_string()));
                return;
            }
        };

        conn.send_or_close(ServerFrame::Ack {
            trace_id: trace_id.clone(),
            client_msg_id: Some(payload.client_msg_id),
            msg_id: Some(receipt.msg_id.clone()),
            seq: Some(receipt.seq),
        });

        let broadcast = ServerFrame::Msg {
            trace_id,
            thread_id: payload.thread_id.clone(),
            msg_id: receipt.msg_id,
            seq: receipt.seq,
            sender_id: user_id,
            msg_type: payload.msg_type,
            content: payload.content,
            created_at: receipt.created_at,
        };
        let outcome = state.registry().broadcast(&payload.thread_id, &broadcast).await;
        tracing::debug!(
            thread_id = %payload.thread_id,
            delivered = outcome.delivered,
            closed_slow = outcome.closed_slow,
            "Message fanned out"
        );
    }

    /// Run the per-sender and per-thread admission checks
    ///
    /// Returns the retry hint when denied. A limiter outage admits.
    async fn rate_limited(state: &GatewayState, user_id: &str, thread_id: &str) -> Option<u64> {
        let limits = &state.config().rate_limit;

        match state
            .rate_limiter()
            .check(
                &RateLimiter::user_key(user_id),
                limits.user_window_ms,
                limits.user_max,
            )
            .await
        {
            Ok(decision) if !decision.allowed => return Some(decision.retry_after_ms),
            Err(e) => tracing::warn!(error = %e, "User rate limit check failed, admitting"),
            Ok(_) => {}
        }

        match state
            .rate_limiter()
            .check(
                &RateLimiter::thread_key(thread_id),
                limits.thread_window_ms,
                limits.thread_max,
            )
            .await
        {
            Ok(decision) if !decision.allowed => Some(decision.retry_after_ms),
            Err(e) => {
                tracing::warn!(error = %e, "Thread rate limit check failed, admitting");
                None
            }
            Ok(_) => None,
        }
    }
}
