//! `sub` frame handler

use std::sync::Arc;

use crate::connection::Connection;
use crate::protocol::{ErrorCode, ServerFrame, SubFrame};
use crate::server::GatewayState;

use super::require_auth;

/// Handles `sub` frames
pub struct SubscribeHandler;

impl SubscribeHandler {
    /// Check membership with the API and add the connection to the
    /// thread's local subscriber set.
    ///
    /// Membership is authoritative in the store behind the API; no result
    /// is cached here, so a `sub` after a membership change sees the
    /// current truth.
    pub async fn handle(
        state: &GatewayState,
        conn: &Arc<Connection>,
        payload: SubFrame,
        trace_id: String,
    ) {
        let Some((_user_id, token)) = require_auth(conn, &trace_id).await else {
            return;
        };
        if payload.thread_id.is_empty() {
            conn.send_or_close(ServerFrame::error(
                trace_id,
                ErrorCode::InvalidRequest,
                "thread_id required",
            ));
            return;
        }

        if let Err(e) = state
            .api()
            .check_permission(&token, &payload.thread_id)
            .await
        {
            tracing::debug!(
                conn_id = %conn.id(),
                thread_id = %payload.thread_id,
                error = %e,
                "Permission check failed"
            );
            conn.send_or_close(ServerFrame::error(
                trace_id,
                ErrorCode::Forbidden,
                "not a member",
            ));
            return;
        }

        state.registry().subscribe(conn, &payload.thread_id).await;
        conn.send_or_close(ServerFrame::SubOk {
            trace_id,
            thread_id: payload.thread_id,
        });
    }
}
