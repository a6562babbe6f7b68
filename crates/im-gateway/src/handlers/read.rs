//! `read` frame handler

use std::sync::Arc;

use crate::connection::Connection;
use crate::protocol::{ErrorCode, ReadFrame, ServerFrame};
use crate::server::GatewayState;

use super::require_auth;

/// Handles `read` frames
pub struct ReadHandler;

impl ReadHandler {
    /// Forward the read-cursor update to the API
    pub async fn handle(
        state: &GatewayState,
        conn: &Arc<Connection>,
        payload: ReadFrame,
        trace_id: String,
    ) {
        let Some((_user_id, token)) = require_auth(conn, &trace_id).await else {
            return;
        };
        let last_read_seq = match payload.last_read_seq {
            Some(seq) if seq >= 0 && !payload.thread_id.is_empty() => seq,
            _ => {
                conn.send_or_close(ServerFrame::error(
                    trace_id,
                    ErrorCode::InvalidRequest,
                    "thread_id/last_read_seq required",
                ));
                return;
            }
        };

        if let Err(e) = state
            .api()
            .update_read(&token, &payload.thread_id, last_read_seq)
            .await
        {
            conn.send_or_close(ServerFrame::error(
                trace_id,
                ErrorCode::ReadFailed,
                e.to_string(),
            ));
            return;
        }

        conn.send_or_close(ServerFrame::ReadOk {
            trace_id,
            thread_id: payload.thread_id,
            last_read_seq,
        });
    }
}
