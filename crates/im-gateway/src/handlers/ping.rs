//! `ping` frame handler

use std::sync::Arc;

use crate::connection::Connection;
use crate::protocol::ServerFrame;
use crate::server::GatewayState;

/// Handles `ping` frames
pub struct PingHandler;

impl PingHandler {
    /// Refresh presence and ack; pings from unauthenticated connections
    /// are silently ignored.
    pub async fn handle(state: &GatewayState, conn: &Arc<Connection>, trace_id: String) {
        let Some(user_id) = conn.user_id().await else {
            return;
        };

        if let Err(e) = state
            .presence()
            .refresh(&user_id, state.gateway_id())
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "Presence refresh failed");
        }
        conn.send_or_close(ServerFrame::pong(trace_id));
    }
}
