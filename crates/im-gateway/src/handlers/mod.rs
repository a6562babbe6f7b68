//! Frame handlers
//!
//! Dispatches parsed inbound frames to their handlers. Protocol errors
//! answer with an `error` frame and leave the connection open; only the
//! transport layer closes sockets.

mod auth;
mod ping;
mod read;
mod send;
mod subscribe;

pub use auth::AuthHandler;
pub use ping::PingHandler;
pub use read::ReadHandler;
pub use send::SendHandler;
pub use subscribe::SubscribeHandler;

use std::sync::Arc;

use im_common::new_trace_id;

use crate::connection::Connection;
use crate::protocol::{ClientFrame, ErrorCode, FrameError, ServerFrame};
use crate::server::GatewayState;

/// Dispatch one raw text frame
pub struct FrameDispatcher;

impl FrameDispatcher {
    /// Parse and route an inbound frame
    pub async fn dispatch(state: &GatewayState, conn: &Arc<Connection>, text: &str) {
        let frame = match ClientFrame::parse(text) {
            Ok(frame) => frame,
            Err(FrameError::InvalidJson) => {
                conn.send_or_close(ServerFrame::error(
                    new_trace_id(),
                    ErrorCode::InvalidJson,
                    "invalid json",
                ));
                return;
            }
            Err(FrameError::UnknownType(kind)) => {
                conn.send_or_close(ServerFrame::error(
                    new_trace_id(),
                    ErrorCode::UnknownType,
                    format!("unsupported type: {kind}"),
                ));
                return;
            }
        };

        let trace_id = frame
            .trace_id()
            .map(str::to_string)
            .unwrap_or_else(new_trace_id);

        match frame {
            ClientFrame::Auth(payload) => {
                AuthHandler::handle(state, conn, payload, trace_id).await;
            }
            ClientFrame::Sub(payload) => {
                SubscribeHandler::handle(state, conn, payload, trace_id).await;
            }
            ClientFrame::Msg(payload) => {
                SendHandler::handle(state, conn, payload, trace_id).await;
            }
            ClientFrame::Read(payload) => {
                ReadHandler::handle(state, conn, payload, trace_id).await;
            }
            ClientFrame::Ping { .. } => {
                PingHandler::handle(state, conn, trace_id).await;
            }
        }
    }
}

/// Reply with UNAUTHORIZED unless the connection is authenticated
///
/// Returns the user id when authenticated.
pub(crate) async fn require_auth(
    conn: &Arc<Connection>,
    trace_id: &str,
) -> Option<(String, String)> {
    let (user_id, token) = (conn.user_id().await, conn.token().await);
    match (user_id, token) {
        (Some(user_id), Some(token)) => Some((user_id, token)),
        _ => {
            conn.send_or_close(ServerFrame::error(
                trace_id,
                ErrorCode::Unauthorized,
                "auth required",
            ));
            None
        }
    }
}
