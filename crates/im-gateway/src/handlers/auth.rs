//! `auth` frame handler

use std::sync::Arc;

use im_common::extract_bearer;

use crate::connection::Connection;
use crate::protocol::{AuthFrame, ErrorCode, ServerFrame};
use crate::server::GatewayState;

/// Handles `auth` frames
pub struct AuthHandler;

impl AuthHandler {
    /// Verify the token, bind the connection to its user, and start
    /// counting the user as present on this gateway.
    pub async fn handle(
        state: &GatewayState,
        conn: &Arc<Connection>,
        payload: AuthFrame,
        trace_id: String,
    ) {
        if conn.is_authenticated().await {
            conn.send_or_close(ServerFrame::error(
                trace_id,
                ErrorCode::AlreadyAuth,
                "already authenticated",
            ));
            return;
        }

        // Frame token first, Authorization header from the upgrade request
        // as fallback
        let mut token = extract_bearer(&payload.token).to_string();
        if token.is_empty() {
            token = conn.header_token().unwrap_or_default().to_string();
        }

        let user_id = match state.jwt_service().verify_subject(&token) {
            Ok(user_id) => user_id,
            Err(e) => {
                tracing::debug!(conn_id = %conn.id(), error = %e, "Token verification failed");
                conn.send_or_close(ServerFrame::error(
                    trace_id,
                    ErrorCode::Unauthorized,
                    "invalid token",
                ));
                return;
            }
        };

        conn.set_identity(&user_id, &token).await;
        state.registry().attach_user(conn.id(), &user_id).await;

        if let Err(e) = state
            .presence()
            .refresh(&user_id, state.gateway_id())
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "Presence refresh failed");
        }

        tracing::info!(conn_id = %conn.id(), user_id = %user_id, "Connection authenticated");
        conn.send_or_close(ServerFrame::AuthOk { trace_id, user_id });
    }
}
