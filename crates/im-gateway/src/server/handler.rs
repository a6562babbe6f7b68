//! WebSocket handler
//!
//! One reader task and one writer task per connection, joined by the
//! connection's close signal. The writer drains the bounded outbound queue
//! under a write deadline; the reader feeds the frame dispatcher. A
//! presence refresh task keeps the user's online marker alive while the
//! socket is open.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::HeaderMap,
    response::IntoResponse,
};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval, timeout};
use uuid::Uuid;

use im_common::extract_bearer;

use crate::connection::Connection;
use crate::handlers::FrameDispatcher;
use crate::protocol::ServerFrame;
use crate::server::GatewayState;

/// Deadline for a single socket write
const WRITE_DEADLINE: Duration = Duration::from_secs(10);

/// WebSocket gateway handler for `/ws`
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // A bearer token on the upgrade request doubles as the auth fallback
    let header_token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(extract_bearer)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    ws.on_upgrade(move |socket| handle_socket(state, socket, header_token))
}

/// Drive one connection from upgrade to cleanup
async fn handle_socket(state: GatewayState, socket: WebSocket, header_token: Option<String>) {
    let conn_id = format!("conn_{}", Uuid::new_v4().simple());
    let (tx, rx) = mpsc::channel::<ServerFrame>(state.config().gateway.outbound_queue);
    let connection = Connection::new(conn_id.clone(), tx, header_token);

    state.registry().insert(connection.clone()).await;
    tracing::info!(conn_id = %conn_id, "WebSocket connection established");

    let (ws_sink, ws_stream) = socket.split();

    let mut send_task = tokio::spawn(write_loop(ws_sink, rx, connection.clone()));
    let mut recv_task = tokio::spawn(read_loop(
        state.clone(),
        connection.clone(),
        ws_stream,
    ));
    let presence_task = tokio::spawn(presence_refresh_loop(state.clone(), connection.clone()));

    // First exit wins: reader error/EOF, writer error, or a close signal
    // (slow-consumer eviction). Both task exits are idempotent.
    tokio::select! {
        _ = &mut recv_task => {}
        _ = &mut send_task => {}
        _ = connection.wait_closed() => {}
    }
    recv_task.abort();
    send_task.abort();
    presence_task.abort();

    cleanup_connection(&state, &connection).await;
    tracing::info!(conn_id = %conn_id, "WebSocket connection closed");
}

/// Drain the outbound queue into the socket
async fn write_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<ServerFrame>,
    connection: Arc<Connection>,
) {
    while let Some(frame) = rx.recv().await {
        let json = match frame.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(conn_id = %connection.id(), error = %e, "Frame serialization failed");
                continue;
            }
        };
        match timeout(WRITE_DEADLINE, sink.send(Message::Text(json.into()))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::debug!(conn_id = %connection.id(), error = %e, "Socket write failed");
                break;
            }
            Err(_) => {
                tracing::warn!(conn_id = %connection.id(), "Socket write deadline exceeded");
                break;
            }
        }
    }
    let _ = sink.close().await;
}

/// Feed inbound frames into the dispatcher
async fn read_loop(
    state: GatewayState,
    connection: Arc<Connection>,
    mut stream: SplitStream<WebSocket>,
) {
    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                FrameDispatcher::dispatch(&state, &connection, &text).await;
            }
            Ok(Message::Binary(_)) => {
                tracing::debug!(conn_id = %connection.id(), "Binary frames not supported");
                connection.send_or_close(ServerFrame::error(
                    im_common::new_trace_id(),
                    crate::protocol::ErrorCode::InvalidJson,
                    "text frames only",
                ));
            }
            Ok(Message::Close(_)) => {
                tracing::debug!(conn_id = %connection.id(), "Client closed connection");
                return;
            }
            // Ping/pong are handled by axum
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %connection.id(), error = %e, "WebSocket read error");
                return;
            }
        }
    }
}

/// Refresh the user's presence marker while the socket is open
async fn presence_refresh_loop(state: GatewayState, connection: Arc<Connection>) {
    let mut tick = interval(Duration::from_secs(state.config().presence.refresh_seconds));
    loop {
        tick.tick().await;
        if let Some(user_id) = connection.user_id().await {
            if let Err(e) = state.presence().refresh(&user_id, state.gateway_id()).await {
                tracing::warn!(user_id = %user_id, error = %e, "Presence refresh failed");
            }
        }
    }
}

/// Remove the connection and drop presence when it was the user's last one
async fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    connection.begin_close();
    state.registry().remove(connection).await;

    if let Some(user_id) = connection.user_id().await {
        if !state
            .registry()
            .has_other_connections(&user_id, connection.id())
            .await
        {
            if let Err(e) = state.presence().clear(&user_id).await {
                tracing::warn!(user_id = %user_id, error = %e, "Presence clear failed");
            }
        }
    }
}
