//! Individual WebSocket connection
//!
//! A connection owns its own subscription set and a bounded outbound
//! queue. It never holds a back-pointer into the registry; the registry
//! owns every cross-reference.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Notify, RwLock};

use crate::protocol::ServerFrame;

/// A single WebSocket connection
pub struct Connection {
    /// Unique connection id
    id: String,

    /// Authenticated user id (None until `auth`)
    user_id: RwLock<Option<String>>,

    /// Bearer token presented at auth, forwarded to the API on the user's
    /// behalf
    token: RwLock<Option<String>>,

    /// Bearer token from the upgrade request's Authorization header, used
    /// as a fallback when the auth frame carries no token
    header_token: Option<String>,

    /// Threads this connection is subscribed to
    subs: RwLock<HashSet<String>>,

    /// Bounded outbound queue drained by the writer task
    sender: mpsc::Sender<ServerFrame>,

    /// Close signal shared by the reader, writer, and broadcast paths
    close: Notify,
    closed: AtomicBool,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        id: String,
        sender: mpsc::Sender<ServerFrame>,
        header_token: Option<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            user_id: RwLock::new(None),
            token: RwLock::new(None),
            header_token,
            subs: RwLock::new(HashSet::new()),
            sender,
            close: Notify::new(),
            closed: AtomicBool::new(false),
        })
    }

    /// Get the connection id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the authenticated user id
    pub async fn user_id(&self) -> Option<String> {
        self.user_id.read().await.clone()
    }

    /// Get the bearer token
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// The token from the upgrade request, if one was sent
    pub fn header_token(&self) -> Option<&str> {
        self.header_token.as_deref()
    }

    /// Check if the connection is authenticated
    pub async fn is_authenticated(&self) -> bool {
        self.user_id.read().await.is_some()
    }

    /// Bind the connection to a user after successful auth
    pub async fn set_identity(&self, user_id: &str, token: &str) {
        *self.user_id.write().await = Some(user_id.to_string());
        *self.token.write().await = Some(token.to_string());
    }

    /// Record a thread subscription
    pub async fn subscribe(&self, thread_id: &str) {
        self.subs.write().await.insert(thread_id.to_string());
    }

    /// Check a thread subscription
    pub async fn is_subscribed(&self, thread_id: &str) -> bool {
        self.subs.read().await.contains(thread_id)
    }

    /// All subscribed thread ids
    pub async fn subscriptions(&self) -> Vec<String> {
        self.subs.read().await.iter().cloned().collect()
    }

    /// Non-blocking enqueue onto the outbound queue
    pub fn try_send(
        &self,
        frame: ServerFrame,
    ) -> Result<(), mpsc::error::TrySendError<ServerFrame>> {
        self.sender.try_send(frame)
    }

    /// Enqueue a frame, closing the connection if the queue is full
    ///
    /// Returns false when the frame was not delivered. A full queue means a
    /// slow consumer; the gateway drops the peer rather than block.
    pub fn send_or_close(&self, frame: ServerFrame) -> bool {
        match self.sender.try_send(frame) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Outbound queue full, closing slow consumer");
                self.begin_close();
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Signal the connection to close; idempotent
    pub fn begin_close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.close.notify_waiters();
        }
    }

    /// Whether close has been signalled
    pub fn is_closing(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Wait for the close signal
    pub async fn wait_closed(&self) {
        let notified = self.close.notified();
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        notified.await;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("closing", &self.is_closing())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connection_starts_unauthenticated() {
        let (tx, _rx) = mpsc::channel(4);
        let conn = Connection::new("c1".to_string(), tx, None);

        assert_eq!(conn.id(), "c1");
        assert!(!conn.is_authenticated().await);
        assert!(conn.user_id().await.is_none());
        assert!(conn.token().await.is_none());
    }

    #[tokio::test]
    async fn test_set_identity() {
        let (tx, _rx) = mpsc::channel(4);
        let conn = Connection::new("c1".to_string(), tx, None);

        conn.set_identity("u_1", "tok").await;
        assert!(conn.is_authenticated().await);
        assert_eq!(conn.user_id().await.as_deref(), Some("u_1"));
        assert_eq!(conn.token().await.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_subscriptions() {
        let (tx, _rx) = mpsc::channel(4);
        let conn = Connection::new("c1".to_string(), tx, None);

        conn.subscribe("t_1").await;
        conn.subscribe("t_2").await;
        assert!(conn.is_subscribed("t_1").await);
        assert!(!conn.is_subscribed("t_3").await);
        assert_eq!(conn.subscriptions().await.len(), 2);
    }

    #[tokio::test]
    async fn test_send_or_close_on_full_queue() {
        let (tx, mut _rx) = mpsc::channel(1);
        let conn = Connection::new("c1".to_string(), tx, None);

        assert!(conn.send_or_close(ServerFrame::pong("t1")));
        // Queue is full; the second enqueue fails and flags the close
        assert!(!conn.send_or_close(ServerFrame::pong("t2")));
        assert!(conn.is_closing());
        // wait_closed returns immediately once flagged
        conn.wait_closed().await;
    }

    #[tokio::test]
    async fn test_begin_close_is_idempotent() {
        let (tx, _rx) = mpsc::channel(4);
        let conn = Connection::new("c1".to_string(), tx, None);

        conn.begin_close();
        conn.begin_close();
        assert!(conn.is_closing());
        conn.wait_closed().await;
    }
}
