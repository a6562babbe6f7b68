//! Fan-out registry
//!
//! Three maps behind one readers-writer lock: all connections, user to
//! connections, thread to subscribers. Add and remove take the write lock
//! for O(1) work; broadcast takes the read lock and does a non-blocking
//! enqueue per subscriber. No lock is ever held across an await on the
//! socket.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::protocol::ServerFrame;

use super::Connection;

#[derive(Default)]
struct RegistryInner {
    conns: HashMap<String, Arc<Connection>>,
    user_conns: HashMap<String, HashSet<String>>,
    thread_subs: HashMap<String, HashSet<String>>,
}

/// Result of a thread broadcast
#[derive(Debug, Default, Clone, Copy)]
pub struct BroadcastOutcome {
    /// Frames enqueued successfully
    pub delivered: usize,
    /// Slow consumers flagged for close
    pub closed_slow: usize,
}

/// Registry of all live connections on this gateway
#[derive(Default)]
pub struct Registry {
    inner: RwLock<RegistryInner>,
}

impl Registry {
    /// Create a new registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a connection
    pub async fn insert(&self, conn: Arc<Connection>) {
        let mut inner = self.inner.write().await;
        inner.conns.insert(conn.id().to_string(), conn);
    }

    /// Remove a connection and every reference to it
    ///
    /// The connection's own user id and subscription set are read before
    /// the write lock is taken.
    pub async fn remove(&self, conn: &Arc<Connection>) {
        let user_id = conn.user_id().await;
        let subs = conn.subscriptions().await;

        let mut inner = self.inner.write().await;
        inner.conns.remove(conn.id());

        if let Some(user_id) = user_id {
            if let Some(set) = inner.user_conns.get_mut(&user_id) {
                set.remove(conn.id());
                if set.is_empty() {
                    inner.user_conns.remove(&user_id);
                }
            }
        }
        for thread_id in subs {
            if let Some(set) = inner.thread_subs.get_mut(&thread_id) {
                set.remove(conn.id());
                if set.is_empty() {
                    inner.thread_subs.remove(&thread_id);
                }
            }
        }

        tracing::debug!(conn_id = %conn.id(), "Connection removed from registry");
    }

    /// Link an authenticated connection to its user
    pub async fn attach_user(&self, conn_id: &str, user_id: &str) {
        let mut inner = self.inner.write().await;
        inner
            .user_conns
            .entry(user_id.to_string())
            .or_default()
            .insert(conn_id.to_string());
    }

    /// Subscribe a connection to a thread
    pub async fn subscribe(&self, conn: &Arc<Connection>, thread_id: &str) {
        conn.subscribe(thread_id).await;
        let mut inner = self.inner.write().await;
        inner
            .thread_subs
            .entry(thread_id.to_string())
            .or_default()
            .insert(conn.id().to_string());
    }

    /// Fan a frame out to every local subscriber of a thread
    ///
    /// The enqueue is non-blocking; a subscriber whose queue is full is
    /// flagged for close and the broadcast continues. Delivery order across
    /// connections follows map iteration order; clients sort by seq.
    pub async fn broadcast(&self, thread_id: &str, frame: &ServerFrame) -> BroadcastOutcome {
        let inner = self.inner.read().await;
        let mut outcome = BroadcastOutcome::default();

        let Some(subscribers) = inner.thread_subs.get(thread_id) else {
            return outcome;
        };
        for conn_id in subscribers {
            let Some(conn) = inner.conns.get(conn_id) else {
                continue;
            };
            if conn.send_or_close(frame.clone()) {
                outcome.delivered += 1;
            } else if conn.is_closing() {
                outcome.closed_slow += 1;
            }
        }

        outcome
    }

    /// Whether the user has another live connection besides `except_conn_id`
    pub async fn has_other_connections(&self, user_id: &str, except_conn_id: &str) -> bool {
        let inner = self.inner.read().await;
        inner
            .user_conns
            .get(user_id)
            .is_some_and(|set| set.iter().any(|id| id != except_conn_id))
    }

    /// Total number of live connections
    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.conns.len()
    }

    /// Number of locally subscribed connections for a thread
    pub async fn subscriber_count(&self, thread_id: &str) -> usize {
        self.inner
            .read()
            .await
            .thread_subs
            .get(thread_id)
            .map_or(0, HashSet::len)
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_conn(id: &str, capacity: usize) -> (Arc<Connection>, mpsc::Receiver<ServerFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Connection::new(id.to_string(), tx, None), rx)
    }

    #[tokio::test]
    async fn test_insert_and_remove() {
        let registry = Registry::new();
        let (conn, _rx) = make_conn("c1", 4);

        registry.insert(conn.clone()).await;
        assert_eq!(registry.connection_count().await, 1);

        registry.remove(&conn).await;
        assert_eq!(registry.connection_count().await, 0);
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers_only() {
        let registry = Registry::new();
        let (sub, mut sub_rx) = make_conn("c1", 4);
        let (other, mut other_rx) = make_conn("c2", 4);

        registry.insert(sub.clone()).await;
        registry.insert(other.clone()).await;
        registry.subscribe(&sub, "t_1").await;

        let outcome = registry.broadcast("t_1", &ServerFrame::pong("trace")).await;
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.closed_slow, 0);

        assert!(sub_rx.try_recv().is_ok());
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_closes_slow_consumer_and_continues() {
        let registry = Registry::new();
        let (slow, _slow_rx) = make_conn("slow", 1);
        let (fast, mut fast_rx) = make_conn("fast", 4);

        registry.insert(slow.clone()).await;
        registry.insert(fast.clone()).await;
        registry.subscribe(&slow, "t_1").await;
        registry.subscribe(&fast, "t_1").await;

        // Fill the slow consumer's queue
        slow.try_send(ServerFrame::pong("pre")).unwrap();

        let outcome = registry.broadcast("t_1", &ServerFrame::pong("trace")).await;
        assert_eq!(outcome.delivered, 1);
        assert_eq!(outcome.closed_slow, 1);
        assert!(slow.is_closing());
        assert!(!fast.is_closing());
        assert!(fast_rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_remove_clears_thread_and_user_maps() {
        let registry = Registry::new();
        let (conn, _rx) = make_conn("c1", 4);

        registry.insert(conn.clone()).await;
        conn.set_identity("u_1", "tok").await;
        registry.attach_user(conn.id(), "u_1").await;
        registry.subscribe(&conn, "t_1").await;
        assert_eq!(registry.subscriber_count("t_1").await, 1);

        registry.remove(&conn).await;
        assert_eq!(registry.subscriber_count("t_1").await, 0);
        assert!(!registry.has_other_connections("u_1", "c_other").await);
    }

    #[tokio::test]
    async fn test_has_other_connections() {
        let registry = Registry::new();
        let (a, _rx_a) = make_conn("a", 4);
        let (b, _rx_b) = make_conn("b", 4);

        registry.insert(a.clone()).await;
        registry.insert(b.clone()).await;
        a.set_identity("u_1", "tok").await;
        b.set_identity("u_1", "tok").await;
        registry.attach_user("a", "u_1").await;
        registry.attach_user("b", "u_1").await;

        assert!(registry.has_other_connections("u_1", "a").await);
        registry.remove(&b).await;
        assert!(!registry.has_other_connections("u_1", "a").await);
    }
}
