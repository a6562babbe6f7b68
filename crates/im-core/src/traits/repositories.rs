//! Repository trait definitions
//!
//! Storage contracts for threads, messages, and device tokens. The message
//! write is a single repository operation because its idempotency and seq
//! allocation must happen inside one transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::entities::{
    MemberRole, Message, MessageReceipt, NewMessage, Thread, ThreadMember, ThreadType,
};
use crate::error::DomainError;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

/// A member to attach when ensuring a thread
#[derive(Debug, Clone)]
pub struct NewThreadMember {
    pub user_id: String,
    pub role: MemberRole,
}

/// Input for the idempotent thread upsert keyed on the business context
#[derive(Debug, Clone)]
pub struct EnsureThread {
    pub kind: ThreadType,
    pub match_session_id: Option<String>,
    pub order_id: Option<String>,
    pub members: Vec<NewThreadMember>,
}

/// Cursor query over a thread's message history
#[derive(Debug, Clone)]
pub struct MessageQuery {
    pub after_seq: Option<i64>,
    pub before_seq: Option<i64>,
    pub limit: i64,
    /// Retention cutoff; rows created before this instant are not returned
    pub not_before: DateTime<Utc>,
}

/// Outcome of a message write
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    pub receipt: MessageReceipt,
    /// True when the write was a replay of an existing `client_msg_id`
    pub replayed: bool,
}

/// Thread and membership storage
#[async_trait]
pub trait ThreadRepository: Send + Sync {
    /// Idempotently create the thread for a business context and attach members
    async fn ensure(&self, spec: &EnsureThread) -> RepoResult<Thread>;

    /// Load a thread only if `user_id` is a member of it
    async fn find_for_member(&self, thread_id: Uuid, user_id: &str) -> RepoResult<Option<Thread>>;

    /// Check membership
    async fn is_member(&self, thread_id: Uuid, user_id: &str) -> RepoResult<bool>;

    /// Load the membership record for a user
    async fn member(&self, thread_id: Uuid, user_id: &str) -> RepoResult<Option<ThreadMember>>;

    /// Advance the member's read cursor; never moves backwards
    ///
    /// Fails with `NotAMember` when no membership row matches.
    async fn advance_read_cursor(
        &self,
        thread_id: Uuid,
        user_id: &str,
        last_read_seq: i64,
    ) -> RepoResult<()>;

    /// All member user ids except the given one (push fan-out set)
    async fn member_ids_excluding(
        &self,
        thread_id: Uuid,
        user_id: &str,
    ) -> RepoResult<Vec<String>>;
}

/// Message storage
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Write a message, allocating the next per-thread seq
    ///
    /// Runs the full idempotency transaction: an existing
    /// `(sender_id, client_msg_id)` row short-circuits to its original
    /// receipt, membership and `active` status are checked through the
    /// member join, and a unique-violation race on insert is resolved by
    /// re-reading the winner's row.
    async fn append(&self, message: &NewMessage) -> RepoResult<AppendOutcome>;

    /// List messages in ascending seq order within the query window
    async fn list(&self, thread_id: Uuid, query: &MessageQuery) -> RepoResult<Vec<Message>>;

    /// Smallest seq still inside the retention window (0 when empty)
    async fn min_visible_seq(
        &self,
        thread_id: Uuid,
        not_before: DateTime<Utc>,
    ) -> RepoResult<i64>;
}

/// Device token storage (read-only to the core)
#[async_trait]
pub trait DeviceTokenRepository: Send + Sync {
    /// Android push tokens registered for a user
    async fn android_tokens(&self, user_id: &str) -> RepoResult<Vec<String>>;
}
