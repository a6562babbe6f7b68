//! Row models for `chat_threads` and `chat_thread_members`

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use im_core::{DomainError, Thread, ThreadMember};

/// Row model for the `chat_threads` table
#[derive(Debug, Clone, FromRow)]
pub struct ThreadModel {
    pub id: Uuid,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub status: String,
    pub match_session_id: Option<String>,
    pub order_id: Option<String>,
    pub last_seq: i64,
    pub last_message_at: Option<DateTime<Utc>>,
    pub retention_days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ThreadModel {
    /// Convert into the domain entity
    ///
    /// Fails only on a corrupt row, which maps to an internal error.
    pub fn into_entity(self) -> Result<Thread, DomainError> {
        Ok(Thread {
            id: self.id,
            kind: self.kind.parse().map_err(DomainError::Internal)?,
            status: self.status.parse().map_err(DomainError::Internal)?,
            match_session_id: self.match_session_id,
            order_id: self.order_id,
            last_seq: self.last_seq,
            last_message_at: self.last_message_at,
            retention_days: self.retention_days,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row model for the `chat_thread_members` table
#[derive(Debug, Clone, FromRow)]
pub struct ThreadMemberModel {
    pub thread_id: Uuid,
    pub user_id: String,
    pub role: String,
    pub last_read_seq: i64,
}

impl ThreadMemberModel {
    /// Convert into the domain entity
    pub fn into_entity(self) -> Result<ThreadMember, DomainError> {
        Ok(ThreadMember {
            thread_id: self.thread_id,
            user_id: self.user_id,
            role: self.role.parse().map_err(DomainError::Internal)?,
            last_read_seq: self.last_read_seq,
        })
    }
}
