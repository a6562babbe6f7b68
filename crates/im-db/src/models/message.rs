//! Row model for the `chat_messages` table

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use im_core::{DomainError, Message};

/// Row model for the `chat_messages` table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub sender_id: String,
    pub client_msg_id: String,
    pub seq: i64,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub content: Value,
    pub created_at: DateTime<Utc>,
}

impl MessageModel {
    /// Convert into the domain entity
    pub fn into_entity(self) -> Result<Message, DomainError> {
        Ok(Message {
            id: self.id,
            thread_id: self.thread_id,
            sender_id: self.sender_id,
            client_msg_id: self.client_msg_id,
            seq: self.seq,
            kind: self.kind.parse().map_err(DomainError::Internal)?,
            content: self.content,
            created_at: self.created_at,
        })
    }
}
