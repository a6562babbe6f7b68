//! Response DTOs

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use im_core::{Message, MessageReceipt, Thread};

use crate::services::MessageHistory;

/// Response body for a message write
#[derive(Debug, Clone, Serialize)]
pub struct MessageCreatedResponse {
    pub msg_id: Uuid,
    pub seq: i64,
    pub created_at: DateTime<Utc>,
}

impl From<MessageReceipt> for MessageCreatedResponse {
    fn from(receipt: MessageReceipt) -> Self {
        Self {
            msg_id: receipt.msg_id,
            seq: receipt.seq,
            created_at: receipt.created_at,
        }
    }
}

/// Response body for the permission check
#[derive(Debug, Clone, Serialize)]
pub struct PermissionResponse {
    pub allowed: bool,
}

/// Response body for a read-cursor update
#[derive(Debug, Clone, Serialize)]
pub struct ReadResponse {
    pub last_read_seq: i64,
}

/// Response body for an ensured thread
#[derive(Debug, Clone, Serialize)]
pub struct ThreadResponse {
    pub thread_id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub match_session_id: Option<String>,
    pub order_id: Option<String>,
    pub last_seq: i64,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl From<Thread> for ThreadResponse {
    fn from(thread: Thread) -> Self {
        Self {
            thread_id: thread.id,
            kind: thread.kind.to_string(),
            status: thread.status.to_string(),
            match_session_id: thread.match_session_id,
            order_id: thread.order_id,
            last_seq: thread.last_seq,
            last_message_at: thread.last_message_at,
        }
    }
}

/// One message in a history page
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub sender_id: String,
    pub client_msg_id: String,
    pub seq: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub content: Value,
    pub created_at: DateTime<Utc>,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            thread_id: message.thread_id,
            sender_id: message.sender_id,
            client_msg_id: message.client_msg_id,
            seq: message.seq,
            kind: message.kind.to_string(),
            content: message.content,
            created_at: message.created_at,
        }
    }
}

/// Response body for a thread history page
#[derive(Debug, Clone, Serialize)]
pub struct MessageHistoryResponse {
    pub messages: Vec<MessageResponse>,
    pub truncated: bool,
    pub server_min_seq: i64,
}

impl From<MessageHistory> for MessageHistoryResponse {
    fn from(history: MessageHistory) -> Self {
        Self {
            messages: history
                .messages
                .into_iter()
                .map(MessageResponse::from)
                .collect(),
            truncated: history.truncated,
            server_min_seq: history.server_min_seq,
        }
    }
}
