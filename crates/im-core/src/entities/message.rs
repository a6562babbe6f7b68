//! Message entity - an immutable, sequenced record within a thread

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of message payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Text,
    Image,
    System,
    OrderEvent,
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Image => write!(f, "image"),
            Self::System => write!(f, "system"),
            Self::OrderEvent => write!(f, "order_event"),
        }
    }
}

impl std::str::FromStr for MessageType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(Self::Text),
            "image" => Ok(Self::Image),
            "system" => Ok(Self::System),
            "order_event" => Ok(Self::OrderEvent),
            other => Err(format!("invalid message type: {other}")),
        }
    }
}

/// Message entity
///
/// Once inserted a message never changes. `seq` is unique within the thread
/// and strictly increasing by insert order; `(sender_id, client_msg_id)` is
/// unique across all messages, which is what makes client retries idempotent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Uuid,
    pub thread_id: Uuid,
    pub sender_id: String,
    pub client_msg_id: String,
    pub seq: i64,
    pub kind: MessageType,
    pub content: Value,
    pub created_at: DateTime<Utc>,
}

/// Input for a message write; seq and id are assigned at commit
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub thread_id: Uuid,
    pub sender_id: String,
    pub client_msg_id: String,
    pub kind: MessageType,
    pub content: Value,
}

/// What the sender gets back from a message write
///
/// A replayed `client_msg_id` returns the receipt of the original write,
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReceipt {
    pub msg_id: Uuid,
    pub seq: i64,
    pub created_at: DateTime<Utc>,
}

/// Build the short notification preview for a message
///
/// Text messages surface their `content.text` string; media and order events
/// use fixed placeholders; system messages carry no preview.
#[must_use]
pub fn push_preview(kind: MessageType, content: &Value) -> String {
    match kind {
        MessageType::Image => "[image]".to_string(),
        MessageType::OrderEvent => "[order update]".to_string(),
        MessageType::System => String::new(),
        MessageType::Text => content
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_type_parse() {
        assert_eq!("text".parse::<MessageType>().unwrap(), MessageType::Text);
        assert_eq!(
            "order_event".parse::<MessageType>().unwrap(),
            MessageType::OrderEvent
        );
        assert!("video".parse::<MessageType>().is_err());
    }

    #[test]
    fn test_message_type_serde_tag() {
        let tag = serde_json::to_string(&MessageType::OrderEvent).unwrap();
        assert_eq!(tag, "\"order_event\"");
        let parsed: MessageType = serde_json::from_str("\"image\"").unwrap();
        assert_eq!(parsed, MessageType::Image);
    }

    #[test]
    fn test_push_preview_text() {
        let preview = push_preview(MessageType::Text, &json!({"text": "hi there"}));
        assert_eq!(preview, "hi there");
    }

    #[test]
    fn test_push_preview_text_non_string() {
        let preview = push_preview(MessageType::Text, &json!({"text": 42}));
        assert_eq!(preview, "");
        let preview = push_preview(MessageType::Text, &json!({}));
        assert_eq!(preview, "");
    }

    #[test]
    fn test_push_preview_placeholders() {
        assert_eq!(push_preview(MessageType::Image, &json!({})), "[image]");
        assert_eq!(
            push_preview(MessageType::OrderEvent, &json!({})),
            "[order update]"
        );
        assert_eq!(push_preview(MessageType::System, &json!({})), "");
    }
}
