//! Request DTOs with validation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use im_core::{MemberRole, MessageType, ThreadType};

/// Body of `POST /v1/messages`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMessageRequest {
    pub thread_id: Uuid,

    /// Client-supplied idempotency key, unique per sender
    #[validate(length(min = 1, max = 128))]
    pub client_msg_id: String,

    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Opaque JSON payload; shape is enforced per message type
    #[serde(default)]
    pub content: Value,
}

/// Body of `POST /v1/threads/{id}/read`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReadRequest {
    #[validate(range(min = 0))]
    pub last_read_seq: i64,
}

/// A member entry in an ensure-thread request
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemberSpec {
    pub user_id: String,
    pub role: MemberRole,
}

/// Body of `POST /v1/threads/ensure`
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct EnsureThreadRequest {
    #[serde(rename = "type")]
    pub kind: ThreadType,

    #[serde(default)]
    pub match_session_id: Option<String>,

    #[serde(default)]
    pub order_id: Option<String>,

    #[validate(length(min = 2))]
    pub members: Vec<MemberSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_message_request_parses() {
        let req: CreateMessageRequest = serde_json::from_value(json!({
            "thread_id": "0e9f3a64-1d2c-4f6e-9a44-3a2b1c0d9e8f",
            "client_msg_id": "c1",
            "type": "text",
            "content": {"text": "hi"}
        }))
        .unwrap();
        assert_eq!(req.kind, MessageType::Text);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_unknown_message_type_rejected() {
        let result = serde_json::from_value::<CreateMessageRequest>(json!({
            "thread_id": "0e9f3a64-1d2c-4f6e-9a44-3a2b1c0d9e8f",
            "client_msg_id": "c1",
            "type": "sticker",
            "content": {}
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_client_msg_id_fails_validation() {
        let req: CreateMessageRequest = serde_json::from_value(json!({
            "thread_id": "0e9f3a64-1d2c-4f6e-9a44-3a2b1c0d9e8f",
            "client_msg_id": "",
            "type": "text",
            "content": {}
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_read_request_range() {
        let ok: ReadRequest = serde_json::from_value(json!({"last_read_seq": 0})).unwrap();
        assert!(ok.validate().is_ok());
        let bad: ReadRequest = serde_json::from_value(json!({"last_read_seq": -1})).unwrap();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_ensure_thread_request_members() {
        let req: EnsureThreadRequest = serde_json::from_value(json!({
            "type": "match",
            "match_session_id": "ms_1",
            "members": [
                {"user_id": "u_1", "role": "traveler"},
                {"user_id": "u_2", "role": "host"}
            ]
        }))
        .unwrap();
        assert!(req.validate().is_ok());

        let short: EnsureThreadRequest = serde_json::from_value(json!({
            "type": "order",
            "order_id": "o_1",
            "members": [{"user_id": "u_1", "role": "host"}]
        }))
        .unwrap();
        assert!(short.validate().is_err());
    }
}
