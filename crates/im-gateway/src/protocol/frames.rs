//! Gateway frame formats
//!
//! Every inbound frame is a JSON object with a `type` discriminator; every
//! outbound frame carries the discriminator plus the request's trace id.
//! Malformed JSON and unknown discriminators are distinct failures so the
//! client can tell a broken encoder from a protocol version mismatch.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound `auth` payload
#[derive(Debug, Clone, Deserialize)]
pub struct AuthFrame {
    #[serde(default)]
    pub token: String,
    #[serde(default)]
    pub trace_id: Option<String>,
}

/// Inbound `sub` payload
#[derive(Debug, Clone, Deserialize)]
pub struct SubFrame {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub trace_id: Option<String>,
}

/// Inbound `msg` payload
#[derive(Debug, Clone, Deserialize)]
pub struct MsgFrame {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub client_msg_id: String,
    #[serde(default)]
    pub msg_type: String,
    #[serde(default)]
    pub content: Value,
    #[serde(default)]
    pub trace_id: Option<String>,
}

/// Inbound `read` payload
#[derive(Debug, Clone, Deserialize)]
pub struct ReadFrame {
    #[serde(default)]
    pub thread_id: String,
    #[serde(default)]
    pub last_read_seq: Option<i64>,
    #[serde(default)]
    pub trace_id: Option<String>,
}

/// A parsed inbound frame
#[derive(Debug, Clone)]
pub enum ClientFrame {
    Auth(AuthFrame),
    Sub(SubFrame),
    Msg(MsgFrame),
    Read(ReadFrame),
    Ping { trace_id: Option<String> },
}

/// Frame parse failures
#[derive(Debug, Clone, thiserror::Error)]
pub enum FrameError {
    #[error("invalid json")]
    InvalidJson,

    #[error("unsupported type: {0}")]
    UnknownType(String),
}

impl ClientFrame {
    /// Parse a raw text frame
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: Value = serde_json::from_str(text).map_err(|_| FrameError::InvalidJson)?;
        let Some(kind) = value.get("type").and_then(Value::as_str) else {
            return Err(FrameError::InvalidJson);
        };
        let frame = match kind {
            "auth" => Self::Auth(
                serde_json::from_value(value.clone()).map_err(|_| FrameError::InvalidJson)?,
            ),
            "sub" => Self::Sub(
                serde_json::from_value(value.clone()).map_err(|_| FrameError::InvalidJson)?,
            ),
            "msg" => Self::Msg(
                serde_json::from_value(value.clone()).map_err(|_| FrameError::InvalidJson)?,
            ),
            "read" => Self::Read(
                serde_json::from_value(value.clone()).map_err(|_| FrameError::InvalidJson)?,
            ),
            "ping" => Self::Ping {
                trace_id: value
                    .get("trace_id")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            other => return Err(FrameError::UnknownType(other.to_string())),
        };
        Ok(frame)
    }

    /// The trace id the client attached, if any
    #[must_use]
    pub fn trace_id(&self) -> Option<&str> {
        match self {
            Self::Auth(f) => f.trace_id.as_deref(),
            Self::Sub(f) => f.trace_id.as_deref(),
            Self::Msg(f) => f.trace_id.as_deref(),
            Self::Read(f) => f.trace_id.as_deref(),
            Self::Ping { trace_id } => trace_id.as_deref(),
        }
    }
}

/// Gateway error codes sent to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    InvalidJson,
    Unauthorized,
    AlreadyAuth,
    Forbidden,
    InvalidRequest,
    NotSubscribed,
    RateLimited,
    SendFailed,
    ReadFailed,
    UnknownType,
}

impl ErrorCode {
    /// The wire representation of the code
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidJson => "INVALID_JSON",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::AlreadyAuth => "ALREADY_AUTH",
            Self::Forbidden => "FORBIDDEN",
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::NotSubscribed => "NOT_SUBSCRIBED",
            Self::RateLimited => "RATE_LIMITED",
            Self::SendFailed => "SEND_FAILED",
            Self::ReadFailed => "READ_FAILED",
            Self::UnknownType => "UNKNOWN_TYPE",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outbound frame
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    AuthOk {
        trace_id: String,
        user_id: String,
    },
    SubOk {
        trace_id: String,
        thread_id: String,
    },
    Ack {
        trace_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        client_msg_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        msg_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        seq: Option<i64>,
    },
    ReadOk {
        trace_id: String,
        thread_id: String,
        last_read_seq: i64,
    },
    Msg {
        trace_id: String,
        thread_id: String,
        msg_id: String,
        seq: i64,
        sender_id: String,
        msg_type: String,
        content: Value,
        created_at: String,
    },
    Error {
        trace_id: String,
        code: String,
        message: String,
    },
}

impl ServerFrame {
    /// Build an error frame
    #[must_use]
    pub fn error(trace_id: impl Into<String>, code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Error {
            trace_id: trace_id.into(),
            code: code.as_str().to_string(),
            message: message.into(),
        }
    }

    /// Build the bare ack used for pings
    #[must_use]
    pub fn pong(trace_id: impl Into<String>) -> Self {
        Self::Ack {
            trace_id: trace_id.into(),
            client_msg_id: None,
            msg_id: None,
            seq: None,
        }
    }

    /// Serialize to a JSON text frame
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_auth_frame() {
        let frame =
            ClientFrame::parse(r#"{"type":"auth","token":"Bearer abc","trace_id":"t1"}"#).unwrap();
        match frame {
            ClientFrame::Auth(auth) => {
                assert_eq!(auth.token, "Bearer abc");
                assert_eq!(auth.trace_id.as_deref(), Some("t1"));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_parse_msg_frame_defaults() {
        let frame = ClientFrame::parse(r#"{"type":"msg","thread_id":"t"}"#).unwrap();
        match frame {
            ClientFrame::Msg(msg) => {
                assert_eq!(msg.thread_id, "t");
                assert!(msg.client_msg_id.is_empty());
                assert!(msg.content.is_null());
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn test_parse_ping() {
        assert!(matches!(
            ClientFrame::parse(r#"{"type":"ping"}"#).unwrap(),
            ClientFrame::Ping { trace_id: None }
        ));
    }

    #[test]
    fn test_invalid_json_vs_unknown_type() {
        assert!(matches!(
            ClientFrame::parse("not json"),
            Err(FrameError::InvalidJson)
        ));
        assert!(matches!(
            ClientFrame::parse(r#"{"thread_id":"t"}"#),
            Err(FrameError::InvalidJson)
        ));
        assert!(matches!(
            ClientFrame::parse(r#"{"type":"dance"}"#),
            Err(FrameError::UnknownType(t)) if t == "dance"
        ));
    }

    #[test]
    fn test_server_frame_tags() {
        let frame = ServerFrame::AuthOk {
            trace_id: "t1".to_string(),
            user_id: "u1".to_string(),
        };
        let value: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "auth_ok");
        assert_eq!(value["trace_id"], "t1");

        let frame = ServerFrame::ReadOk {
            trace_id: "t2".to_string(),
            thread_id: "th".to_string(),
            last_read_seq: 3,
        };
        let value: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "read_ok");
    }

    #[test]
    fn test_pong_omits_msg_fields() {
        let value: Value =
            serde_json::from_str(&ServerFrame::pong("t1").to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "ack");
        assert!(value.get("client_msg_id").is_none());
        assert!(value.get("msg_id").is_none());
    }

    #[test]
    fn test_error_frame() {
        let frame = ServerFrame::error("t1", ErrorCode::RateLimited, "retry after 250ms");
        let value: Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        assert_eq!(value["type"], "error");
        assert_eq!(value["code"], "RATE_LIMITED");
        assert_eq!(json!("retry after 250ms"), value["message"]);
    }
}
