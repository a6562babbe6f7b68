//! HTTP client for the API
//!
//! The gateway acts on the user's behalf: every call forwards the user's
//! bearer token and parses the standard
//! `{success, data?, code?, message?, traceId}` envelope.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Request timeout for calls into the API
const API_TIMEOUT: Duration = Duration::from_secs(8);

/// API call failures
#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    /// The API answered with `success: false`
    #[error("{message}")]
    Api { code: String, message: String },

    /// The request never completed
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The body did not match the envelope contract
    #[error("invalid response from api")]
    InvalidResponse,
}

impl ApiClientError {
    /// The API-level error code, when the call got that far
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// Body of a bridged message send
#[derive(Debug, Clone, Serialize)]
pub struct SendMessageBody {
    pub thread_id: String,
    pub client_msg_id: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    pub content: Value,
}

/// The receipt returned by `POST /v1/messages`
#[derive(Debug, Clone, Deserialize)]
pub struct MessageReceiptDto {
    pub msg_id: String,
    pub seq: i64,
    pub created_at: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    success: bool,
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// HTTP client for the API consumed by the gateway
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `GET /v1/threads/{id}/permission`
    pub async fn check_permission(
        &self,
        token: &str,
        thread_id: &str,
    ) -> Result<(), ApiClientError> {
        self.request(
            Method::GET,
            &format!("/v1/threads/{thread_id}/permission"),
            token,
            None,
        )
        .await?;
        Ok(())
    }

    /// `POST /v1/messages`
    pub async fn create_message(
        &self,
        token: &str,
        body: &SendMessageBody,
    ) -> Result<MessageReceiptDto, ApiClientError> {
        let data = self
            .request(
                Method::POST,
                "/v1/messages",
                token,
                Some(serde_json::to_value(body).map_err(|_| ApiClientError::InvalidResponse)?),
            )
            .await?;
        serde_json::from_value(data).map_err(|_| ApiClientError::InvalidResponse)
    }

    /// `POST /v1/threads/{id}/read`
    pub async fn update_read(
        &self,
        token: &str,
        thread_id: &str,
        last_read_seq: i64,
    ) -> Result<(), ApiClientError> {
        self.request(
            Method::POST,
            &format!("/v1/threads/{thread_id}/read"),
            token,
            Some(serde_json::json!({ "last_read_seq": last_read_seq })),
        )
        .await?;
        Ok(())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        token: &str,
        body: Option<Value>,
    ) -> Result<Value, ApiClientError> {
        let mut request = self
            .http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let envelope: Envelope = request.send().await?.json().await?;
        if !envelope.success {
            return Err(ApiClientError::Api {
                code: envelope.code.unwrap_or_else(|| "SERVER_ERROR".to_string()),
                message: envelope
                    .message
                    .unwrap_or_else(|| "api request failed".to_string()),
            });
        }
        Ok(envelope.data.unwrap_or(Value::Null))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ApiClient::new("http://localhost:8090/");
        assert_eq!(client.base_url, "http://localhost:8090");
    }

    #[test]
    fn test_envelope_error_code() {
        let err = ApiClientError::Api {
            code: "FORBIDDEN".to_string(),
            message: "not a member".to_string(),
        };
        assert_eq!(err.code(), Some("FORBIDDEN"));
        assert_eq!(err.to_string(), "not a member");
    }

    #[test]
    fn test_send_body_serializes_type_field() {
        let body = SendMessageBody {
            thread_id: "t".to_string(),
            client_msg_id: "c".to_string(),
            msg_type: "text".to_string(),
            content: serde_json::json!({"text": "hi"}),
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["type"], "text");
        assert!(value.get("msg_type").is_none());
    }
}
