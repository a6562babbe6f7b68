//! FCM push provider
//!
//! Implements the FCM HTTP v1 API: a service-account JWT assertion is
//! exchanged for a cached OAuth bearer token, then each device token gets
//! a data-only message. No notification body is sent; the client renders
//! from local state after fetching by `{thread_id, seq, msg_id}`.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use im_common::PushConfig;

/// OAuth scope required for FCM sends
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
/// Default token endpoint for service accounts
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Refresh the cached token this long before it expires
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Push send failures
#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("push provider not configured")]
    NotConfigured,

    #[error("invalid service account: {0}")]
    Credentials(String),

    #[error("token exchange failed: {0}")]
    Auth(String),

    #[error("transport error: {0}")]
    Transport(String),
}

/// Result of a multicast send
#[derive(Debug, Clone, Copy, Default)]
pub struct SendOutcome {
    pub success_count: u32,
    pub failure_count: u32,
}

impl SendOutcome {
    /// A send only counts when every target accepted it
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failure_count == 0
    }
}

/// The provider seam the consumer drives
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Send a data-only message to every device token
    async fn send_data(
        &self,
        tokens: &[String],
        data: &HashMap<String, String>,
    ) -> Result<SendOutcome, PushError>;
}

/// Parsed FCM service account credentials
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccount {
    project_id: String,
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// FCM HTTP v1 client
pub struct FcmClient {
    http: reqwest::Client,
    account: ServiceAccount,
    signing_key: EncodingKey,
    cached: Mutex<Option<CachedToken>>,
}

impl FcmClient {
    /// Build a client from push configuration
    ///
    /// Returns `Ok(None)` when no credentials are present; the push
    /// pipeline then runs in its degraded retry/DLQ mode.
    pub fn from_config(config: &PushConfig) -> Result<Option<Self>, PushError> {
        let raw = if let Some(json) = &config.fcm_service_account_json {
            json.clone()
        } else if let Some(path) = &config.fcm_service_account_path {
            std::fs::read_to_string(path)
                .map_err(|e| PushError::Credentials(format!("read {path}: {e}")))?
        } else {
            return Ok(None);
        };

        let account: ServiceAccount = serde_json::from_str(&raw)
            .map_err(|e| PushError::Credentials(format!("parse service account: {e}")))?;
        let signing_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| PushError::Credentials(format!("private key: {e}")))?;

        Ok(Some(Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            account,
            signing_key,
            cached: Mutex::new(None),
        }))
    }

    fn token_uri(&self) -> &str {
        self.account.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI)
    }

    /// Get a bearer token, reusing the cached one until near expiry
    async fn access_token(&self) -> Result<String, PushError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_EXPIRY_MARGIN {
                return Ok(token.token.clone());
            }
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: FCM_SCOPE,
            aud: self.token_uri(),
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| PushError::Auth(format!("sign assertion: {e}")))?;

        let response = self
            .http
            .post(self.token_uri())
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(PushError::Auth(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| PushError::Auth(e.to_string()))?;

        let access = token.access_token.clone();
        *cached = Some(CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(access)
    }
}

#[async_trait]
impl PushProvider for FcmClient {
    async fn send_data(
        &self,
        tokens: &[String],
        data: &HashMap<String, String>,
    ) -> Result<SendOutcome, PushError> {
        let bearer = self.access_token().await?;
        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.account.project_id
        );

        let mut outcome = SendOutcome::default();
        for token in tokens {
            let body = serde_json::json!({
                "message": {
                    "token": token,
                    "data": data,
                }
            });
            let sent = self
                .http
                .post(&url)
                .bearer_auth(&bearer)
                .json(&body)
                .send()
                .await;
            match sent {
                Ok(response) if response.status().is_success() => outcome.success_count += 1,
                Ok(response) => {
                    tracing::debug!(status = %response.status(), "FCM rejected token");
                    outcome.failure_count += 1;
                }
                Err(e) => {
                    tracing::debug!(error = %e, "FCM send failed");
                    outcome.failure_count += 1;
                }
            }
        }
        Ok(outcome)
    }
}

impl std::fmt::Debug for FcmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FcmClient")
            .field("project_id", &self.account.project_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_credentials_yield_none() {
        let config = PushConfig {
            max_retries: 5,
            backoff_base_ms: 1_000,
            fcm_service_account_json: None,
            fcm_service_account_path: None,
        };
        assert!(FcmClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_garbage_credentials_rejected() {
        let config = PushConfig {
            max_retries: 5,
            backoff_base_ms: 1_000,
            fcm_service_account_json: Some("not json".to_string()),
            fcm_service_account_path: None,
        };
        assert!(matches!(
            FcmClient::from_config(&config),
            Err(PushError::Credentials(_))
        ));
    }

    #[test]
    fn test_send_outcome_complete_success() {
        let ok = SendOutcome {
            success_count: 2,
            failure_count: 0,
        };
        assert!(ok.is_complete_success());
        let partial = SendOutcome {
            success_count: 1,
            failure_count: 1,
        };
        assert!(!partial.is_complete_success());
    }
}
