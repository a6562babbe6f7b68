//! JWT verification for bearer tokens
//!
//! The core only verifies tokens: HMAC-SHA256 with a shared secret, subject
//! claim required. Issuing lives with the external token issuer; `issue` is
//! kept for tests and tooling.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// JWT service for verifying bearer tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    configured: bool,
}

impl JwtService {
    /// Create a new JWT service with the shared secret
    ///
    /// An empty secret leaves the service unconfigured; every verification
    /// then fails with `AuthInvalid`.
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            configured: !secret.is_empty(),
        }
    }

    /// Verify a token and return its claims
    ///
    /// # Errors
    /// Returns `AuthInvalid` if the signature, expiry, or subject is bad.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        if !self.configured || token.is_empty() {
            return Err(AppError::AuthInvalid);
        }
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| AppError::AuthInvalid)?;
        if data.claims.sub.is_empty() {
            return Err(AppError::AuthInvalid);
        }
        Ok(data.claims)
    }

    /// Verify a token and return the subject (user id)
    pub fn verify_subject(&self, token: &str) -> Result<String, AppError> {
        Ok(self.verify(token)?.sub)
    }

    /// Issue a token for a subject (tests and tooling only)
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn issue(&self, sub: &str, ttl_seconds: i64) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: sub.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::seconds(ttl_seconds)).timestamp(),
        };
        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(anyhow::anyhow!("failed to encode JWT: {e}")))
    }
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("configured", &self.configured)
            .finish_non_exhaustive()
    }
}

/// Strip an optional `Bearer ` prefix from a raw token value
#[must_use]
pub fn extract_bearer(raw: &str) -> &str {
    let raw = raw.trim();
    match raw.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => token.trim(),
        _ => raw,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_service() -> JwtService {
        JwtService::new("test-secret-key-that-is-long-enough")
    }

    #[test]
    fn test_verify_issued_token() {
        let service = create_test_service();
        let token = service.issue("u_123", 900).unwrap();
        let claims = service.verify(&token).unwrap();
        assert_eq!(claims.sub, "u_123");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_verify_subject() {
        let service = create_test_service();
        let token = service.issue("u_9", 900).unwrap();
        assert_eq!(service.verify_subject(&token).unwrap(), "u_9");
    }

    #[test]
    fn test_garbage_token_rejected() {
        let service = create_test_service();
        assert!(matches!(
            service.verify("not.a.token"),
            Err(AppError::AuthInvalid)
        ));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtService::new("secret-a");
        let verifier = JwtService::new("secret-b");
        let token = issuer.issue("u_1", 900).unwrap();
        assert!(verifier.verify(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let service = create_test_service();
        let token = service.issue("u_1", -120).unwrap();
        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn test_unconfigured_service_rejects_everything() {
        let service = JwtService::new("");
        let other = create_test_service();
        let token = other.issue("u_1", 900).unwrap();
        assert!(service.verify(&token).is_err());
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer("Bearer abc"), "abc");
        assert_eq!(extract_bearer("bearer abc"), "abc");
        assert_eq!(extract_bearer("abc"), "abc");
        assert_eq!(extract_bearer("  Bearer   abc "), "abc");
        assert_eq!(extract_bearer(""), "");
    }
}
