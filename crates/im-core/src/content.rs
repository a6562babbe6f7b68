//! Image message content validation
//!
//! An `image` message must carry a content object describing an already
//! uploaded object, and the `object_key` must match the canonical layout
//! `im/<env>/<yyyy>/<mm>/<uuid>.<ext>` derived from the public URL.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::DomainError;

const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif"];

/// Rules the deployment applies to image content
#[derive(Debug, Clone)]
pub struct ImagePolicy {
    /// Public base URL that every image URL must live under
    pub public_base_url: String,
    /// Environment segment expected in the object key
    pub env_name: String,
}

impl ImagePolicy {
    /// Create a policy, normalizing the base URL and environment name
    #[must_use]
    pub fn new(public_base_url: impl Into<String>, env_name: impl Into<String>) -> Self {
        Self {
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
            env_name: sanitize_env_name(&env_name.into()),
        }
    }
}

/// Validated content of an `image` message
///
/// Fields default when absent so the checks below can name the exact
/// violation instead of failing on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageContent {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub object_key: String,
    #[serde(default)]
    pub mime: String,
    #[serde(default)]
    pub width: i32,
    #[serde(default)]
    pub height: i32,
    #[serde(default)]
    pub size: i64,
}

impl ImageContent {
    /// Parse and validate raw image content against the policy
    ///
    /// Returns the normalized content (with `object_key` derived from the
    /// URL) or an `InvalidImageContent` error naming the first violation.
    pub fn normalize(raw: &Value, policy: &ImagePolicy) -> Result<Self, DomainError> {
        if raw.is_null() {
            return Err(invalid("image content required"));
        }
        let mut content: Self = serde_json::from_value(raw.clone())
            .map_err(|_| invalid("invalid image content"))?;

        content.url = content.url.trim().to_string();
        content.object_key = content.object_key.trim().to_string();
        content.mime = content.mime.trim().to_string();

        if content.url.is_empty() || content.mime.is_empty() {
            return Err(invalid("url/mime required"));
        }
        if content.width <= 0 || content.height <= 0 || content.size <= 0 {
            return Err(invalid("width/height/size required"));
        }
        if !content.mime.starts_with("image/") {
            return Err(invalid("mime must be image/*"));
        }

        let derived_key = object_key_from_url(&content.url, &policy.public_base_url)?;
        if !content.object_key.is_empty() && content.object_key != derived_key {
            return Err(invalid("object_key mismatch"));
        }
        content.object_key = derived_key;
        validate_object_key(&content.object_key, &policy.env_name)?;

        Ok(content)
    }
}

fn invalid(reason: &str) -> DomainError {
    DomainError::InvalidImageContent(reason.to_string())
}

/// Derive the object key from a public URL
fn object_key_from_url(url: &str, public_base_url: &str) -> Result<String, DomainError> {
    if public_base_url.is_empty() {
        return Err(invalid("public base url required"));
    }
    let prefix = format!("{public_base_url}/");
    let key = url
        .strip_prefix(&prefix)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| invalid("url invalid"))?;
    Ok(key.to_string())
}

/// Check the canonical `im/<env>/<yyyy>/<mm>/<uuid>.<ext>` layout
fn validate_object_key(key: &str, env_name: &str) -> Result<(), DomainError> {
    let parts: Vec<&str> = key.split('/').collect();
    let &[prefix, env, year, month, filename] = parts.as_slice() else {
        return Err(invalid("object_key format invalid"));
    };
    if prefix != "im" {
        return Err(invalid("object_key prefix invalid"));
    }
    if env != env_name {
        return Err(invalid("object_key env invalid"));
    }
    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("object_key year invalid"));
    }
    if month.len() != 2 || !month.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid("object_key month invalid"));
    }
    let Some((stem, ext)) = filename.rsplit_once('.') else {
        return Err(invalid("object_key filename invalid"));
    };
    if stem.is_empty() || ext.is_empty() {
        return Err(invalid("object_key filename invalid"));
    }
    if Uuid::parse_str(stem).is_err() {
        return Err(invalid("object_key uuid invalid"));
    }
    if !ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) {
        return Err(invalid("object_key ext invalid"));
    }
    Ok(())
}

/// Reduce an environment name to lowercase `[a-z0-9-]`, defaulting to "dev"
#[must_use]
pub fn sanitize_env_name(env: &str) -> String {
    let clean: String = env
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();
    if clean.is_empty() {
        "dev".to_string()
    } else {
        clean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn policy() -> ImagePolicy {
        ImagePolicy::new("https://img.example.com", "dev")
    }

    fn valid_content() -> Value {
        json!({
            "url": "https://img.example.com/im/dev/2026/08/0e9f3a64-1d2c-4f6e-9a44-3a2b1c0d9e8f.jpg",
            "object_key": "",
            "mime": "image/jpeg",
            "width": 800,
            "height": 600,
            "size": 12345
        })
    }

    #[test]
    fn test_normalize_valid_content() {
        let content = ImageContent::normalize(&valid_content(), &policy()).unwrap();
        assert_eq!(
            content.object_key,
            "im/dev/2026/08/0e9f3a64-1d2c-4f6e-9a44-3a2b1c0d9e8f.jpg"
        );
    }

    #[test]
    fn test_object_key_mismatch_rejected() {
        let mut raw = valid_content();
        raw["object_key"] = json!("im/dev/2026/08/other.jpg");
        let err = ImageContent::normalize(&raw, &policy()).unwrap_err();
        assert!(err.to_string().contains("mismatch"));
    }

    #[test]
    fn test_url_outside_base_rejected() {
        let mut raw = valid_content();
        raw["url"] = json!("https://evil.example.com/im/dev/2026/08/a.jpg");
        assert!(ImageContent::normalize(&raw, &policy()).is_err());
    }

    #[test]
    fn test_non_image_mime_rejected() {
        let mut raw = valid_content();
        raw["mime"] = json!("application/pdf");
        assert!(ImageContent::normalize(&raw, &policy()).is_err());
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let mut raw = valid_content();
        raw["width"] = json!(0);
        assert!(ImageContent::normalize(&raw, &policy()).is_err());
    }

    #[test]
    fn test_bad_layout_rejected() {
        for key in [
            "other/dev/2026/08/0e9f3a64-1d2c-4f6e-9a44-3a2b1c0d9e8f.jpg",
            "im/prod/2026/08/0e9f3a64-1d2c-4f6e-9a44-3a2b1c0d9e8f.jpg",
            "im/dev/26/08/0e9f3a64-1d2c-4f6e-9a44-3a2b1c0d9e8f.jpg",
            "im/dev/2026/8/0e9f3a64-1d2c-4f6e-9a44-3a2b1c0d9e8f.jpg",
            "im/dev/2026/08/not-a-uuid.jpg",
            "im/dev/2026/08/0e9f3a64-1d2c-4f6e-9a44-3a2b1c0d9e8f.exe",
            "im/dev/2026/08/0e9f3a64-1d2c-4f6e-9a44-3a2b1c0d9e8f",
        ] {
            let mut raw = valid_content();
            raw["url"] = json!(format!("https://img.example.com/{key}"));
            assert!(
                ImageContent::normalize(&raw, &policy()).is_err(),
                "expected rejection for {key}"
            );
        }
    }

    #[test]
    fn test_null_content_rejected() {
        assert!(ImageContent::normalize(&Value::Null, &policy()).is_err());
    }

    #[test]
    fn test_sanitize_env_name() {
        assert_eq!(sanitize_env_name("Prod"), "prod");
        assert_eq!(sanitize_env_name("stage-2"), "stage-2");
        assert_eq!(sanitize_env_name("  "), "dev");
        assert_eq!(sanitize_env_name("a_b!c"), "abc");
    }
}
