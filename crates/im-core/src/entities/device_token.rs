//! Device token entity - the push target registry (read-only to the core)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Push platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Android => write!(f, "android"),
        }
    }
}

/// A registered push target for a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceToken {
    pub user_id: String,
    pub platform: Platform,
    pub token: String,
    pub updated_at: DateTime<Utc>,
}
