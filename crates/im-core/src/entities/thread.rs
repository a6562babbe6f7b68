//! Thread entity - a conversation scoped to a matching session or an order

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Business context a thread is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadType {
    /// Conversation for a matching session
    Match,
    /// Conversation for an order
    Order,
}

impl ThreadType {
    /// Default message retention in days for this thread type
    #[must_use]
    pub fn default_retention_days(&self) -> i32 {
        match self {
            Self::Match => 14,
            Self::Order => 180,
        }
    }
}

impl std::fmt::Display for ThreadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Match => write!(f, "match"),
            Self::Order => write!(f, "order"),
        }
    }
}

impl std::str::FromStr for ThreadType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "match" => Ok(Self::Match),
            "order" => Ok(Self::Order),
            other => Err(format!("invalid thread type: {other}")),
        }
    }
}

/// Thread lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Active,
    Archived,
}

impl std::fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Archived => write!(f, "archived"),
        }
    }
}

impl std::str::FromStr for ThreadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "archived" => Ok(Self::Archived),
            other => Err(format!("invalid thread status: {other}")),
        }
    }
}

/// Thread entity
///
/// `last_seq` is the per-thread monotonic sequence counter: for every message
/// in the thread, `message.seq <= last_seq`, and the seq values form the
/// gap-free range `1..=last_seq`. Exactly one of `match_session_id` /
/// `order_id` is set, according to `kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thread {
    pub id: Uuid,
    pub kind: ThreadType,
    pub status: ThreadStatus,
    pub match_session_id: Option<String>,
    pub order_id: Option<String>,
    pub last_seq: i64,
    pub last_message_at: Option<DateTime<Utc>>,
    pub retention_days: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Check whether the thread accepts new messages
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == ThreadStatus::Active
    }

    /// The business-context identifier this thread is bound to
    #[must_use]
    pub fn context_id(&self) -> Option<&str> {
        match self.kind {
            ThreadType::Match => self.match_session_id.as_deref(),
            ThreadType::Order => self.order_id.as_deref(),
        }
    }
}

/// Role of a member within a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Traveler,
    Host,
}

impl std::fmt::Display for MemberRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Traveler => write!(f, "traveler"),
            Self::Host => write!(f, "host"),
        }
    }
}

impl std::str::FromStr for MemberRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "traveler" => Ok(Self::Traveler),
            "host" => Ok(Self::Host),
            other => Err(format!("invalid member role: {other}")),
        }
    }
}

/// Membership record for a thread
///
/// `last_read_seq` only moves forward (writes take the max of the stored and
/// submitted value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadMember {
    pub thread_id: Uuid,
    pub user_id: String,
    pub role: MemberRole,
    pub last_read_seq: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_type_parse_roundtrip() {
        assert_eq!("match".parse::<ThreadType>().unwrap(), ThreadType::Match);
        assert_eq!("order".parse::<ThreadType>().unwrap(), ThreadType::Order);
        assert!("group".parse::<ThreadType>().is_err());
        assert_eq!(ThreadType::Order.to_string(), "order");
    }

    #[test]
    fn test_default_retention() {
        assert_eq!(ThreadType::Match.default_retention_days(), 14);
        assert_eq!(ThreadType::Order.default_retention_days(), 180);
    }

    #[test]
    fn test_thread_context_id() {
        let thread = Thread {
            id: Uuid::new_v4(),
            kind: ThreadType::Match,
            status: ThreadStatus::Active,
            match_session_id: Some("ms_1".to_string()),
            order_id: None,
            last_seq: 0,
            last_message_at: None,
            retention_days: 14,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(thread.is_active());
        assert_eq!(thread.context_id(), Some("ms_1"));
    }

    #[test]
    fn test_member_role_parse() {
        assert_eq!("host".parse::<MemberRole>().unwrap(), MemberRole::Host);
        assert!("admin".parse::<MemberRole>().is_err());
    }
}
