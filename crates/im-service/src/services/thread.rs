//! Thread service - permission checks, read cursors, ensure, and history

use chrono::{Duration, Utc};
use uuid::Uuid;

use im_core::traits::{EnsureThread, MessageQuery};
use im_core::{DomainError, Message, Thread, ThreadType};

use crate::dto::EnsureThreadRequest;

use super::{ServiceContext, ServiceError, ServiceResult};

/// A retention-windowed page of thread history
#[derive(Debug, Clone)]
pub struct MessageHistory {
    pub messages: Vec<Message>,
    /// True when older messages existed but have aged out of retention
    pub truncated: bool,
    /// Smallest seq still readable on the server (0 when empty)
    pub server_min_seq: i64,
}

/// Thread operations service
#[derive(Clone)]
pub struct ThreadService {
    ctx: ServiceContext,
}

impl ThreadService {
    /// Create a new thread service
    #[must_use]
    pub fn new(ctx: ServiceContext) -> Self {
        Self { ctx }
    }

    /// Check that `user_id` is a member of the thread
    pub async fn check_permission(&self, thread_id: Uuid, user_id: &str) -> ServiceResult<()> {
        if self.ctx.threads().is_member(thread_id, user_id).await? {
            Ok(())
        } else {
            Err(DomainError::NotAMember.into())
        }
    }

    /// Advance the member's read cursor; returns the submitted value
    pub async fn mark_read(
        &self,
        thread_id: Uuid,
        user_id: &str,
        last_read_seq: i64,
    ) -> ServiceResult<i64> {
        if last_read_seq < 0 {
            return Err(ServiceError::validation("last_read_seq must be >= 0"));
        }
        self.ctx
            .threads()
            .advance_read_cursor(thread_id, user_id, last_read_seq)
            .await?;
        Ok(last_read_seq)
    }

    /// Idempotently create the thread for a business context
    ///
    /// The requester must appear in the member list; the catalog contract
    /// does not let a user conjure threads they are not part of.
    pub async fn ensure(
        &self,
        requester_id: &str,
        request: EnsureThreadRequest,
    ) -> ServiceResult<Thread> {
        match request.kind {
            ThreadType::Match if request.match_session_id.is_none() => {
                return Err(ServiceError::validation("match_session_id required"));
            }
            ThreadType::Order if request.order_id.is_none() => {
                return Err(ServiceError::validation("order_id required"));
            }
            _ => {}
        }
        if request.members.len() < 2 {
            return Err(ServiceError::validation("at least two members required"));
        }
        if request.members.iter().any(|m| m.user_id.is_empty()) {
            return Err(ServiceError::validation("member user_id required"));
        }
        if !request.members.iter().any(|m| m.user_id == requester_id) {
            return Err(DomainError::NotAMember.into());
        }

        let spec = EnsureThread {
            kind: request.kind,
            match_session_id: request.match_session_id,
            order_id: request.order_id,
            members: request
                .members
                .into_iter()
                .map(|m| im_core::traits::NewThreadMember {
                    user_id: m.user_id,
                    role: m.role,
                })
                .collect(),
        };
        Ok(self.ctx.threads().ensure(&spec).await?)
    }

    /// Page through a thread's history inside its retention window
    pub async fn history(
        &self,
        thread_id: Uuid,
        user_id: &str,
        after_seq: Option<i64>,
        before_seq: Option<i64>,
        limit: i64,
    ) -> ServiceResult<MessageHistory> {
        let thread = self
            .ctx
            .threads()
            .find_for_member(thread_id, user_id)
            .await?
            .ok_or(DomainError::NotAMember)?;

        let retention_days = if thread.retention_days > 0 {
            thread.retention_days
        } else {
            match thread.kind {
                ThreadType::Match => self.ctx.config().retention.match_days,
                ThreadType::Order => self.ctx.config().retention.order_days,
            }
        };
        let not_before = Utc::now() - Duration::days(i64::from(retention_days));

        let query = MessageQuery {
            after_seq,
            before_seq,
            limit,
            not_before,
        };
        let messages = self.ctx.messages().list(thread_id, &query).await?;
        let server_min_seq = self
            .ctx
            .messages()
            .min_visible_seq(thread_id, not_before)
            .await?;

        Ok(MessageHistory {
            messages,
            truncated: thread.last_seq > 0 && server_min_seq > 1,
            server_min_seq,
        })
    }
}
