//! PostgreSQL implementation of MessageRepository
//!
//! The write path is the ordering and idempotency core: one transaction
//! bumps `chat_threads.last_seq` and inserts the message with the returned
//! value, so seq values are gap-free and totally ordered per thread. The
//! `UPDATE ... RETURNING` row lock serializes concurrent writers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use tracing::instrument;
use uuid::Uuid;

use im_core::traits::{AppendOutcome, MessageQuery, MessageRepository, RepoResult};
use im_core::{DomainError, Message, MessageReceipt, NewMessage, ThreadStatus};

use crate::models::MessageModel;

use super::{is_unique_violation, map_db_error};

/// PostgreSQL implementation of MessageRepository
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    /// Create a new PgMessageRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up the receipt of an existing `(sender_id, client_msg_id)` row
    async fn find_receipt_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        sender_id: &str,
        client_msg_id: &str,
    ) -> RepoResult<Option<MessageReceipt>> {
        let row = sqlx::query_as::<_, (Uuid, i64, DateTime<Utc>)>(
            r#"
            SELECT id, seq, created_at
            FROM chat_messages
            WHERE sender_id = $1 AND client_msg_id = $2
            LIMIT 1
            "#,
        )
        .bind(sender_id)
        .bind(client_msg_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(|(msg_id, seq, created_at)| MessageReceipt {
            msg_id,
            seq,
            created_at,
        }))
    }

    /// Same lookup against the pool, used after a lost insert race
    async fn find_receipt(
        &self,
        sender_id: &str,
        client_msg_id: &str,
    ) -> RepoResult<Option<MessageReceipt>> {
        let row = sqlx::query_as::<_, (Uuid, i64, DateTime<Utc>)>(
            r#"
            SELECT id, seq, created_at
            FROM chat_messages
            WHERE sender_id = $1 AND client_msg_id = $2
            LIMIT 1
            "#,
        )
        .bind(sender_id)
        .bind(client_msg_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(row.map(|(msg_id, seq, created_at)| MessageReceipt {
            msg_id,
            seq,
            created_at,
        }))
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self, message), fields(thread_id = %message.thread_id))]
    async fn append(&self, message: &NewMessage) -> RepoResult<AppendOutcome> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        // Idempotent replay: a known client_msg_id returns the original
        // receipt without touching the seq counter.
        if let Some(receipt) =
            Self::find_receipt_in_tx(&mut tx, &message.sender_id, &message.client_msg_id).await?
        {
            tx.commit().await.map_err(map_db_error)?;
            return Ok(AppendOutcome {
                receipt,
                replayed: true,
            });
        }

        // Membership and thread state, through the member join: a
        // non-member cannot distinguish a missing thread from one they are
        // not in.
        let status: Option<String> = sqlx::query_scalar(
            r#"
            SELECT t.status
            FROM chat_threads t
            JOIN chat_thread_members m ON m.thread_id = t.id
            WHERE t.id = $1 AND m.user_id = $2
            "#,
        )
        .bind(message.thread_id)
        .bind(&message.sender_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let status = status.ok_or(DomainError::NotAMember)?;
        if status.parse::<ThreadStatus>().map_err(DomainError::Internal)? != ThreadStatus::Active {
            return Err(DomainError::ThreadInactive);
        }

        // Seq allocation; the row lock taken here serializes writers on
        // this thread until commit.
        let seq: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE chat_threads
            SET last_seq = last_seq + 1,
                last_message_at = now(),
                updated_at = now()
            WHERE id = $1 AND status = 'active'
            RETURNING last_seq
            "#,
        )
        .bind(message.thread_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_db_error)?;

        let seq = seq.ok_or(DomainError::SeqAllocationFailed)?;

        let inserted = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
            INSERT INTO chat_messages (thread_id, sender_id, client_msg_id, seq, type, content)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, created_at
            "#,
        )
        .bind(message.thread_id)
        .bind(&message.sender_id)
        .bind(&message.client_msg_id)
        .bind(seq)
        .bind(message.kind.to_string())
        .bind(&message.content)
        .fetch_one(&mut *tx)
        .await;

        match inserted {
            Ok((msg_id, created_at)) => {
                tx.commit().await.map_err(map_db_error)?;
                Ok(AppendOutcome {
                    receipt: MessageReceipt {
                        msg_id,
                        seq,
                        created_at,
                    },
                    replayed: false,
                })
            }
            Err(e) if is_unique_violation(&e) => {
                // A concurrent replay won the race. Rolling back releases
                // the seq allocation; the winner's row is the answer.
                tx.rollback().await.map_err(map_db_error)?;
                let receipt = self
                    .find_receipt(&message.sender_id, &message.client_msg_id)
                    .await?
                    .ok_or_else(|| {
                        DomainError::Internal("unique violation without winner row".to_string())
                    })?;
                Ok(AppendOutcome {
                    receipt,
                    replayed: true,
                })
            }
            Err(e) => Err(map_db_error(e)),
        }
    }

    #[instrument(skip(self, query))]
    async fn list(&self, thread_id: Uuid, query: &MessageQuery) -> RepoResult<Vec<Message>> {
        let limit = query.limit.clamp(1, 200);

        let rows = match (query.after_seq, query.before_seq) {
            (Some(after), None) => {
                sqlx::query_as::<_, MessageModel>(
                    r#"
                    SELECT id, thread_id, sender_id, client_msg_id, seq, type, content, created_at
                    FROM chat_messages
                    WHERE thread_id = $1 AND created_at >= $2 AND seq > $3
                    ORDER BY seq DESC
                    LIMIT $4
                    "#,
                )
                .bind(thread_id)
                .bind(query.not_before)
                .bind(after)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            (None, Some(before)) => {
                sqlx::query_as::<_, MessageModel>(
                    r#"
                    SELECT id, thread_id, sender_id, client_msg_id, seq, type, content, created_at
                    FROM chat_messages
                    WHERE thread_id = $1 AND created_at >= $2 AND seq < $3
                    ORDER BY seq DESC
                    LIMIT $4
                    "#,
                )
                .bind(thread_id)
                .bind(query.not_before)
                .bind(before)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            (Some(after), Some(before)) => {
                sqlx::query_as::<_, MessageModel>(
                    r#"
                    SELECT id, thread_id, sender_id, client_msg_id, seq, type, content, created_at
                    FROM chat_messages
                    WHERE thread_id = $1 AND created_at >= $2 AND seq > $3 AND seq < $4
                    ORDER BY seq DESC
                    LIMIT $5
                    "#,
                )
                .bind(thread_id)
                .bind(query.not_before)
                .bind(after)
                .bind(before)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
            (None, None) => {
                sqlx::query_as::<_, MessageModel>(
                    r#"
                    SELECT id, thread_id, sender_id, client_msg_id, seq, type, content, created_at
                    FROM chat_messages
                    WHERE thread_id = $1 AND created_at >= $2
                    ORDER BY seq DESC
                    LIMIT $3
                    "#,
                )
                .bind(thread_id)
                .bind(query.not_before)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(map_db_error)?;

        // Newest page first from the store, ascending seq to the caller
        let mut messages = rows
            .into_iter()
            .map(MessageModel::into_entity)
            .collect::<Result<Vec<_>, _>>()?;
        messages.reverse();
        Ok(messages)
    }

    #[instrument(skip(self))]
    async fn min_visible_seq(
        &self,
        thread_id: Uuid,
        not_before: DateTime<Utc>,
    ) -> RepoResult<i64> {
        let min_seq: i64 = sqlx::query_scalar(
            r#"
            SELECT COALESCE(MIN(seq), 0)
            FROM chat_messages
            WHERE thread_id = $1 AND created_at >= $2
            "#,
        )
        .bind(thread_id)
        .bind(not_before)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(min_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgMessageRepository>();
    }
}
