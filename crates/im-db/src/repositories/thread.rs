//! PostgreSQL implementation of ThreadRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use im_core::traits::{EnsureThread, RepoResult, ThreadRepository};
use im_core::{DomainError, Thread, ThreadMember, ThreadType};

use crate::models::{ThreadMemberModel, ThreadModel};

use super::map_db_error;

/// PostgreSQL implementation of ThreadRepository
#[derive(Clone)]
pub struct PgThreadRepository {
    pool: PgPool,
}

impl PgThreadRepository {
    /// Create a new PgThreadRepository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ThreadRepository for PgThreadRepository {
    #[instrument(skip(self, spec), fields(kind = %spec.kind))]
    async fn ensure(&self, spec: &EnsureThread) -> RepoResult<Thread> {
        let mut tx = self.pool.begin().await.map_err(map_db_error)?;

        let retention_days = spec.kind.default_retention_days();
        let row = match spec.kind {
            ThreadType::Match => {
                let context = spec
                    .match_session_id
                    .as_deref()
                    .ok_or_else(|| DomainError::Validation("match_session_id required".into()))?;
                sqlx::query_as::<_, ThreadModel>(
                    r#"
                    INSERT INTO chat_threads (type, match_session_id, retention_days)
                    VALUES ('match', $1, $2)
                    ON CONFLICT (match_session_id)
                    DO UPDATE SET updated_at = now()
                    RETURNING id, type, status, match_session_id, order_id, last_seq,
                              last_message_at, retention_days, created_at, updated_at
                    "#,
                )
                .bind(context)
                .bind(retention_days)
                .fetch_one(&mut *tx)
                .await
            }
            ThreadType::Order => {
                let context = spec
                    .order_id
                    .as_deref()
                    .ok_or_else(|| DomainError::Validation("order_id required".into()))?;
                sqlx::query_as::<_, ThreadModel>(
                    r#"
                    INSERT INTO chat_threads (type, order_id, retention_days)
                    VALUES ('order', $1, $2)
                    ON CONFLICT (order_id)
                    DO UPDATE SET updated_at = now()
                    RETURNING id, type, status, match_session_id, order_id, last_seq,
                              last_message_at, retention_days, created_at, updated_at
                    "#,
                )
                .bind(context)
                .bind(retention_days)
                .fetch_one(&mut *tx)
                .await
            }
        }
        .map_err(map_db_error)?;

        for member in &spec.members {
            sqlx::query(
                r#"
                INSERT INTO chat_thread_members (thread_id, user_id, role)
                VALUES ($1, $2, $3)
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(row.id)
            .bind(&member.user_id)
            .bind(member.role.to_string())
            .execute(&mut *tx)
            .await
            .map_err(map_db_error)?;
        }

        tx.commit().await.map_err(map_db_error)?;
        row.into_entity()
    }

    #[instrument(skip(self))]
    async fn find_for_member(&self, thread_id: Uuid, user_id: &str) -> RepoResult<Option<Thread>> {
        let row = sqlx::query_as::<_, ThreadModel>(
            r#"
            SELECT t.id, t.type, t.status, t.match_session_id, t.order_id, t.last_seq,
                   t.last_message_at, t.retention_days, t.created_at, t.updated_at
            FROM chat_threads t
            JOIN chat_thread_members m ON m.thread_id = t.id
            WHERE t.id = $1 AND m.user_id = $2
            "#,
        )
        .bind(thread_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(ThreadModel::into_entity).transpose()
    }

    #[instrument(skip(self))]
    async fn is_member(&self, thread_id: Uuid, user_id: &str) -> RepoResult<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM chat_thread_members
                WHERE thread_id = $1 AND user_id = $2
            )
            "#,
        )
        .bind(thread_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(exists)
    }

    #[instrument(skip(self))]
    async fn member(&self, thread_id: Uuid, user_id: &str) -> RepoResult<Option<ThreadMember>> {
        let row = sqlx::query_as::<_, ThreadMemberModel>(
            r#"
            SELECT thread_id, user_id, role, last_read_seq
            FROM chat_thread_members
            WHERE thread_id = $1 AND user_id = $2
            "#,
        )
        .bind(thread_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        row.map(ThreadMemberModel::into_entity).transpose()
    }

    #[instrument(skip(self))]
    async fn advance_read_cursor(
        &self,
        thread_id: Uuid,
        user_id: &str,
        last_read_seq: i64,
    ) -> RepoResult<()> {
        // greatest() keeps the cursor monotonic under out-of-order updates
        let result = sqlx::query(
            r#"
            UPDATE chat_thread_members
            SET last_read_seq = GREATEST(last_read_seq, $1)
            WHERE thread_id = $2 AND user_id = $3
            "#,
        )
        .bind(last_read_seq)
        .bind(thread_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotAMember);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn member_ids_excluding(
        &self,
        thread_id: Uuid,
        user_id: &str,
    ) -> RepoResult<Vec<String>> {
        let ids: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT user_id
            FROM chat_thread_members
            WHERE thread_id = $1 AND user_id <> $2
            "#,
        )
        .bind(thread_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PgThreadRepository>();
    }
}
