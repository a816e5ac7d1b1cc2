//! PostgreSQL implementation of MessageRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use chat_core::entities::{Message, ThreadedMessage};
use chat_core::error::DomainError;
use chat_core::traits::{MessageRepository, RepoResult};
use chat_core::value_objects::Snowflake;

use crate::mappers::MessageInsert;
use crate::models::{MessageModel, ThreadedMessageModel};

use super::error::{map_db_error, map_insert_error};

#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    #[instrument(skip(self))]
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>> {
        let result = sqlx::query_as::<_, MessageModel>(
            r#"
            SELECT id, channel_id, parent_id, author_id, content, created_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id.into_inner())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Message::from))
    }

    #[instrument(skip(self))]
    async fn find_top_level(&self, channel_id: Snowflake) -> RepoResult<Vec<ThreadedMessage>> {
        let results = sqlx::query_as::<_, ThreadedMessageModel>(
            r#"
            SELECT m.id, m.channel_id, m.parent_id, m.author_id, m.content, m.created_at,
                   (SELECT COUNT(*) FROM messages r WHERE r.parent_id = m.id) AS thread_count
            FROM messages m
            WHERE m.channel_id = $1 AND m.parent_id IS NULL
            ORDER BY m.created_at ASC, m.id ASC
            "#,
        )
        .bind(channel_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(ThreadedMessage::from).collect())
    }

    #[instrument(skip(self))]
    async fn find_replies(&self, parent_id: Snowflake) -> RepoResult<Vec<Message>> {
        let results = sqlx::query_as::<_, MessageModel>(
            r#"
            SELECT id, channel_id, parent_id, author_id, content, created_at
            FROM messages
            WHERE parent_id = $1
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(parent_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(Message::from).collect())
    }

    #[instrument(skip(self, message), fields(message_id = %message.id))]
    async fn create(&self, message: &Message) -> RepoResult<()> {
        let insert = MessageInsert::new(message);

        sqlx::query(
            r#"
            INSERT INTO messages (id, channel_id, parent_id, author_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(insert.id)
        .bind(insert.channel_id)
        .bind(insert.parent_id)
        .bind(insert.author_id)
        .bind(insert.content)
        .bind(insert.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(
                e,
                || DomainError::InternalError(format!("duplicate message id {}", message.id)),
                || DomainError::ParentNotFound(message.parent_id.unwrap_or(message.id)),
            )
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: Snowflake) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id.into_inner())
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn count_replies(&self, parent_id: Snowflake) -> RepoResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM messages WHERE parent_id = $1")
            .bind(parent_id.into_inner())
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)
    }
}
