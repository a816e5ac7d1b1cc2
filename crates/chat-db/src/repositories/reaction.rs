//! PostgreSQL implementation of ReactionRepository

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;

use chat_core::entities::{EmojiCount, Reaction};
use chat_core::error::DomainError;
use chat_core::traits::{ReactionRepository, RepoResult};
use chat_core::value_objects::Snowflake;

use crate::mappers::ReactionInsert;
use crate::models::{EmojiCountModel, ReactionModel};

use super::error::{map_db_error, map_insert_error};

#[derive(Clone)]
pub struct PgReactionRepository {
    pool: PgPool,
}

impl PgReactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReactionRepository for PgReactionRepository {
    #[instrument(skip(self))]
    async fn find(
        &self,
        message_id: Snowflake,
        user_id: Snowflake,
        emoji: &str,
    ) -> RepoResult<Option<Reaction>> {
        let result = sqlx::query_as::<_, ReactionModel>(
            r#"
            SELECT message_id, user_id, emoji, created_at
            FROM reactions
            WHERE message_id = $1 AND user_id = $2 AND emoji = $3
            "#,
        )
        .bind(message_id.into_inner())
        .bind(user_id.into_inner())
        .bind(emoji)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.map(Reaction::from))
    }

    #[instrument(skip(self, reaction), fields(message_id = %reaction.message_id, user_id = %reaction.user_id))]
    async fn create(&self, reaction: &Reaction) -> RepoResult<()> {
        let insert = ReactionInsert::new(reaction);

        sqlx::query(
            r#"
            INSERT INTO reactions (message_id, user_id, emoji, created_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(insert.message_id)
        .bind(insert.user_id)
        .bind(insert.emoji)
        .bind(reaction.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            map_insert_error(
                e,
                || DomainError::ReactionAlreadyExists,
                || DomainError::MessageNotFound(reaction.message_id),
            )
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(
        &self,
        message_id: Snowflake,
        user_id: Snowflake,
        emoji: &str,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM reactions
            WHERE message_id = $1 AND user_id = $2 AND emoji = $3
            "#,
        )
        .bind(message_id.into_inner())
        .bind(user_id.into_inner())
        .bind(emoji)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn count_by_emoji(
        &self,
        message_id: Snowflake,
        viewer_id: Snowflake,
    ) -> RepoResult<Vec<EmojiCount>> {
        let results = sqlx::query_as::<_, EmojiCountModel>(
            r#"
            SELECT emoji,
                   COUNT(*) AS count,
                   BOOL_OR(user_id = $2) AS reacted
            FROM reactions
            WHERE message_id = $1
            GROUP BY emoji
            "#,
        )
        .bind(message_id.into_inner())
        .bind(viewer_id.into_inner())
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_error)?;

        Ok(results.into_iter().map(EmojiCount::from).collect())
    }
}
