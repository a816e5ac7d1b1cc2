//! Repository traits (ports) - define the interface for data access
//!
//! The store behind these traits owns message and reaction rows. Its
//! uniqueness constraint on `(user_id, message_id, emoji)` is what keeps
//! concurrent reaction toggles from producing duplicate rows.

use async_trait::async_trait;

use crate::entities::{EmojiCount, Message, Reaction, ThreadedMessage};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Message Repository
// ============================================================================

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find message by ID
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>>;

    /// Top-level messages of a channel, oldest first, with reply counts
    async fn find_top_level(&self, channel_id: Snowflake) -> RepoResult<Vec<ThreadedMessage>>;

    /// Replies under `parent_id`, oldest first
    async fn find_replies(&self, parent_id: Snowflake) -> RepoResult<Vec<Message>>;

    /// Insert a message. Fails with `ParentNotFound` if the parent row is gone.
    async fn create(&self, message: &Message) -> RepoResult<()>;

    /// Hard-delete a message; replies and reactions go with it.
    /// Returns whether a row was removed.
    async fn delete(&self, id: Snowflake) -> RepoResult<bool>;

    /// Count messages whose parent is `parent_id`
    async fn count_replies(&self, parent_id: Snowflake) -> RepoResult<i64>;
}

// ============================================================================
// Reaction Repository
// ============================================================================

#[async_trait]
pub trait ReactionRepository: Send + Sync {
    /// Find reaction by message, user, and emoji
    async fn find(
        &self,
        message_id: Snowflake,
        user_id: Snowflake,
        emoji: &str,
    ) -> RepoResult<Option<Reaction>>;

    /// Insert a reaction.
    ///
    /// Fails with `ReactionAlreadyExists` when the triple is already present
    /// and `MessageNotFound` when the message row is gone.
    async fn create(&self, reaction: &Reaction) -> RepoResult<()>;

    /// Remove a reaction. Returns whether a row was removed.
    async fn delete(&self, message_id: Snowflake, user_id: Snowflake, emoji: &str)
        -> RepoResult<bool>;

    /// Group a message's reactions by emoji, flagging those `viewer_id` made
    async fn count_by_emoji(
        &self,
        message_id: Snowflake,
        viewer_id: Snowflake,
    ) -> RepoResult<Vec<EmojiCount>>;
}
