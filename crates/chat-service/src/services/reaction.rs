//! Reaction service
//!
//! The toggle engine: flips one user's reaction with one emoji on one message
//! and publishes the recomputed tally on the message's reaction topic.
//!
//! The store's unique constraint on `(user_id, message_id, emoji)` is the
//! only serialization point. Two concurrent "add" toggles for the same triple
//! both observe no row; one insert wins and the other hits the constraint,
//! which is treated as success because the requested state already holds.

use chat_core::{
    DomainError, Reaction, ReactionTally, ReactionsUpdatedPayload, RealtimeEvent, Snowflake,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Which way a toggle flipped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleStatus {
    Added,
    Removed,
}

/// Reaction service
pub struct ReactionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ReactionService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Toggle `user_id`'s `emoji` reaction on `message_id`.
    ///
    /// Publishes at most one `REACTIONS_UPDATED` per call: exactly one when
    /// the tally recount succeeds. Nothing is published when the emoji is
    /// rejected or the message is gone.
    #[instrument(skip(self))]
    pub async fn toggle(
        &self,
        user_id: Snowflake,
        message_id: Snowflake,
        emoji: &str,
    ) -> ServiceResult<ToggleStatus> {
        if !Reaction::is_allowed(emoji) {
            return Err(DomainError::EmojiNotAllowed(emoji.to_string()).into());
        }

        self.require_message(message_id).await?;

        let repo = self.ctx.reaction_repo();
        let status = if repo.find(message_id, user_id, emoji).await?.is_some() {
            // A concurrent removal may have beaten us to it; the row is gone
            // either way.
            if !repo.delete(message_id, user_id, emoji).await? {
                debug!(message_id = %message_id, user_id = %user_id, "Reaction already removed");
            }
            ToggleStatus::Removed
        } else {
            let reaction = Reaction::new(message_id, user_id, emoji.to_string());
            match repo.create(&reaction).await {
                Ok(()) => {}
                Err(DomainError::ReactionAlreadyExists) => {
                    debug!(message_id = %message_id, user_id = %user_id, "Reaction inserted concurrently");
                }
                Err(DomainError::MessageNotFound(_)) => {
                    return Err(ServiceError::not_found("Message", message_id.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
            ToggleStatus::Added
        };

        info!(
            message_id = %message_id,
            user_id = %user_id,
            emoji = %emoji,
            status = ?status,
            "Reaction toggled"
        );

        // The row change is committed; a failed recount only skips the event
        let reactions = match self.load_tally(message_id, user_id).await {
            Ok(reactions) => reactions,
            Err(e) => {
                warn!(message_id = %message_id, error = %e, "Tally recount failed, not publishing");
                return Ok(status);
            }
        };

        self.ctx.publish(RealtimeEvent::ReactionsUpdated(ReactionsUpdatedPayload {
            message_id,
            user_id,
            reactions,
        }));

        Ok(status)
    }

    /// Tally of every allowed emoji on `message_id`, flagged for `viewer_id`
    #[instrument(skip(self))]
    pub async fn tally(
        &self,
        message_id: Snowflake,
        viewer_id: Snowflake,
    ) -> ServiceResult<ReactionTally> {
        self.require_message(message_id).await?;
        self.load_tally(message_id, viewer_id).await
    }

    async fn load_tally(
        &self,
        message_id: Snowflake,
        viewer_id: Snowflake,
    ) -> ServiceResult<ReactionTally> {
        let counts = self
            .ctx
            .reaction_repo()
            .count_by_emoji(message_id, viewer_id)
            .await?;
        Ok(ReactionTally::from_counts(&counts))
    }

    async fn require_message(&self, message_id: Snowflake) -> ServiceResult<()> {
        self.ctx
            .message_repo()
            .find_by_id(message_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::not_found("Message", message_id.to_string()))
    }
}
