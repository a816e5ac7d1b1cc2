//! Message service
//!
//! Handles top-level message creation, channel listing, lookup and deletion.

use chat_core::{
    DomainError, Message, MessageDeletedPayload, RealtimeEvent, Snowflake, ThreadedMessage,
    MAX_CONTENT_LENGTH,
};
use tracing::{info, instrument};

use crate::dto::CreateMessageRequest;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::thread::ThreadService;

/// Content must hold something other than whitespace and fit the length cap.
/// Callers store the trimmed text.
pub(crate) fn validate_content(content: &str) -> ServiceResult<()> {
    if content.trim().is_empty() {
        return Err(ServiceError::validation("Message content must not be blank"));
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(DomainError::ContentTooLong {
            max: MAX_CONTENT_LENGTH,
        }
        .into());
    }
    Ok(())
}

/// Message service
pub struct MessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Post a top-level message and publish `MESSAGE_CREATED` on its channel
    #[instrument(skip(self, request))]
    pub async fn create_message(
        &self,
        channel_id: Snowflake,
        author_id: Snowflake,
        request: CreateMessageRequest,
    ) -> ServiceResult<Message> {
        validate_content(&request.content)?;

        let content = request.content.trim().to_string();
        let message = Message::new(self.ctx.generate_id(), channel_id, author_id, content);
        self.ctx.message_repo().create(&message).await?;

        info!(message_id = %message.id, channel_id = %channel_id, "Message created");

        self.ctx.publish(RealtimeEvent::MessageCreated(message.clone()));

        Ok(message)
    }

    /// Top-level messages of a channel, oldest first, with thread counts
    #[instrument(skip(self))]
    pub async fn list_channel_messages(
        &self,
        channel_id: Snowflake,
    ) -> ServiceResult<Vec<ThreadedMessage>> {
        Ok(self.ctx.message_repo().find_top_level(channel_id).await?)
    }

    /// Get message by ID with its current thread count
    #[instrument(skip(self))]
    pub async fn get_message(&self, message_id: Snowflake) -> ServiceResult<ThreadedMessage> {
        let message = self
            .ctx
            .message_repo()
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Message", message_id.to_string()))?;

        let thread_count = self.ctx.message_repo().count_replies(message_id).await?;

        Ok(ThreadedMessage {
            message,
            thread_count,
        })
    }

    /// Delete a message the caller wrote.
    ///
    /// Replies and reactions go with it. Publishes `MESSAGE_DELETED`, and for
    /// a reply also the parent's new thread count.
    #[instrument(skip(self))]
    pub async fn delete_message(
        &self,
        message_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<()> {
        let message = self
            .ctx
            .message_repo()
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Message", message_id.to_string()))?;

        if !message.is_authored_by(user_id) {
            return Err(DomainError::NotMessageAuthor.into());
        }

        if !self.ctx.message_repo().delete(message_id).await? {
            // Lost a race with another delete, which did the publishing
            return Err(ServiceError::not_found("Message", message_id.to_string()));
        }

        info!(message_id = %message_id, channel_id = %message.channel_id, "Message deleted");

        self.ctx.publish(RealtimeEvent::MessageDeleted(MessageDeletedPayload {
            message_id,
            channel_id: message.channel_id,
            parent_id: message.parent_id,
        }));

        if message.is_reply() {
            ThreadService::new(self.ctx).reply_deleted(&message).await;
        }

        Ok(())
    }
}
