//! Thread service
//!
//! Reply creation and listing, and the thread counter propagation that runs
//! after every reply insert or delete. Counts are always recomputed from the
//! store rather than adjusted in place, so concurrent creates and deletes
//! converge on the live number of replies.

use chat_core::{
    DomainError, Message, RealtimeEvent, Snowflake, ThreadReplyCreatedPayload,
    ThreadReplyDeletedPayload,
};
use tracing::{info, instrument, warn};

use crate::dto::CreateMessageRequest;

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::message::validate_content;

/// Thread service
pub struct ThreadService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ThreadService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Reply to `parent_id`. The reply joins the parent's channel.
    #[instrument(skip(self, request))]
    pub async fn create_reply(
        &self,
        parent_id: Snowflake,
        author_id: Snowflake,
        request: CreateMessageRequest,
    ) -> ServiceResult<Message> {
        validate_content(&request.content)?;

        let parent = self
            .ctx
            .message_repo()
            .find_by_id(parent_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Message", parent_id.to_string()))?;

        let content = request.content.trim().to_string();
        let reply = Message::reply_to(self.ctx.generate_id(), &parent, author_id, content);

        // The parent can vanish between the lookup and the insert
        self.ctx
            .message_repo()
            .create(&reply)
            .await
            .map_err(|e| match e {
                DomainError::ParentNotFound(_) => {
                    ServiceError::not_found("Message", parent_id.to_string())
                }
                other => other.into(),
            })?;

        info!(message_id = %reply.id, parent_id = %parent_id, "Reply created");

        self.reply_created(&reply).await;
        Ok(reply)
    }

    /// Replies under `parent_id`, oldest first
    #[instrument(skip(self))]
    pub async fn list_replies(&self, parent_id: Snowflake) -> ServiceResult<Vec<Message>> {
        if self.ctx.message_repo().find_by_id(parent_id).await?.is_none() {
            return Err(ServiceError::not_found("Message", parent_id.to_string()));
        }

        Ok(self.ctx.message_repo().find_replies(parent_id).await?)
    }

    /// Publish `THREAD_REPLY_CREATED` with the recomputed count
    pub(crate) async fn reply_created(&self, reply: &Message) {
        let Some(parent_id) = reply.parent_id else {
            return;
        };
        let Some(thread_count) = self.recount(parent_id).await else {
            return;
        };

        self.ctx.publish(RealtimeEvent::ThreadReplyCreated(ThreadReplyCreatedPayload {
            parent_id,
            reply: reply.clone(),
            thread_count,
        }));
    }

    /// Publish `THREAD_REPLY_DELETED` with the recomputed count
    pub(crate) async fn reply_deleted(&self, reply: &Message) {
        let Some(parent_id) = reply.parent_id else {
            return;
        };
        let Some(thread_count) = self.recount(parent_id).await else {
            return;
        };

        info!(parent_id = %parent_id, thread_count, "Thread count updated");

        self.ctx.publish(RealtimeEvent::ThreadReplyDeleted(ThreadReplyDeletedPayload {
            parent_id,
            reply_id: reply.id,
            thread_count,
        }));
    }

    /// Live reply count for `parent_id`. Runs after the reply change has
    /// committed, so a failure is logged and the event skipped.
    async fn recount(&self, parent_id: Snowflake) -> Option<i64> {
        self.ctx
            .message_repo()
            .count_replies(parent_id)
            .await
            .inspect_err(|e| {
                warn!(parent_id = %parent_id, error = %e, "Thread recount failed, not publishing");
            })
            .ok()
    }
}
