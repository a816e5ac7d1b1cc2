//! Message entity <-> model mapper

use chat_core::entities::{Message, ThreadedMessage};
use chat_core::value_objects::Snowflake;
use chrono::{DateTime, Utc};

use crate::models::{MessageModel, ThreadedMessageModel};

impl From<MessageModel> for Message {
    fn from(model: MessageModel) -> Self {
        Message {
            id: Snowflake::new(model.id),
            channel_id: Snowflake::new(model.channel_id),
            parent_id: model.parent_id.map(Snowflake::new),
            author_id: Snowflake::new(model.author_id),
            content: model.content,
            created_at: model.created_at,
        }
    }
}

impl From<ThreadedMessageModel> for ThreadedMessage {
    fn from(model: ThreadedMessageModel) -> Self {
        ThreadedMessage {
            message: model.message.into(),
            thread_count: model.thread_count,
        }
    }
}

/// Column values for inserting a message
pub struct MessageInsert<'a> {
    pub id: i64,
    pub channel_id: i64,
    pub parent_id: Option<i64>,
    pub author_id: i64,
    pub content: &'a str,
    pub created_at: DateTime<Utc>,
}

impl<'a> MessageInsert<'a> {
    pub fn new(message: &'a Message) -> Self {
        Self {
            id: message.id.into_inner(),
            channel_id: message.channel_id.into_inner(),
            parent_id: message.parent_id.map(Snowflake::into_inner),
            author_id: message.author_id.into_inner(),
            content: &message.content,
            created_at: message.created_at,
        }
    }
}
