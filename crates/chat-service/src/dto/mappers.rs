//! Entity to DTO mappers
//!
//! Implements `From` conversions from domain entities to response DTOs.

use chat_core::{Message, ThreadedMessage};

use super::responses::MessageResponse;

impl From<ThreadedMessage> for MessageResponse {
    fn from(threaded: ThreadedMessage) -> Self {
        let ThreadedMessage {
            message,
            thread_count,
        } = threaded;
        Self {
            id: message.id,
            channel_id: message.channel_id,
            parent_id: message.parent_id,
            author_id: message.author_id,
            content: message.content,
            created_at: message.created_at,
            thread_count,
        }
    }
}

/// A freshly written message has no replies yet
impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self::from(ThreadedMessage {
            message,
            thread_count: 0,
        })
    }
}
