//! Realtime events.
//!
//! Every event kind has one fixed payload schema and belongs to exactly one
//! topic kind. [`RealtimeEvent::check_topic`] is applied at the publish
//! boundary so subscribers never see an event on a topic it does not belong to.

use serde::{Deserialize, Serialize};

use super::Topic;
use crate::entities::{Message, Reaction, ReactionTally};
use crate::traits::PublishError;
use crate::value_objects::Snowflake;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadReplyCreatedPayload {
    pub parent_id: Snowflake,
    pub reply: Message,
    pub thread_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadReplyDeletedPayload {
    pub parent_id: Snowflake,
    pub reply_id: Snowflake,
    pub thread_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageDeletedPayload {
    pub message_id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
}

/// Tally after a toggle. `has_reacted` flags are relative to `user_id`, the
/// user whose toggle produced the event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionsUpdatedPayload {
    pub message_id: Snowflake,
    pub user_id: Snowflake,
    pub reactions: ReactionTally,
}

/// Wire form: `{"t": "MESSAGE_CREATED", "d": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "d", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RealtimeEvent {
    /// Published on `channel:{channel_id}`
    MessageCreated(Message),
    /// Published on `thread:{parent_id}`
    ThreadReplyCreated(ThreadReplyCreatedPayload),
    /// Published on `thread:{parent_id}`
    ThreadReplyDeleted(ThreadReplyDeletedPayload),
    /// Published on `message:{message_id}`
    MessageDeleted(MessageDeletedPayload),
    /// Published on `reactions:{message_id}`
    ReactionsUpdated(ReactionsUpdatedPayload),
}

impl RealtimeEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MessageCreated(_) => "MESSAGE_CREATED",
            Self::ThreadReplyCreated(_) => "THREAD_REPLY_CREATED",
            Self::ThreadReplyDeleted(_) => "THREAD_REPLY_DELETED",
            Self::MessageDeleted(_) => "MESSAGE_DELETED",
            Self::ReactionsUpdated(_) => "REACTIONS_UPDATED",
        }
    }

    /// The only topic this event may be published on
    pub fn topic(&self) -> Topic {
        match self {
            Self::MessageCreated(message) => Topic::Channel(message.channel_id),
            Self::ThreadReplyCreated(p) => Topic::Thread(p.parent_id),
            Self::ThreadReplyDeleted(p) => Topic::Thread(p.parent_id),
            Self::MessageDeleted(p) => Topic::Message(p.message_id),
            Self::ReactionsUpdated(p) => Topic::Reactions(p.message_id),
        }
    }

    /// Id of the message whose cached state this event changes
    pub fn message_id(&self) -> Snowflake {
        match self {
            Self::MessageCreated(message) => message.id,
            Self::ThreadReplyCreated(p) => p.parent_id,
            Self::ThreadReplyDeleted(p) => p.parent_id,
            Self::MessageDeleted(p) => p.message_id,
            Self::ReactionsUpdated(p) => p.message_id,
        }
    }

    /// Check the event against its payload schema and the target topic
    pub fn check_topic(&self, topic: Topic) -> Result<(), PublishError> {
        let expected = self.topic();
        if expected != topic {
            return Err(PublishError::TopicMismatch {
                event: self.event_type(),
                expected,
                actual: topic,
            });
        }

        let invalid = |reason: &str| {
            Err(PublishError::InvalidPayload {
                event: self.event_type(),
                reason: reason.to_string(),
            })
        };

        match self {
            Self::MessageCreated(message) if message.is_reply() => {
                invalid("replies are published on their thread topic")
            }
            Self::ThreadReplyCreated(p) if p.reply.parent_id != Some(p.parent_id) => {
                invalid("reply does not belong to this thread")
            }
            Self::ThreadReplyCreated(p) if p.thread_count < 1 => {
                invalid("thread count must include the new reply")
            }
            Self::ThreadReplyDeleted(p) if p.thread_count < 0 => {
                invalid("thread count cannot be negative")
            }
            Self::ReactionsUpdated(p)
                if p
                    .reactions
                    .entries()
                    .iter()
                    .any(|e| e.count < 0 || !Reaction::is_allowed(&e.emoji)) =>
            {
                invalid("tally contains an unknown emoji or a negative count")
            }
            _ => Ok(()),
        }
    }

    /// Rebuild an event from a gateway dispatch's `t` and `d` fields
    pub fn from_dispatch(
        event_type: &str,
        data: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        serde_json::from_value(serde_json::json!({ "t": event_type, "d": data }))
    }

    /// The `d` field of a gateway dispatch
    pub fn data(&self) -> Result<serde_json::Value, serde_json::Error> {
        let mut tagged = serde_json::to_value(self)?;
        Ok(tagged
            .get_mut("d")
            .map(serde_json::Value::take)
            .unwrap_or_default())
    }
}
