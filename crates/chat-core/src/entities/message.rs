//! Message entity - a top-level channel message or a thread reply

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Upper bound on message content, in characters
pub const MAX_CONTENT_LENGTH: usize = 2000;

/// A chat message. `parent_id` is `None` for top-level messages and points at
/// the thread root for replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Snowflake>,
    pub author_id: Snowflake,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Create a top-level message
    pub fn new(id: Snowflake, channel_id: Snowflake, author_id: Snowflake, content: String) -> Self {
        Self {
            id,
            channel_id,
            parent_id: None,
            author_id,
            content,
            created_at: Utc::now(),
        }
    }

    /// Create a reply under `parent`; the reply lives in the parent's channel
    pub fn reply_to(id: Snowflake, parent: &Message, author_id: Snowflake, content: String) -> Self {
        Self {
            id,
            channel_id: parent.channel_id,
            parent_id: Some(parent.id),
            author_id,
            content,
            created_at: Utc::now(),
        }
    }

    #[inline]
    pub fn is_reply(&self) -> bool {
        self.parent_id.is_some()
    }

    #[inline]
    pub fn is_authored_by(&self, user_id: Snowflake) -> bool {
        self.author_id == user_id
    }
}

/// A message together with its derived reply count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadedMessage {
    pub message: Message,
    pub thread_count: i64,
}
