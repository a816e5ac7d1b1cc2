//! # chat-core
//!
//! Domain layer for threaded chat: messages, reactions, realtime topics and
//! the events published on them. No infrastructure dependencies live here;
//! persistence and delivery are reached through the traits in [`traits`].

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    EmojiCount, Message, Reaction, ReactionSummary, ReactionTally, ThreadedMessage, EMOJI_OPTIONS,
    MAX_CONTENT_LENGTH,
};
pub use error::DomainError;
pub use events::{
    MessageDeletedPayload, ReactionsUpdatedPayload, RealtimeEvent, ThreadReplyCreatedPayload,
    ThreadReplyDeletedPayload, Topic, TopicKind, TopicParseError,
};
pub use traits::{
    EventPublisher, MessageRepository, PublishError, ReactionRepository, RepoResult,
};
pub use value_objects::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
