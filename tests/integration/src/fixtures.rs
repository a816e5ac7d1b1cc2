//! Test fixtures and data generators
//!
//! Provides reusable request bodies and unique ids. The database outlives
//! a test run, so every test works in channels and as users of its own.

use std::sync::LazyLock;

use chat_core::{Snowflake, SnowflakeGenerator};
use serde::Serialize;

pub use chat_core::ReactionSummary;
pub use chat_service::dto::{MessageResponse, ToggleReactionResponse};
pub use chat_service::ToggleStatus;

/// Machine id reserved for test data, distinct from the server's
static IDS: LazyLock<SnowflakeGenerator> = LazyLock::new(|| SnowflakeGenerator::new(1023));

/// A fresh id for a channel or user
pub fn unique_id() -> Snowflake {
    IDS.generate()
}

/// Body of `POST /channels/{id}/messages` and `POST /messages/{id}/replies`
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub content: String,
}

impl MessageBody {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Body of `POST /messages/{id}/reactions`
#[derive(Debug, Serialize)]
pub struct ReactionBody {
    pub emoji: String,
}

impl ReactionBody {
    pub fn new(emoji: impl Into<String>) -> Self {
        Self {
            emoji: emoji.into(),
        }
    }

    pub fn thumbs_up() -> Self {
        Self::new("👍")
    }
}

/// Count of `emoji` in a tally response
pub fn count_of(tally: &[ReactionSummary], emoji: &str) -> i64 {
    tally
        .iter()
        .find(|entry| entry.emoji == emoji)
        .map_or(0, |entry| entry.count)
}

/// `hasReacted` of `emoji` in a tally response
pub fn reacted(tally: &[ReactionSummary], emoji: &str) -> bool {
    tally
        .iter()
        .find(|entry| entry.emoji == emoji)
        .is_some_and(|entry| entry.has_reacted)
}
