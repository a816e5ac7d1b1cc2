//! Reaction entity and the per-viewer tally derived from reaction rows

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Emoji a message can be reacted with, in display order
pub const EMOJI_OPTIONS: [&str; 6] = ["👍", "❤️", "😄", "😮", "😢", "😡"];

/// One user's reaction. At most one exists per `(user_id, message_id, emoji)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub message_id: Snowflake,
    pub user_id: Snowflake,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

impl Reaction {
    pub fn new(message_id: Snowflake, user_id: Snowflake, emoji: String) -> Self {
        Self {
            message_id,
            user_id,
            emoji,
            created_at: Utc::now(),
        }
    }

    /// Whether `emoji` is one of [`EMOJI_OPTIONS`]
    pub fn is_allowed(emoji: &str) -> bool {
        EMOJI_OPTIONS.contains(&emoji)
    }
}

/// Grouped reaction rows for one emoji, as seen by one viewer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiCount {
    pub emoji: String,
    pub count: i64,
    pub reacted: bool,
}

/// A single `{emoji, count, hasReacted}` tally entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionSummary {
    pub emoji: String,
    pub count: i64,
    #[serde(rename = "hasReacted")]
    pub has_reacted: bool,
}

/// Tally over every allowed emoji, in [`EMOJI_OPTIONS`] order.
///
/// Emoji without rows report a zero count; grouped rows for emoji outside the
/// allowed set are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionTally(Vec<ReactionSummary>);

impl ReactionTally {
    pub fn from_counts(counts: &[EmojiCount]) -> Self {
        let entries = EMOJI_OPTIONS
            .iter()
            .map(|&emoji| {
                let found = counts.iter().find(|c| c.emoji == emoji);
                ReactionSummary {
                    emoji: emoji.to_string(),
                    count: found.map_or(0, |c| c.count),
                    has_reacted: found.is_some_and(|c| c.reacted),
                }
            })
            .collect();
        Self(entries)
    }

    pub fn get(&self, emoji: &str) -> Option<&ReactionSummary> {
        self.0.iter().find(|entry| entry.emoji == emoji)
    }

    pub fn count(&self, emoji: &str) -> i64 {
        self.get(emoji).map_or(0, |entry| entry.count)
    }

    pub fn entries(&self) -> &[ReactionSummary] {
        &self.0
    }

    pub fn into_entries(self) -> Vec<ReactionSummary> {
        self.0
    }
}

impl From<Vec<ReactionSummary>> for ReactionTally {
    fn from(entries: Vec<ReactionSummary>) -> Self {
        Self(entries)
    }
}
