//! Reaction database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Row of the reactions table
#[derive(Debug, Clone, FromRow)]
pub struct ReactionModel {
    pub message_id: i64,
    pub user_id: i64,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

/// Reactions grouped by emoji for one viewer
#[derive(Debug, Clone, FromRow)]
pub struct EmojiCountModel {
    pub emoji: String,
    pub count: i64,
    pub reacted: bool,
}
