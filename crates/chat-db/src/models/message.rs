//! Message database models

use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// Row of the messages table
#[derive(Debug, Clone, FromRow)]
pub struct MessageModel {
    pub id: i64,
    pub channel_id: i64,
    pub parent_id: Option<i64>,
    pub author_id: i64,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Message row joined with its reply count
#[derive(Debug, Clone, FromRow)]
pub struct ThreadedMessageModel {
    #[sqlx(flatten)]
    pub message: MessageModel,
    pub thread_count: i64,
}
