//! Database models - SQLx-compatible structs for PostgreSQL tables

mod message;
mod reaction;

pub use message::{MessageModel, ThreadedMessageModel};
pub use reaction::{EmojiCountModel, ReactionModel};
