//! Domain entities - core business objects

mod message;
mod reaction;

pub use message::{Message, ThreadedMessage, MAX_CONTENT_LENGTH};
pub use reaction::{EmojiCount, Reaction, ReactionSummary, ReactionTally, EMOJI_OPTIONS};
