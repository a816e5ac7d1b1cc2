//! Ports implemented by the persistence and delivery layers

mod publisher;
mod repositories;

pub use crate::entities::EmojiCount;
pub use publisher::{EventPublisher, PublishError};
pub use repositories::{MessageRepository, ReactionRepository, RepoResult};
