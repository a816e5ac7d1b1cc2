//! Axum extractors for request handling
//!
//! Custom extractors for authentication, path ids and validated bodies.

mod auth;
mod path;
mod validated;

pub use auth::AuthUser;
pub use path::{ChannelIdPath, MessageIdPath, SnowflakePath};
pub use validated::ValidatedJson;
