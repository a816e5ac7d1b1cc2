//! Entity to model mappers
//!
//! - `From<Model> for Entity`: database rows to domain objects
//! - `*Insert` structs: entity data bound into INSERT statements

mod message;
mod reaction;

pub use message::MessageInsert;
pub use reaction::ReactionInsert;
