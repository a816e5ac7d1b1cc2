//! Topic-scoped fan-out

mod event_router;
mod registry;

pub use event_router::{EventRouter, RouterStats, RouterTask};
pub use registry::TopicRegistry;
