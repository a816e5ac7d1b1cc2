//! Business logic services
//!
//! Services borrow a [`ServiceContext`] and are cheap to construct per request.

pub mod context;
pub mod error;
pub mod message;
pub mod reaction;
pub mod thread;

pub use context::{ServiceContext, ServiceContextBuilder};
pub use error::{ServiceError, ServiceResult};
pub use message::MessageService;
pub use reaction::{ReactionService, ToggleStatus};
pub use thread::ThreadService;
