use chat_core::PublishError;
use thiserror::Error;

/// Reasons the manager refuses a lifecycle or subscription change
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Already authenticated")]
    AlreadyAuthenticated,

    #[error("Subscription limit of {limit} reached")]
    TooManySubscriptions { limit: usize },

    #[error(transparent)]
    Router(#[from] PublishError),
}
