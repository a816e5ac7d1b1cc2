//! Handler error types

use crate::connection::ConnectionError;
use crate::protocol::{CloseCode, OpCode};
use thiserror::Error;

/// Every handler failure ends the connection with a close code
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("Unexpected op code from client: {0}")]
    UnknownOpcode(OpCode),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Invalid topic: {0:?}")]
    InvalidTopic(String),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    pub fn to_close_code(&self) -> CloseCode {
        match self {
            Self::InvalidPayload(_) => CloseCode::DecodeError,
            Self::UnknownOpcode(_) => CloseCode::UnknownOpcode,
            Self::AuthenticationFailed(_) => CloseCode::AuthenticationFailed,
            Self::InvalidTopic(_) => CloseCode::InvalidTopic,
            Self::Connection(ConnectionError::NotAuthenticated) => CloseCode::NotAuthenticated,
            Self::Connection(ConnectionError::AlreadyAuthenticated) => {
                CloseCode::AlreadyAuthenticated
            }
            Self::Connection(ConnectionError::TooManySubscriptions { .. }) => {
                CloseCode::TooManySubscriptions
            }
            Self::Connection(ConnectionError::Router(_)) | Self::Internal(_) => {
                CloseCode::UnknownError
            }
        }
    }
}

/// Handler result type
pub type HandlerResult<T> = Result<T, HandlerError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chat_core::PublishError;

    #[test]
    fn test_close_codes() {
        assert_eq!(
            HandlerError::InvalidTopic("room:1".into()).to_close_code(),
            CloseCode::InvalidTopic
        );
        assert_eq!(
            HandlerError::from(ConnectionError::TooManySubscriptions { limit: 1 }).to_close_code(),
            CloseCode::TooManySubscriptions
        );
        assert_eq!(
            HandlerError::from(ConnectionError::Router(PublishError::RouterClosed)).to_close_code(),
            CloseCode::UnknownError
        );
    }
}
