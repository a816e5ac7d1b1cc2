//! Client error types

use chat_realtime::CloseCode;
use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("WebSocket error: {0}")]
    Transport(#[from] tungstenite::Error),

    #[error("Invalid frame: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Closed by server: {0}")]
    Closed(CloseCode),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Client stopped")]
    Stopped,
}

impl ClientError {
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Whether another attempt could succeed. Rejected credentials or
    /// topics fail the same way every time.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Closed(code) => code.should_reconnect(),
            Self::Stopped => false,
            _ => true,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
