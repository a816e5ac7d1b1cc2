//! Payloads carried in the `d` field of gateway frames

use chat_core::{Snowflake, Topic};
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
}

impl HelloPayload {
    pub const DEFAULT_HEARTBEAT_INTERVAL: u64 = 45_000;

    #[must_use]
    pub fn with_interval(heartbeat_interval: u64) -> Self {
        Self { heartbeat_interval }
    }
}

impl Default for HelloPayload {
    fn default() -> Self {
        Self::with_interval(Self::DEFAULT_HEARTBEAT_INTERVAL)
    }
}

/// Payload for op 2 (Identify)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifyPayload {
    /// Access token, with or without a `Bearer ` prefix
    pub token: String,
}

impl IdentifyPayload {
    /// The token with any `Bearer ` prefix removed
    pub fn bare_token(&self) -> &str {
        self.token.strip_prefix("Bearer ").unwrap_or(&self.token)
    }
}

/// Payload for op 3 (Subscribe) and op 4 (Unsubscribe).
///
/// Topics stay raw strings on the wire so one malformed entry can be
/// reported as `InvalidTopic` instead of failing the whole frame decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionPayload {
    pub topics: Vec<String>,
}

impl SubscriptionPayload {
    pub fn new(topics: &[Topic]) -> Self {
        Self {
            topics: topics.iter().map(ToString::to_string).collect(),
        }
    }

    /// Parse every topic, failing on the first malformed one
    pub fn parse_topics(&self) -> Result<Vec<Topic>, String> {
        self.topics
            .iter()
            .map(|raw| raw.parse::<Topic>().map_err(|_| raw.clone()))
            .collect()
    }
}

/// Data of the `READY` dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadyPayload {
    pub session_id: String,
    pub user_id: Snowflake,
}

/// Data of the `SUBSCRIBED` and `UNSUBSCRIBED` dispatches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionAck {
    pub topics: Vec<Topic>,
}

/// Dispatches about the session itself, as opposed to domain events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Ready,
    Subscribed,
    Unsubscribed,
}

impl SessionEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "READY",
            Self::Subscribed => "SUBSCRIBED",
            Self::Unsubscribed => "UNSUBSCRIBED",
        }
    }

    pub fn from_name(event_type: &str) -> Option<Self> {
        match event_type {
            "READY" => Some(Self::Ready),
            "SUBSCRIBED" => Some(Self::Subscribed),
            "UNSUBSCRIBED" => Some(Self::Unsubscribed),
            _ => None,
        }
    }
}
