//! Topic keys: `channel:{id}`, `thread:{id}`, `reactions:{id}`, `message:{id}`

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::value_objects::Snowflake;

/// A named stream of related events that connections subscribe to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    /// New top-level messages in a channel
    Channel(Snowflake),
    /// Replies under a parent message
    Thread(Snowflake),
    /// Reaction tally changes of one message
    Reactions(Snowflake),
    /// Deletion of one message
    Message(Snowflake),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    Channel,
    Thread,
    Reactions,
    Message,
}

impl TopicKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::Thread => "thread",
            Self::Reactions => "reactions",
            Self::Message => "message",
        }
    }
}

impl Topic {
    pub fn kind(&self) -> TopicKind {
        match self {
            Self::Channel(_) => TopicKind::Channel,
            Self::Thread(_) => TopicKind::Thread,
            Self::Reactions(_) => TopicKind::Reactions,
            Self::Message(_) => TopicKind::Message,
        }
    }

    /// The channel or message id the topic is keyed on
    pub fn id(&self) -> Snowflake {
        match *self {
            Self::Channel(id) | Self::Thread(id) | Self::Reactions(id) | Self::Message(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopicParseError {
    #[error("topic must have the form kind:id, got {0:?}")]
    Malformed(String),

    #[error("unknown topic kind: {0}")]
    UnknownKind(String),

    #[error("invalid topic id: {0}")]
    InvalidId(String),
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind().as_str(), self.id())
    }
}

impl FromStr for Topic {
    type Err = TopicParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| TopicParseError::Malformed(s.to_string()))?;
        let id: Snowflake = id
            .parse()
            .map_err(|_| TopicParseError::InvalidId(id.to_string()))?;

        match kind {
            "channel" => Ok(Self::Channel(id)),
            "thread" => Ok(Self::Thread(id)),
            "reactions" => Ok(Self::Reactions(id)),
            "message" => Ok(Self::Message(id)),
            other => Err(TopicParseError::UnknownKind(other.to_string())),
        }
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
