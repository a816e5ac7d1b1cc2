//! The broadcast port used by write paths after a change has been persisted

use crate::events::{RealtimeEvent, Topic};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("{event} belongs on {expected}, not {actual}")]
    TopicMismatch {
        event: &'static str,
        expected: Topic,
        actual: Topic,
    },

    #[error("invalid {event} payload: {reason}")]
    InvalidPayload { event: &'static str, reason: String },

    #[error("event router is not running")]
    RouterClosed,
}

/// Fire-and-forget fan-out of an event to every subscriber of `topic`.
///
/// Implementations must not suspend: the call only hands the event to the
/// router, and per-topic order is the order of `publish` calls.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, topic: Topic, event: RealtimeEvent) -> Result<(), PublishError>;

    /// Publish on the event's own topic
    fn emit(&self, event: RealtimeEvent) -> Result<(), PublishError> {
        self.publish(event.topic(), event)
    }
}
