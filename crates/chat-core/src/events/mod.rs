//! Realtime topics and the events published on them

mod realtime_event;
mod topic;

pub use realtime_event::{
    MessageDeletedPayload, ReactionsUpdatedPayload, RealtimeEvent, ThreadReplyCreatedPayload,
    ThreadReplyDeletedPayload,
};
pub use topic::{Topic, TopicKind, TopicParseError};
