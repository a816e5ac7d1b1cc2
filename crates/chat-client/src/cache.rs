//! Client reconciliation cache
//!
//! Holds the messages a client has loaded and merges realtime events into
//! them by message id. Delivery is at-most-once and unordered across topics,
//! so every merge is written to converge: applying an event twice leaves the
//! same state as applying it once, and events for messages the client never
//! loaded are dropped rather than guessed at.

use std::collections::HashMap;

use chat_core::{
    Message, ReactionSummary, ReactionTally, ReactionsUpdatedPayload, RealtimeEvent, Snowflake,
    ThreadReplyCreatedPayload, ThreadReplyDeletedPayload, ThreadedMessage,
};
use parking_lot::RwLock;
use tracing::debug;

/// Locally held view of one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedMessage {
    pub message: Message,
    pub thread_count: i64,
    /// `None` until a tally has been seeded or received
    pub reactions: Option<ReactionTally>,
}

impl CachedMessage {
    fn new(message: Message, thread_count: i64) -> Self {
        Self {
            message,
            thread_count,
            reactions: None,
        }
    }
}

/// What a merge did to the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    Removed,
    /// The event referred to a message the cache does not hold
    Dropped,
}

#[derive(Debug, Default)]
struct CacheState {
    viewer: Option<Snowflake>,
    messages: HashMap<Snowflake, CachedMessage>,
}

/// Thread-safe cache keyed by message id
#[derive(Debug, Default)]
pub struct ReconciliationCache {
    state: RwLock<CacheState>,
}

impl ReconciliationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache whose reaction flags are relative to `viewer`
    pub fn with_viewer(viewer: Snowflake) -> Self {
        let cache = Self::new();
        cache.set_viewer(viewer);
        cache
    }

    pub fn set_viewer(&self, viewer: Snowflake) {
        self.state.write().viewer = Some(viewer);
    }

    pub fn viewer(&self) -> Option<Snowflake> {
        self.state.read().viewer
    }

    /// Load messages fetched over HTTP. Existing entries are replaced.
    pub fn seed(&self, messages: impl IntoIterator<Item = ThreadedMessage>) {
        let mut state = self.state.write();
        for threaded in messages {
            state.messages.insert(
                threaded.message.id,
                CachedMessage::new(threaded.message, threaded.thread_count),
            );
        }
    }

    /// Load a tally fetched for the local viewer. Ignored for unknown messages.
    pub fn seed_reactions(&self, message_id: Snowflake, tally: ReactionTally) -> bool {
        let mut state = self.state.write();
        match state.messages.get_mut(&message_id) {
            Some(cached) => {
                cached.reactions = Some(tally);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, message_id: Snowflake) -> Option<CachedMessage> {
        self.state.read().messages.get(&message_id).cloned()
    }

    pub fn contains(&self, message_id: Snowflake) -> bool {
        self.state.read().messages.contains_key(&message_id)
    }

    pub fn len(&self) -> usize {
        self.state.read().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().messages.is_empty()
    }

    /// Top-level messages of a channel in creation order
    pub fn channel_messages(&self, channel_id: Snowflake) -> Vec<CachedMessage> {
        self.collect_sorted(|m| m.channel_id == channel_id && !m.is_reply())
    }

    /// Cached replies under `parent_id` in creation order
    pub fn replies(&self, parent_id: Snowflake) -> Vec<CachedMessage> {
        self.collect_sorted(|m| m.parent_id == Some(parent_id))
    }

    fn collect_sorted(&self, filter: impl Fn(&Message) -> bool) -> Vec<CachedMessage> {
        let state = self.state.read();
        let mut found: Vec<CachedMessage> = state
            .messages
            .values()
            .filter(|cached| filter(&cached.message))
            .cloned()
            .collect();
        // Snowflakes are time-ordered
        found.sort_by_key(|cached| cached.message.id);
        found
    }

    /// Merge one event
    pub fn apply(&self, event: &RealtimeEvent) -> MergeOutcome {
        let mut state = self.state.write();
        let outcome = match event {
            RealtimeEvent::MessageCreated(message) => state.upsert(message),
            RealtimeEvent::ThreadReplyCreated(payload) => state.reply_created(payload),
            RealtimeEvent::ThreadReplyDeleted(payload) => state.reply_deleted(payload),
            RealtimeEvent::MessageDeleted(payload) => state.remove(payload.message_id),
            RealtimeEvent::ReactionsUpdated(payload) => state.reactions_updated(payload),
        };

        if outcome == MergeOutcome::Dropped {
            debug!(
                event = event.event_type(),
                message_id = %event.message_id(),
                "Dropped event for uncached message"
            );
        }
        outcome
    }
}

impl CacheState {
    /// Insert if absent, else replace only the content
    fn upsert(&mut self, message: &Message) -> MergeOutcome {
        match self.messages.get_mut(&message.id) {
            Some(cached) => {
                cached.message.content.clone_from(&message.content);
                MergeOutcome::Updated
            }
            None => {
                self.messages
                    .insert(message.id, CachedMessage::new(message.clone(), 0));
                MergeOutcome::Inserted
            }
        }
    }

    fn reply_created(&mut self, payload: &ThreadReplyCreatedPayload) -> MergeOutcome {
        let Some(parent) = self.messages.get_mut(&payload.parent_id) else {
            return MergeOutcome::Dropped;
        };
        parent.thread_count = payload.thread_count;

        self.upsert(&payload.reply);
        MergeOutcome::Updated
    }

    fn reply_deleted(&mut self, payload: &ThreadReplyDeletedPayload) -> MergeOutcome {
        let Some(parent) = self.messages.get_mut(&payload.parent_id) else {
            return MergeOutcome::Dropped;
        };
        parent.thread_count = payload.thread_count;

        self.messages.remove(&payload.reply_id);
        MergeOutcome::Updated
    }

    /// Replies go with their root, matching the store's cascade
    fn remove(&mut self, message_id: Snowflake) -> MergeOutcome {
        if self.messages.remove(&message_id).is_none() {
            return MergeOutcome::Dropped;
        }
        self.messages
            .retain(|_, cached| cached.message.parent_id != Some(message_id));
        MergeOutcome::Removed
    }

    fn reactions_updated(&mut self, payload: &ReactionsUpdatedPayload) -> MergeOutcome {
        let own_toggle = self.viewer == Some(payload.user_id);
        let Some(cached) = self.messages.get_mut(&payload.message_id) else {
            return MergeOutcome::Dropped;
        };

        let tally = if own_toggle {
            payload.reactions.clone()
        } else {
            // Published flags belong to the acting user; keep ours
            let previous = cached.reactions.as_ref();
            payload
                .reactions
                .entries()
                .iter()
                .map(|entry| ReactionSummary {
                    emoji: entry.emoji.clone(),
                    count: entry.count,
                    has_reacted: previous
                        .and_then(|tally| tally.get(&entry.emoji))
                        .is_some_and(|local| local.has_reacted),
                })
                .collect::<Vec<_>>()
                .into()
        };

        cached.reactions = Some(tally);
        MergeOutcome::Updated
    }
}
