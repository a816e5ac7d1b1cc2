//! Shared fixtures: an in-memory store with the same constraints as the
//! PostgreSQL schema, and a publisher that records what it was handed.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chat_core::traits::{EventPublisher, MessageRepository, ReactionRepository, RepoResult};
use chat_core::{
    DomainError, EmojiCount, Message, PublishError, Reaction, RealtimeEvent, Snowflake,
    SnowflakeGenerator, ThreadedMessage, Topic,
};
use chat_service::ServiceContext;
use parking_lot::Mutex;

#[derive(Default)]
struct Tables {
    messages: Vec<Message>,
    reactions: Vec<Reaction>,
}

/// Message and reaction tables behind one lock
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    /// `count_replies` and `count_by_emoji` fail while set
    failing_recounts: AtomicBool,
    /// `find` reports no reaction while set, as a toggle that read before a
    /// concurrent insert committed would see
    stale_reaction_reads: AtomicBool,
}

impl MemoryStore {
    pub fn fail_recounts(&self, on: bool) {
        self.failing_recounts.store(on, Ordering::SeqCst);
    }

    pub fn stale_reaction_reads(&self, on: bool) {
        self.stale_reaction_reads.store(on, Ordering::SeqCst);
    }

    fn check_recount(&self) -> RepoResult<()> {
        if self.failing_recounts.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("connection reset".to_string()));
        }
        Ok(())
    }

    pub fn reaction_rows(&self, message_id: Snowflake, user_id: Snowflake, emoji: &str) -> usize {
        self.tables
            .lock()
            .reactions
            .iter()
            .filter(|r| r.message_id == message_id && r.user_id == user_id && r.emoji == emoji)
            .count()
    }

    pub fn message_count(&self) -> usize {
        self.tables.lock().messages.len()
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Message>> {
        Ok(self.tables.lock().messages.iter().find(|m| m.id == id).cloned())
    }

    async fn find_top_level(&self, channel_id: Snowflake) -> RepoResult<Vec<ThreadedMessage>> {
        let tables = self.tables.lock();
        Ok(tables
            .messages
            .iter()
            .filter(|m| m.channel_id == channel_id && m.parent_id.is_none())
            .map(|m| ThreadedMessage {
                message: m.clone(),
                thread_count: replies_of(&tables.messages, m.id),
            })
            .collect())
    }

    async fn find_replies(&self, parent_id: Snowflake) -> RepoResult<Vec<Message>> {
        Ok(self
            .tables
            .lock()
            .messages
            .iter()
            .filter(|m| m.parent_id == Some(parent_id))
            .cloned()
            .collect())
    }

    async fn create(&self, message: &Message) -> RepoResult<()> {
        let mut tables = self.tables.lock();
        if let Some(parent_id) = message.parent_id {
            if !tables.messages.iter().any(|m| m.id == parent_id) {
                return Err(DomainError::ParentNotFound(parent_id));
            }
        }
        tables.messages.push(message.clone());
        Ok(())
    }

    async fn delete(&self, id: Snowflake) -> RepoResult<bool> {
        let mut tables = self.tables.lock();
        let before = tables.messages.len();
        tables
            .messages
            .retain(|m| m.id != id && m.parent_id != Some(id));
        let removed = tables.messages.len() != before;
        let live: Vec<Snowflake> = tables.messages.iter().map(|m| m.id).collect();
        tables.reactions.retain(|r| live.contains(&r.message_id));
        Ok(removed)
    }

    async fn count_replies(&self, parent_id: Snowflake) -> RepoResult<i64> {
        self.check_recount()?;
        Ok(replies_of(&self.tables.lock().messages, parent_id))
    }
}

fn replies_of(messages: &[Message], parent_id: Snowflake) -> i64 {
    let count = messages
        .iter()
        .filter(|m| m.parent_id == Some(parent_id))
        .count();
    i64::try_from(count).unwrap_or(i64::MAX)
}

#[async_trait]
impl ReactionRepository for MemoryStore {
    async fn find(
        &self,
        message_id: Snowflake,
        user_id: Snowflake,
        emoji: &str,
    ) -> RepoResult<Option<Reaction>> {
        if self.stale_reaction_reads.load(Ordering::SeqCst) {
            return Ok(None);
        }
        Ok(self
            .tables
            .lock()
            .reactions
            .iter()
            .find(|r| r.message_id == message_id && r.user_id == user_id && r.emoji == emoji)
            .cloned())
    }

    async fn create(&self, reaction: &Reaction) -> RepoResult<()> {
        let mut tables = self.tables.lock();
        if !tables.messages.iter().any(|m| m.id == reaction.message_id) {
            return Err(DomainError::MessageNotFound(reaction.message_id));
        }
        if tables.reactions.iter().any(|r| {
            r.message_id == reaction.message_id
                && r.user_id == reaction.user_id
                && r.emoji == reaction.emoji
        }) {
            return Err(DomainError::ReactionAlreadyExists);
        }
        tables.reactions.push(reaction.clone());
        Ok(())
    }

    async fn delete(&self, message_id: Snowflake, user_id: Snowflake, emoji: &str) -> RepoResult<bool> {
        let mut tables = self.tables.lock();
        let before = tables.reactions.len();
        tables
            .reactions
            .retain(|r| !(r.message_id == message_id && r.user_id == user_id && r.emoji == emoji));
        Ok(tables.reactions.len() != before)
    }

    async fn count_by_emoji(
        &self,
        message_id: Snowflake,
        viewer_id: Snowflake,
    ) -> RepoResult<Vec<EmojiCount>> {
        self.check_recount()?;
        let tables = self.tables.lock();
        let mut counts: Vec<EmojiCount> = Vec::new();
        for reaction in tables.reactions.iter().filter(|r| r.message_id == message_id) {
            let reacted = reaction.user_id == viewer_id;
            match counts.iter_mut().find(|c| c.emoji == reaction.emoji) {
                Some(entry) => {
                    entry.count += 1;
                    entry.reacted |= reacted;
                }
                None => counts.push(EmojiCount {
                    emoji: reaction.emoji.clone(),
                    count: 1,
                    reacted,
                }),
            }
        }
        Ok(counts)
    }
}

/// Publisher that validates like the router and keeps every accepted event
#[derive(Default)]
pub struct RecordingPublisher {
    events: Mutex<Vec<(Topic, RealtimeEvent)>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<(Topic, RealtimeEvent)> {
        self.events.lock().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|(_, e)| e.event_type()).collect()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

impl EventPublisher for RecordingPublisher {
    fn publish(&self, topic: Topic, event: RealtimeEvent) -> Result<(), PublishError> {
        event.check_topic(topic)?;
        self.events.lock().push((topic, event));
        Ok(())
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub ctx: ServiceContext,
}

/// Build a context over a fresh store and the given publisher
pub fn harness(publisher: Arc<dyn EventPublisher>) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let ctx = ServiceContext::builder()
        .message_repo(store.clone())
        .reaction_repo(store.clone())
        .publisher(publisher)
        .snowflake_generator(Arc::new(SnowflakeGenerator::new(1)))
        .build()
        .expect("all dependencies provided");
    Harness { store, ctx }
}

pub fn recording() -> (Harness, Arc<RecordingPublisher>) {
    let publisher = Arc::new(RecordingPublisher::default());
    (harness(publisher.clone()), publisher)
}

pub const CHANNEL: Snowflake = Snowflake::new(100);
pub const USER_A: Snowflake = Snowflake::new(1);
pub const USER_B: Snowflake = Snowflake::new(2);
