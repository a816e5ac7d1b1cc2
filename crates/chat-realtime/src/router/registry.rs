//! Topic registry: which connections hear which topics.
//!
//! Owned by the router task, so it needs no locking. A topic entry exists only
//! while it has at least one subscriber.

use crate::connection::ConnectionId;
use chat_core::Topic;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct TopicRegistry {
    /// Topic → subscribers in registration order
    topics: HashMap<Topic, Vec<ConnectionId>>,
    /// Reverse index so a disconnect touches only the topics it held
    memberships: HashMap<ConnectionId, HashSet<Topic>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `connection` to `topic`. Returns false if it was already there.
    pub fn subscribe(&mut self, connection: ConnectionId, topic: Topic) -> bool {
        if !self.memberships.entry(connection).or_default().insert(topic) {
            return false;
        }
        self.topics.entry(topic).or_default().push(connection);
        true
    }

    /// Remove `connection` from `topic`. Returns false if it was not there.
    pub fn unsubscribe(&mut self, connection: ConnectionId, topic: &Topic) -> bool {
        let Some(held) = self.memberships.get_mut(&connection) else {
            return false;
        };
        if !held.remove(topic) {
            return false;
        }
        if held.is_empty() {
            self.memberships.remove(&connection);
        }
        self.remove_subscriber(topic, connection);
        true
    }

    /// Subscribers of `topic`, oldest registration first
    pub fn subscribers_of(&self, topic: &Topic) -> &[ConnectionId] {
        self.topics
            .get(topic)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Remove `connection` from every topic. Returns how many it held.
    pub fn drop_connection(&mut self, connection: ConnectionId) -> usize {
        let Some(held) = self.memberships.remove(&connection) else {
            return 0;
        };
        for topic in &held {
            self.remove_subscriber(topic, connection);
        }
        held.len()
    }

    pub fn is_subscribed(&self, connection: ConnectionId, topic: &Topic) -> bool {
        self.memberships
            .get(&connection)
            .is_some_and(|held| held.contains(topic))
    }

    /// Number of topics with at least one subscriber
    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }

    pub fn subscription_count(&self, connection: ConnectionId) -> usize {
        self.memberships.get(&connection).map_or(0, HashSet::len)
    }

    /// Total (connection, topic) pairs
    pub fn total_subscriptions(&self) -> usize {
        self.memberships.values().map(HashSet::len).sum()
    }

    fn remove_subscriber(&mut self, topic: &Topic, connection: ConnectionId) {
        if let Some(subscribers) = self.topics.get_mut(topic) {
            subscribers.retain(|id| *id != connection);
            if subscribers.is_empty() {
                self.topics.remove(topic);
            }
        }
    }
}
