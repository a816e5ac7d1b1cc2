//! Individual WebSocket connection

use super::{ConnectionId, Outbound};
use crate::protocol::GatewayMessage;
use chat_core::{Snowflake, Topic};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Notify, RwLock};

/// Connection lifecycle. `Disconnected` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// Socket open, waiting for Identify
    Connecting,
    /// Identified and allowed to subscribe
    Connected,
    /// Removed from the router; no further events are delivered
    Disconnected,
}

/// A single WebSocket connection
pub struct Connection {
    id: ConnectionId,

    /// Authenticated user (None until Identify)
    user_id: RwLock<Option<Snowflake>>,

    state: RwLock<ConnectionState>,

    outbound: Outbound,

    last_heartbeat: RwLock<Instant>,

    /// Mirror of this connection's registry entries, used for the limit check
    topics: RwLock<HashSet<Topic>>,

    /// Signalled when the server wants this socket closed
    close_signal: Notify,

    created_at: Instant,
}

impl Connection {
    pub fn new(sender: mpsc::Sender<GatewayMessage>) -> Arc<Self> {
        Arc::new(Self {
            id: ConnectionId::new(),
            user_id: RwLock::new(None),
            state: RwLock::new(ConnectionState::Connecting),
            outbound: Outbound::new(sender),
            last_heartbeat: RwLock::new(Instant::now()),
            topics: RwLock::new(HashSet::new()),
            close_signal: Notify::new(),
            created_at: Instant::now(),
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    pub async fn user_id(&self) -> Option<Snowflake> {
        *self.user_id.read().await
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn is_authenticated(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// `Connecting -> Connected`. Returns false from any other state.
    pub async fn authenticate(&self, user_id: Snowflake) -> bool {
        let mut state = self.state.write().await;
        if *state != ConnectionState::Connecting {
            return false;
        }
        *self.user_id.write().await = Some(user_id);
        *state = ConnectionState::Connected;
        true
    }

    /// Move to `Disconnected`. Returns true only for the first call.
    pub async fn mark_disconnected(&self) -> bool {
        let mut state = self.state.write().await;
        if *state == ConnectionState::Disconnected {
            return false;
        }
        *state = ConnectionState::Disconnected;
        self.topics.write().await.clear();
        true
    }

    /// Record the topics about to be subscribed.
    ///
    /// Fails without recording anything if the total would exceed `limit`.
    pub async fn reserve_topics(&self, topics: &[Topic], limit: usize) -> bool {
        let mut held = self.topics.write().await;
        let added = topics.iter().filter(|t| !held.contains(t)).collect::<HashSet<_>>();
        if held.len() + added.len() > limit {
            return false;
        }
        held.extend(added);
        true
    }

    pub async fn release_topics(&self, topics: &[Topic]) {
        let mut held = self.topics.write().await;
        for topic in topics {
            held.remove(topic);
        }
    }

    pub async fn topics(&self) -> Vec<Topic> {
        self.topics.read().await.iter().copied().collect()
    }

    pub async fn record_heartbeat(&self) {
        *self.last_heartbeat.write().await = Instant::now();
    }

    pub async fn time_since_heartbeat(&self) -> Duration {
        self.last_heartbeat.read().await.elapsed()
    }

    /// Ask the socket task to close this connection
    pub fn close(&self) {
        self.close_signal.notify_one();
    }

    /// Resolves once [`Connection::close`] has been called
    pub async fn closed(&self) {
        self.close_signal.notified().await;
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub async fn send(
        &self,
        message: GatewayMessage,
    ) -> Result<(), mpsc::error::SendError<GatewayMessage>> {
        self.outbound.send(message).await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("sequence", &self.outbound.current_sequence())
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}
