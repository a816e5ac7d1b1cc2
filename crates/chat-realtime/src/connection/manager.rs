//! Connection manager
//!
//! Tracks every open socket and mediates between connection state and the
//! event router. Registry changes go through the router; this type only
//! decides whether a change is allowed.

use super::{Connection, ConnectionError, ConnectionId};
use crate::protocol::GatewayMessage;
use crate::router::EventRouter;
use chat_core::{Snowflake, Topic};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct ConnectionManager {
    connections: DashMap<ConnectionId, Arc<Connection>>,
    router: EventRouter,
    max_subscriptions: usize,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(router: EventRouter, max_subscriptions: usize) -> Self {
        Self {
            connections: DashMap::new(),
            router,
            max_subscriptions,
        }
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Register a new socket in `Connecting` and attach it to the router
    pub fn open(
        &self,
        sender: mpsc::Sender<GatewayMessage>,
    ) -> Result<Arc<Connection>, ConnectionError> {
        let connection = Connection::new(sender);
        self.router
            .attach(connection.id(), connection.outbound().clone())?;
        self.connections.insert(connection.id(), Arc::clone(&connection));

        tracing::debug!(connection_id = %connection.id(), "Connection opened");
        Ok(connection)
    }

    pub fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|c| Arc::clone(c.value()))
    }

    /// `Connecting -> Connected`
    pub async fn authenticate(
        &self,
        connection: &Connection,
        user_id: Snowflake,
    ) -> Result<(), ConnectionError> {
        if !connection.authenticate(user_id).await {
            return Err(ConnectionError::AlreadyAuthenticated);
        }

        tracing::debug!(
            connection_id = %connection.id(),
            user_id = %user_id,
            "Connection authenticated"
        );
        Ok(())
    }

    /// Add subscriptions, enforcing authentication and the per-connection limit
    pub async fn subscribe(
        &self,
        connection: &Connection,
        topics: Vec<Topic>,
    ) -> Result<(), ConnectionError> {
        if !connection.is_authenticated().await {
            return Err(ConnectionError::NotAuthenticated);
        }
        if !connection
            .reserve_topics(&topics, self.max_subscriptions)
            .await
        {
            return Err(ConnectionError::TooManySubscriptions {
                limit: self.max_subscriptions,
            });
        }

        tracing::trace!(connection_id = %connection.id(), topics = ?topics, "Subscribing");
        self.router.subscribe(connection.id(), topics)?;
        Ok(())
    }

    pub async fn unsubscribe(
        &self,
        connection: &Connection,
        topics: Vec<Topic>,
    ) -> Result<(), ConnectionError> {
        if !connection.is_authenticated().await {
            return Err(ConnectionError::NotAuthenticated);
        }
        connection.release_topics(&topics).await;

        tracing::trace!(connection_id = %connection.id(), topics = ?topics, "Unsubscribing");
        self.router.unsubscribe(connection.id(), topics)?;
        Ok(())
    }

    /// Tear down a connection. Only the first call for an id does anything.
    pub async fn disconnect(&self, id: ConnectionId) -> bool {
        let Some((_, connection)) = self.connections.remove(&id) else {
            return false;
        };
        connection.mark_disconnected().await;

        if let Err(e) = self.router.detach(id) {
            tracing::debug!(connection_id = %id, error = %e, "Router gone before detach");
        }

        tracing::debug!(
            connection_id = %id,
            age_ms = connection.age().as_millis(),
            "Connection closed"
        );
        true
    }

    /// Signal every open socket to close. Used on server shutdown.
    pub fn close_all(&self) {
        for entry in &self.connections {
            entry.value().close();
        }
        tracing::info!(connections = self.connections.len(), "Closing all connections");
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("max_subscriptions", &self.max_subscriptions)
            .finish_non_exhaustive()
    }
}
