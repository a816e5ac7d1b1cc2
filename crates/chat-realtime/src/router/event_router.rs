//! Event router.
//!
//! A single task owns the [`TopicRegistry`] and every connection's outbound
//! handle. Subscriptions, disconnects and publications all arrive on one
//! unbounded command channel and are applied in arrival order, which makes
//! per-topic delivery FIFO and lets the registry go without locks.

use super::TopicRegistry;
use crate::connection::{ConnectionId, Outbound};
use chat_core::{EventPublisher, PublishError, RealtimeEvent, Topic};
use serde::Serialize;
use std::collections::HashMap;
use std::ops::ControlFlow;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum Command {
    Attach {
        connection: ConnectionId,
        outbound: Outbound,
    },
    Detach {
        connection: ConnectionId,
    },
    Subscribe {
        connection: ConnectionId,
        topics: Vec<Topic>,
    },
    Unsubscribe {
        connection: ConnectionId,
        topics: Vec<Topic>,
    },
    Publish {
        topic: Topic,
        event: RealtimeEvent,
    },
    SubscribersOf {
        topic: Topic,
        reply: oneshot::Sender<Vec<ConnectionId>>,
    },
    Stats {
        reply: oneshot::Sender<RouterStats>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Point-in-time view of the router, for health checks and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub connections: usize,
    pub topics: usize,
    pub subscriptions: usize,
    pub published: u64,
    pub delivered: u64,
    pub dropped: u64,
}

/// Handle to the router task. Cheap to clone; every clone feeds the same task.
///
/// All methods fail with [`PublishError::RouterClosed`] once the task has
/// stopped.
#[derive(Clone)]
pub struct EventRouter {
    commands: mpsc::UnboundedSender<Command>,
}

/// Owner of the running router task
pub struct RouterTask {
    commands: mpsc::UnboundedSender<Command>,
    handle: JoinHandle<()>,
}

impl EventRouter {
    /// Start the router task. Must be called inside a tokio runtime.
    pub fn spawn() -> (Self, RouterTask) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(RouterActor::new(rx).run());

        (
            Self {
                commands: tx.clone(),
            },
            RouterTask {
                commands: tx,
                handle,
            },
        )
    }

    fn send(&self, command: Command) -> Result<(), PublishError> {
        self.commands
            .send(command)
            .map_err(|_| PublishError::RouterClosed)
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, PublishError> {
        let (reply, response) = oneshot::channel();
        self.send(build(reply))?;
        response.await.map_err(|_| PublishError::RouterClosed)
    }

    /// Register the handle events for `connection` are written to
    pub fn attach(&self, connection: ConnectionId, outbound: Outbound) -> Result<(), PublishError> {
        self.send(Command::Attach {
            connection,
            outbound,
        })
    }

    /// Forget `connection` and drop all of its subscriptions
    pub fn detach(&self, connection: ConnectionId) -> Result<(), PublishError> {
        self.send(Command::Detach { connection })
    }

    /// Subscriptions for a connection that is not attached are ignored
    pub fn subscribe(
        &self,
        connection: ConnectionId,
        topics: Vec<Topic>,
    ) -> Result<(), PublishError> {
        self.send(Command::Subscribe { connection, topics })
    }

    pub fn unsubscribe(
        &self,
        connection: ConnectionId,
        topics: Vec<Topic>,
    ) -> Result<(), PublishError> {
        self.send(Command::Unsubscribe { connection, topics })
    }

    /// Current subscribers of `topic`, oldest registration first
    pub async fn subscribers_of(&self, topic: Topic) -> Result<Vec<ConnectionId>, PublishError> {
        self.request(|reply| Command::SubscribersOf { topic, reply })
            .await
    }

    pub async fn stats(&self) -> Result<RouterStats, PublishError> {
        self.request(|reply| Command::Stats { reply }).await
    }

    /// Wait until every command sent before this call has been applied
    pub async fn flush(&self) -> Result<(), PublishError> {
        self.request(|reply| Command::Flush { reply }).await
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

impl EventPublisher for EventRouter {
    fn publish(&self, topic: Topic, event: RealtimeEvent) -> Result<(), PublishError> {
        event.check_topic(topic)?;
        self.send(Command::Publish { topic, event })
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl RouterTask {
    /// Stop the router after the commands already queued ahead of the stop.
    ///
    /// Commands sent after this point are rejected with `RouterClosed`.
    pub async fn shutdown(self) {
        if self.commands.send(Command::Shutdown).is_err() {
            tracing::debug!("Event router already stopped");
        }
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Event router task failed");
        }
    }
}

impl std::fmt::Debug for RouterTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouterTask")
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}

struct RouterActor {
    registry: TopicRegistry,
    outbounds: HashMap<ConnectionId, Outbound>,
    stats: RouterStats,
    commands: mpsc::UnboundedReceiver<Command>,
}

impl RouterActor {
    fn new(commands: mpsc::UnboundedReceiver<Command>) -> Self {
        Self {
            registry: TopicRegistry::new(),
            outbounds: HashMap::new(),
            stats: RouterStats::default(),
            commands,
        }
    }

    async fn run(mut self) {
        tracing::info!("Event router started");

        while let Some(command) = self.commands.recv().await {
            if self.handle(command).is_break() {
                break;
            }
        }

        tracing::info!(
            connections = self.outbounds.len(),
            published = self.stats.published,
            delivered = self.stats.delivered,
            dropped = self.stats.dropped,
            "Event router stopped"
        );
    }

    fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Attach {
                connection,
                outbound,
            } => {
                self.outbounds.insert(connection, outbound);
            }
            Command::Detach { connection } => {
                self.outbounds.remove(&connection);
                let dropped = self.registry.drop_connection(connection);
                tracing::debug!(
                    connection_id = %connection,
                    subscriptions = dropped,
                    "Connection detached from router"
                );
            }
            Command::Subscribe { connection, topics } => {
                if !self.outbounds.contains_key(&connection) {
                    tracing::debug!(connection_id = %connection, "Subscribe for detached connection ignored");
                    return ControlFlow::Continue(());
                }
                for topic in topics {
                    self.registry.subscribe(connection, topic);
                }
            }
            Command::Unsubscribe { connection, topics } => {
                for topic in &topics {
                    self.registry.unsubscribe(connection, topic);
                }
            }
            Command::Publish { topic, event } => self.deliver(topic, &event),
            Command::SubscribersOf { topic, reply } => {
                let _ = reply.send(self.registry.subscribers_of(&topic).to_vec());
            }
            Command::Stats { reply } => {
                let _ = reply.send(RouterStats {
                    connections: self.outbounds.len(),
                    topics: self.registry.topic_count(),
                    subscriptions: self.registry.total_subscriptions(),
                    ..self.stats
                });
            }
            Command::Flush { reply } => {
                let _ = reply.send(());
            }
            Command::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Hand `event` to every subscriber of `topic` without waiting on any
    fn deliver(&mut self, topic: Topic, event: &RealtimeEvent) {
        self.stats.published += 1;
        let event_type = event.event_type();

        let subscribers = self.registry.subscribers_of(&topic);
        if subscribers.is_empty() {
            tracing::trace!(topic = %topic, event = event_type, "No subscribers");
            return;
        }

        let data = match event.data() {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(topic = %topic, event = event_type, error = %e, "Failed to encode event");
                return;
            }
        };

        for connection in subscribers {
            let Some(outbound) = self.outbounds.get(connection) else {
                continue;
            };
            match outbound.try_dispatch(event_type, data.clone()) {
                Ok(()) => self.stats.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    self.stats.dropped += 1;
                    tracing::warn!(
                        connection_id = %connection,
                        topic = %topic,
                        event = event_type,
                        "Outbound queue full, event dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    self.stats.dropped += 1;
                    tracing::debug!(
                        connection_id = %connection,
                        topic = %topic,
                        event = event_type,
                        "Connection closing, event dropped"
                    );
                }
            }
        }

        tracing::trace!(topic = %topic, event = event_type, subscribers = subscribers.len(), "Event delivered");
    }
}
