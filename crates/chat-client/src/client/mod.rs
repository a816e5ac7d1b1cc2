//! Realtime gateway client
//!
//! [`RealtimeClient`] is a handle to a background task that owns the socket.
//! The task keeps the set of subscribed topics across sessions: when a
//! session is lost it retries on the configured [`ReconnectPolicy`], and
//! every new session re-identifies and re-subscribes to all held topics
//! before reporting [`ConnectionStatus::Connected`]. Events published while
//! no session was open are not recovered.
//!
//! [`ReconnectPolicy`]: crate::config::ReconnectPolicy

mod session;

use std::collections::BTreeSet;
use std::sync::Arc;

use chat_core::{RealtimeEvent, Topic};
use chat_realtime::protocol::ReadyPayload;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use self::session::{Session, SessionEnd};
use crate::cache::ReconciliationCache;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

/// Connection status as seen by the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    /// Waiting before reconnect `attempt` (1-based)
    Reconnecting { attempt: u32 },
    /// Terminal: closed by the client, rejected by the server, or out of
    /// reconnect attempts
    Disconnected,
}

/// Delivered to the application in arrival order
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A session was established; sent once per (re)connect
    Ready(ReadyPayload),
    Subscribed(Vec<Topic>),
    Unsubscribed(Vec<Topic>),
    /// A domain event, already merged into the cache
    Dispatch(RealtimeEvent),
}

pub(crate) enum Command {
    Subscribe(Vec<Topic>),
    Unsubscribe(Vec<Topic>),
    Close,
}

pub struct RealtimeClient {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
    cache: Arc<ReconciliationCache>,
    task: JoinHandle<()>,
}

impl RealtimeClient {
    /// Start the client task with a fresh cache. Must be called inside a
    /// tokio runtime.
    pub fn connect(config: ClientConfig) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        Self::with_cache(config, Arc::new(ReconciliationCache::new()))
    }

    /// Start the client task merging into an existing cache
    pub fn with_cache(
        config: ClientConfig,
        cache: Arc<ReconciliationCache>,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);

        let task = tokio::spawn(run_client(
            config,
            commands_rx,
            status_tx,
            events_tx,
            Arc::clone(&cache),
        ));

        (
            Self {
                commands: commands_tx,
                status: status_rx,
                cache,
                task,
            },
            events_rx,
        )
    }

    fn send(&self, command: Command) -> ClientResult<()> {
        self.commands
            .send(command)
            .map_err(|_| ClientError::Stopped)
    }

    /// Subscribe now if connected, and on every later session
    pub fn subscribe(&self, topics: impl IntoIterator<Item = Topic>) -> ClientResult<()> {
        self.send(Command::Subscribe(topics.into_iter().collect()))
    }

    pub fn unsubscribe(&self, topics: impl IntoIterator<Item = Topic>) -> ClientResult<()> {
        self.send(Command::Unsubscribe(topics.into_iter().collect()))
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Wait until the status satisfies `predicate` and return it
    pub async fn wait_for_status(
        &self,
        predicate: impl FnMut(&ConnectionStatus) -> bool,
    ) -> ClientResult<ConnectionStatus> {
        let mut status = self.status.clone();
        let reached = status
            .wait_for(predicate)
            .await
            .map_err(|_| ClientError::Stopped)?;
        Ok(*reached)
    }

    /// Wait for the first session. Fails if the client gives up first.
    pub async fn connected(&self) -> ClientResult<()> {
        let status = self
            .wait_for_status(|s| {
                matches!(s, ConnectionStatus::Connected | ConnectionStatus::Disconnected)
            })
            .await?;
        match status {
            ConnectionStatus::Connected => Ok(()),
            _ => Err(ClientError::ConnectionClosed),
        }
    }

    pub fn cache(&self) -> &Arc<ReconciliationCache> {
        &self.cache
    }

    /// Close the socket and wait for the task to finish
    pub async fn close(self) {
        // Fails only if the task already stopped
        let _ = self.commands.send(Command::Close);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Client task failed");
        }
    }
}

impl std::fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("status", &self.status())
            .field("cached_messages", &self.cache.len())
            .finish_non_exhaustive()
    }
}

/// Apply a command while no session is open. Returns `false` on close.
fn hold(command: Option<Command>, topics: &mut BTreeSet<Topic>) -> bool {
    match command {
        Some(Command::Subscribe(requested)) => topics.extend(requested),
        Some(Command::Unsubscribe(requested)) => {
            for topic in &requested {
                topics.remove(topic);
            }
        }
        Some(Command::Close) | None => return false,
    }
    true
}

async fn run_client(
    config: ClientConfig,
    mut commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ConnectionStatus>,
    events: mpsc::UnboundedSender<ClientEvent>,
    cache: Arc<ReconciliationCache>,
) {
    let mut topics = BTreeSet::new();
    let mut attempt = 0u32;

    loop {
        if attempt > 0 {
            let Some(delay) = config.reconnect.delay_for(attempt) else {
                warn!(attempts = attempt - 1, url = %config.url, "Giving up on the gateway");
                break;
            };
            status.send_replace(ConnectionStatus::Reconnecting { attempt });

            let wait = tokio::time::sleep(delay);
            tokio::pin!(wait);
            loop {
                tokio::select! {
                    () = &mut wait => break,
                    command = commands.recv() => {
                        if !hold(command, &mut topics) {
                            status.send_replace(ConnectionStatus::Disconnected);
                            return;
                        }
                    }
                }
            }
        }

        let (mut session, ready) = match Session::open(&config).await {
            Ok(opened) => opened,
            Err(e) => {
                warn!(error = %e, attempt, "Gateway connect failed");
                if !e.is_retryable() {
                    break;
                }
                attempt += 1;
                continue;
            }
        };

        info!(user_id = %ready.user_id, session_id = %ready.session_id, "Gateway session ready");
        cache.set_viewer(ready.user_id);
        let _ = events.send(ClientEvent::Ready(ready));

        // Commands queued while offline are folded in before resubscribing
        while let Ok(command) = commands.try_recv() {
            if !hold(Some(command), &mut topics) {
                session.close().await;
                status.send_replace(ConnectionStatus::Disconnected);
                return;
            }
        }

        if !topics.is_empty() {
            let held: Vec<Topic> = topics.iter().copied().collect();
            if let Err(e) = session.subscribe(&held).await {
                warn!(error = %e, "Resubscribe failed");
                attempt = 1;
                continue;
            }
        }

        status.send_replace(ConnectionStatus::Connected);

        match session.run(&mut commands, &mut topics, &events, &cache).await {
            SessionEnd::ClientClosed => break,
            SessionEnd::Lost(e) if e.is_retryable() => {
                warn!(error = %e, "Gateway session lost");
                attempt = 1;
            }
            SessionEnd::Lost(e) => {
                warn!(error = %e, "Gateway session rejected");
                break;
            }
        }
    }

    status.send_replace(ConnectionStatus::Disconnected);
}
