//! Send half of a connection's bounded outbound queue

use crate::protocol::GatewayMessage;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::SendError, error::TrySendError};

/// Cloneable handle that writes frames to one connection.
///
/// The router holds one clone for fan-out and the socket handler holds
/// another for replies; both draw dispatch sequence numbers from the same
/// counter.
#[derive(Debug, Clone)]
pub struct Outbound {
    sender: mpsc::Sender<GatewayMessage>,
    sequence: Arc<AtomicU64>,
}

impl Outbound {
    pub fn new(sender: mpsc::Sender<GatewayMessage>) -> Self {
        Self {
            sender,
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Queue a dispatch without waiting; fails if the queue is full or closed
    pub fn try_dispatch(
        &self,
        event_type: &str,
        data: Value,
    ) -> Result<(), TrySendError<GatewayMessage>> {
        let seq = self.next_sequence();
        self.sender
            .try_send(GatewayMessage::dispatch(event_type, seq, data))
    }

    /// Queue a dispatch, waiting for room
    pub async fn dispatch(
        &self,
        event_type: &str,
        data: Value,
    ) -> Result<(), SendError<GatewayMessage>> {
        let seq = self.next_sequence();
        self.sender
            .send(GatewayMessage::dispatch(event_type, seq, data))
            .await
    }

    pub async fn send(&self, message: GatewayMessage) -> Result<(), SendError<GatewayMessage>> {
        self.sender.send(message).await
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
