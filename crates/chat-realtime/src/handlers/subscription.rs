//! Subscribe (op 3) and Unsubscribe (op 4) handlers

use super::{HandlerError, HandlerResult};
use crate::connection::Connection;
use crate::protocol::{SessionEvent, SubscriptionAck, SubscriptionPayload};
use crate::server::RealtimeState;
use chat_core::Topic;

pub struct SubscriptionHandler;

impl SubscriptionHandler {
    pub async fn subscribe(
        state: &RealtimeState,
        connection: &Connection,
        payload: SubscriptionPayload,
    ) -> HandlerResult<()> {
        let topics = parse(&payload)?;
        state.manager().subscribe(connection, topics.clone()).await?;
        acknowledge(state, connection, SessionEvent::Subscribed, topics).await
    }

    pub async fn unsubscribe(
        state: &RealtimeState,
        connection: &Connection,
        payload: SubscriptionPayload,
    ) -> HandlerResult<()> {
        let topics = parse(&payload)?;
        state
            .manager()
            .unsubscribe(connection, topics.clone())
            .await?;
        acknowledge(state, connection, SessionEvent::Unsubscribed, topics).await
    }
}

fn parse(payload: &SubscriptionPayload) -> HandlerResult<Vec<Topic>> {
    payload.parse_topics().map_err(HandlerError::InvalidTopic)
}

/// The ack is only sent once the router has applied the change, so any
/// event published after the client sees `SUBSCRIBED` reaches it.
async fn acknowledge(
    state: &RealtimeState,
    connection: &Connection,
    event: SessionEvent,
    topics: Vec<Topic>,
) -> HandlerResult<()> {
    state
        .manager()
        .router()
        .flush()
        .await
        .map_err(|e| HandlerError::Internal(e.to_string()))?;

    let data = serde_json::to_value(SubscriptionAck { topics })
        .map_err(|e| HandlerError::Internal(e.to_string()))?;
    connection
        .outbound()
        .dispatch(event.as_str(), data)
        .await
        .map_err(|e| HandlerError::Internal(format!("Failed to send {}: {e}", event.as_str())))
}
