//! Op code handlers
//!
//! Handles incoming client frames based on their operation code.

mod error;
mod heartbeat;
mod identify;
mod subscription;

pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use identify::IdentifyHandler;
pub use subscription::SubscriptionHandler;

use crate::connection::Connection;
use crate::protocol::{GatewayMessage, OpCode};
use crate::server::RealtimeState;

/// Routes client frames to their handler
pub struct MessageDispatcher;

impl MessageDispatcher {
    pub async fn dispatch(
        state: &RealtimeState,
        connection: &Connection,
        message: GatewayMessage,
    ) -> HandlerResult<()> {
        if !message.op.is_client_op() {
            tracing::warn!(
                connection_id = %connection.id(),
                op = %message.op,
                "Received server-only op code from client"
            );
            return Err(HandlerError::UnknownOpcode(message.op));
        }

        match message.op {
            OpCode::Identify => {
                let payload = message.as_identify().ok_or_else(|| {
                    HandlerError::InvalidPayload("Invalid Identify payload".to_string())
                })?;
                IdentifyHandler::handle(state, connection, payload).await
            }
            OpCode::Heartbeat => {
                let last_sequence = message.d.as_ref().and_then(serde_json::Value::as_u64);
                HeartbeatHandler::handle(connection, last_sequence).await
            }
            OpCode::Subscribe | OpCode::Unsubscribe => {
                let payload = message.as_subscription().ok_or_else(|| {
                    HandlerError::InvalidPayload(format!("Invalid {} payload", message.op.name()))
                })?;
                if message.op == OpCode::Subscribe {
                    SubscriptionHandler::subscribe(state, connection, payload).await
                } else {
                    SubscriptionHandler::unsubscribe(state, connection, payload).await
                }
            }
            // server-only ops were rejected above
            OpCode::Dispatch | OpCode::Hello | OpCode::HeartbeatAck => {
                Err(HandlerError::UnknownOpcode(message.op))
            }
        }
    }
}
