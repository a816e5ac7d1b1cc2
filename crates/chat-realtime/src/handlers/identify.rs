//! Identify handler (op 2)

use super::{HandlerError, HandlerResult};
use crate::connection::{Connection, ConnectionError};
use crate::protocol::{IdentifyPayload, ReadyPayload, SessionEvent};
use crate::server::RealtimeState;

pub struct IdentifyHandler;

impl IdentifyHandler {
    /// Verify the token, move the connection to `Connected` and send `READY`
    pub async fn handle(
        state: &RealtimeState,
        connection: &Connection,
        payload: IdentifyPayload,
    ) -> HandlerResult<()> {
        if connection.is_authenticated().await {
            tracing::warn!(
                connection_id = %connection.id(),
                "Client sent Identify while already authenticated"
            );
            return Err(ConnectionError::AlreadyAuthenticated.into());
        }

        let user_id = state
            .jwt()
            .authenticate(payload.bare_token())
            .map_err(|e| {
                tracing::debug!(connection_id = %connection.id(), error = %e, "Token validation failed");
                HandlerError::AuthenticationFailed(e.to_string())
            })?;

        state.manager().authenticate(connection, user_id).await?;

        let ready = ReadyPayload {
            session_id: connection.id().to_string(),
            user_id,
        };
        let data =
            serde_json::to_value(&ready).map_err(|e| HandlerError::Internal(e.to_string()))?;
        connection
            .outbound()
            .dispatch(SessionEvent::Ready.as_str(), data)
            .await
            .map_err(|e| HandlerError::Internal(format!("Failed to send READY: {e}")))?;

        tracing::info!(
            connection_id = %connection.id(),
            user_id = %user_id,
            "Client identified"
        );
        Ok(())
    }
}
