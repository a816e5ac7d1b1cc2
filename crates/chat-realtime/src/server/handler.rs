//! WebSocket handler
//!
//! One upgraded socket runs three tasks: a reader that feeds client frames to
//! the handlers, a writer that drains the outbound queue, and a heartbeat
//! watchdog. Whichever finishes first ends the connection.

use crate::connection::Connection;
use crate::handlers::MessageDispatcher;
use crate::protocol::{CloseCode, GatewayMessage, HelloPayload};
use crate::server::RealtimeState;
use axum::extract::ws::{CloseFrame, Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::interval;

/// How long the writer gets to flush the close frame
const CLOSE_GRACE: Duration = Duration::from_secs(1);

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<RealtimeState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

async fn handle_socket(state: RealtimeState, socket: WebSocket) {
    let config = state.config().clone();
    let (tx, mut rx) = mpsc::channel::<GatewayMessage>(config.outbound_buffer);

    let connection = match state.manager().open(tx) {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!(error = %e, "Rejecting socket, event router unavailable");
            return;
        }
    };
    let connection_id = connection.id();
    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    let hello = GatewayMessage::hello(HelloPayload::with_interval(config.heartbeat_interval_ms));
    if let Ok(json) = hello.to_json() {
        if ws_sink.send(Message::Text(json)).await.is_err() {
            tracing::warn!(connection_id = %connection_id, "Failed to send Hello message");
            state.manager().disconnect(connection_id).await;
            return;
        }
    }

    let state_recv = state.clone();
    let connection_recv = Arc::clone(&connection);
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Err(code) = handle_text_message(&state_recv, &connection_recv, &text).await {
                        return Some(code);
                    }
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(connection_id = %connection_recv.id(), "Binary messages not supported");
                    return Some(CloseCode::DecodeError);
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {}
                Ok(Message::Close(_)) => {
                    tracing::info!(connection_id = %connection_recv.id(), "Client closed connection");
                    return None;
                }
                Err(e) => {
                    tracing::warn!(connection_id = %connection_recv.id(), error = %e, "WebSocket error");
                    return None;
                }
            }
        }
        None
    });

    let (close_tx, mut close_rx) = oneshot::channel::<CloseCode>();
    let mut send_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                code = &mut close_rx => {
                    if let Ok(code) = code {
                        let (code, reason) = GatewayMessage::close_frame(code);
                        let frame = CloseFrame { code, reason: reason.into() };
                        let _ = ws_sink.send(Message::Close(Some(frame))).await;
                    }
                    break;
                }
                msg = rx.recv() => {
                    let Some(msg) = msg else { break };
                    let Ok(json) = msg.to_json() else { continue };
                    if ws_sink.send(Message::Text(json)).await.is_err() {
                        tracing::debug!(connection_id = %connection_id, "Failed to write to WebSocket");
                        break;
                    }
                }
            }
        }
        let _ = ws_sink.close().await;
    });

    let connection_hb = Arc::clone(&connection);
    let timeout = config.heartbeat_timeout();
    let mut heartbeat_task = tokio::spawn(async move {
        let mut check = interval((config.heartbeat_interval() / 2).max(Duration::from_millis(1)));
        loop {
            check.tick().await;
            let since = connection_hb.time_since_heartbeat().await;
            if since > timeout {
                tracing::warn!(
                    connection_id = %connection_hb.id(),
                    since_ms = since.as_millis(),
                    "Connection timed out (no heartbeat)"
                );
                break CloseCode::SessionTimeout;
            }
        }
    });

    let mut send_finished = false;
    let close_code = tokio::select! {
        result = &mut recv_task => result.ok().flatten(),
        result = &mut heartbeat_task => result.ok(),
        () = connection.closed() => Some(CloseCode::ServerShutdown),
        _ = &mut send_task => {
            send_finished = true;
            None
        }
    };

    recv_task.abort();
    heartbeat_task.abort();
    state.manager().disconnect(connection_id).await;

    match close_code {
        Some(code) => {
            tracing::debug!(connection_id = %connection_id, close_code = %code, "Closing connection");
            let _ = close_tx.send(code);
        }
        None => drop(close_tx),
    }
    if !send_finished && tokio::time::timeout(CLOSE_GRACE, send_task).await.is_err() {
        tracing::debug!(connection_id = %connection_id, "Writer did not finish in time");
    }

    tracing::info!(connection_id = %connection_id, "WebSocket connection cleaned up");
}

/// Decode one text frame and run its handler; `Err` carries the close code
async fn handle_text_message(
    state: &RealtimeState,
    connection: &Connection,
    text: &str,
) -> Result<(), CloseCode> {
    let message = GatewayMessage::from_json(text).map_err(|e| {
        tracing::debug!(connection_id = %connection.id(), error = %e, "Failed to parse message");
        CloseCode::DecodeError
    })?;

    tracing::trace!(connection_id = %connection.id(), op = %message.op, "Received message");

    MessageDispatcher::dispatch(state, connection, message)
        .await
        .map_err(|e| {
            tracing::debug!(connection_id = %connection.id(), error = %e, "Handler error");
            e.to_close_code()
        })
}
