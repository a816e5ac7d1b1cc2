//! One gateway session: handshake, then the frame loop until the socket ends
//! or the client is asked to close.

use std::collections::BTreeSet;
use std::time::Duration;

use chat_core::{RealtimeEvent, Topic};
use chat_realtime::protocol::{ReadyPayload, SessionEvent, SubscriptionAck};
use chat_realtime::{CloseCode, GatewayMessage, OpCode};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use super::{ClientEvent, Command};
use crate::cache::ReconciliationCache;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How an established session ended
pub(super) enum SessionEnd {
    /// The client asked to close, or every handle was dropped
    ClientClosed,
    Lost(ClientError),
}

pub(super) struct Session {
    ws: WsStream,
    heartbeat_interval: Duration,
    last_sequence: Option<u64>,
}

impl Session {
    /// Connect, wait for `Hello`, identify and wait for `READY`
    pub(super) async fn open(config: &ClientConfig) -> ClientResult<(Self, ReadyPayload)> {
        let (mut ws, _) = connect_async(config.url.as_str()).await?;

        let hello = next_frame(&mut ws).await?;
        let hello = hello
            .as_hello()
            .ok_or_else(|| ClientError::protocol(format!("expected Hello, got {hello}")))?;

        send(&mut ws, &GatewayMessage::identify(config.token.clone())).await?;

        let ready = next_frame(&mut ws).await?;
        if ready.session_event() != Some(SessionEvent::Ready) {
            return Err(ClientError::protocol(format!("expected READY, got {ready}")));
        }
        let payload: ReadyPayload = serde_json::from_value(ready.d.unwrap_or_default())?;

        Ok((
            Self {
                ws,
                heartbeat_interval: Duration::from_millis(hello.heartbeat_interval.max(1)),
                last_sequence: ready.s,
            },
            payload,
        ))
    }

    pub(super) async fn subscribe(&mut self, topics: &[Topic]) -> ClientResult<()> {
        send(&mut self.ws, &GatewayMessage::subscribe(topics)).await
    }

    pub(super) async fn close(&mut self) {
        if let Err(e) = self.ws.close(None).await {
            debug!(error = %e, "Close handshake failed");
        }
    }

    pub(super) async fn run(
        &mut self,
        commands: &mut mpsc::UnboundedReceiver<Command>,
        topics: &mut BTreeSet<Topic>,
        events: &mpsc::UnboundedSender<ClientEvent>,
        cache: &ReconciliationCache,
    ) -> SessionEnd {
        let mut heartbeat = interval(self.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        heartbeat.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    let beat = GatewayMessage::heartbeat(self.last_sequence);
                    if let Err(e) = send(&mut self.ws, &beat).await {
                        return SessionEnd::Lost(e);
                    }
                }
                command = commands.recv() => {
                    let Some(command) = command.filter(|c| !matches!(c, Command::Close)) else {
                        self.close().await;
                        return SessionEnd::ClientClosed;
                    };
                    if let Err(e) = self.handle_command(command, topics).await {
                        return SessionEnd::Lost(e);
                    }
                }
                frame = next_frame(&mut self.ws) => {
                    match frame {
                        Ok(message) => self.handle_frame(message, events, cache),
                        Err(e) => return SessionEnd::Lost(e),
                    }
                }
            }
        }
    }

    async fn handle_command(
        &mut self,
        command: Command,
        topics: &mut BTreeSet<Topic>,
    ) -> ClientResult<()> {
        match command {
            Command::Subscribe(requested) => {
                let added: Vec<Topic> = requested
                    .into_iter()
                    .filter(|topic| topics.insert(*topic))
                    .collect();
                if added.is_empty() {
                    return Ok(());
                }
                send(&mut self.ws, &GatewayMessage::subscribe(&added)).await
            }
            Command::Unsubscribe(requested) => {
                let removed: Vec<Topic> = requested
                    .into_iter()
                    .filter(|topic| topics.remove(topic))
                    .collect();
                if removed.is_empty() {
                    return Ok(());
                }
                send(&mut self.ws, &GatewayMessage::unsubscribe(&removed)).await
            }
            Command::Close => Ok(()),
        }
    }

    fn handle_frame(
        &mut self,
        message: GatewayMessage,
        events: &mpsc::UnboundedSender<ClientEvent>,
        cache: &ReconciliationCache,
    ) {
        match message.op {
            OpCode::Dispatch => {
                if message.s.is_some() {
                    self.last_sequence = message.s;
                }
                if let Some(event) = decode_dispatch(message, cache) {
                    // The receiver may have been dropped; the cache is still kept
                    let _ = events.send(event);
                }
            }
            OpCode::HeartbeatAck => trace!("Heartbeat acknowledged"),
            op => debug!(op = %op, "Ignoring unexpected frame"),
        }
    }
}

fn decode_dispatch(message: GatewayMessage, cache: &ReconciliationCache) -> Option<ClientEvent> {
    let session_event = message.session_event();
    let event_type = message.t?;
    let data = message.d.unwrap_or_default();

    match session_event {
        Some(SessionEvent::Subscribed | SessionEvent::Unsubscribed) => {
            let ack: SubscriptionAck = serde_json::from_value(data)
                .inspect_err(|e| warn!(error = %e, "Malformed subscription ack"))
                .ok()?;
            Some(if session_event == Some(SessionEvent::Subscribed) {
                ClientEvent::Subscribed(ack.topics)
            } else {
                ClientEvent::Unsubscribed(ack.topics)
            })
        }
        Some(SessionEvent::Ready) => None,
        None => match RealtimeEvent::from_dispatch(&event_type, data) {
            Ok(event) => {
                cache.apply(&event);
                Some(ClientEvent::Dispatch(event))
            }
            Err(e) => {
                warn!(event = %event_type, error = %e, "Skipping undecodable dispatch");
                None
            }
        },
    }
}

async fn send(ws: &mut WsStream, message: &GatewayMessage) -> ClientResult<()> {
    ws.send(WsMessage::Text(message.to_json()?)).await?;
    Ok(())
}

/// Next gateway frame. Control frames are skipped; a close frame ends the
/// session with the server's close code when it is one of ours.
async fn next_frame(ws: &mut WsStream) -> ClientResult<GatewayMessage> {
    loop {
        match ws.next().await {
            Some(Ok(WsMessage::Text(text))) => return Ok(GatewayMessage::from_json(&text)?),
            Some(Ok(WsMessage::Close(frame))) => {
                return Err(frame
                    .and_then(|f| CloseCode::from_u16(u16::from(f.code)))
                    .map_or(ClientError::ConnectionClosed, ClientError::Closed));
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.into()),
            None => return Err(ClientError::ConnectionClosed),
        }
    }
}
