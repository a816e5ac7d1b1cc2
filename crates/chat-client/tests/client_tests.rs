//! Client against a real `/gateway` route on an ephemeral port

use std::sync::Arc;
use std::time::Duration;

use chat_client::{
    ClientConfig, ClientError, ClientEvent, ConnectionStatus, RealtimeClient, ReconnectPolicy,
};
use chat_common::{JwtService, RealtimeConfig};
use chat_core::{
    EmojiCount, EventPublisher, Message, ReactionTally, ReactionsUpdatedPayload, RealtimeEvent, Snowflake,
    ThreadedMessage, Topic,
};
use chat_realtime::{routes, ConnectionManager, EventRouter, RealtimeState, RouterTask};
use tokio::sync::mpsc::UnboundedReceiver;

const SECRET: &str = "client-test-secret-0123456789";
const CHANNEL: Snowflake = Snowflake::new(100);

struct Gateway {
    url: String,
    router: EventRouter,
    manager: Arc<ConnectionManager>,
    jwt: Arc<JwtService>,
    _task: RouterTask,
}

impl Gateway {
    async fn start() -> Self {
        let config = RealtimeConfig::default();
        let (router, task) = EventRouter::spawn();
        let manager = Arc::new(ConnectionManager::new(router.clone(), config.max_subscriptions));
        let jwt = Arc::new(JwtService::new(SECRET, 900));
        let state = RealtimeState::new(Arc::clone(&manager), Arc::clone(&jwt), config);
        let app: axum::Router = routes(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            url: format!("ws://{addr}/gateway"),
            router,
            manager,
            jwt,
            _task: task,
        }
    }

    fn config(&self, user: i64) -> ClientConfig {
        let token = self.jwt.issue_access_token(Snowflake::new(user)).unwrap();
        ClientConfig::new(self.url.clone(), token)
            .with_reconnect(ReconnectPolicy::new(5, Duration::from_millis(100)))
    }
}

fn message(id: i64, content: &str) -> Message {
    Message::new(Snowflake::new(id), CHANNEL, Snowflake::new(1), content.to_string())
}

async fn next_event(events: &mut UnboundedReceiver<ClientEvent>) -> ClientEvent {
    tokio::time::timeout(Duration::from_secs(3), events.recv())
        .await
        .expect("event before timeout")
        .expect("client running")
}

/// Skip session bookkeeping until the next domain event
async fn next_dispatch(events: &mut UnboundedReceiver<ClientEvent>) -> RealtimeEvent {
    loop {
        if let ClientEvent::Dispatch(event) = next_event(events).await {
            return event;
        }
    }
}

async fn wait_subscribed(events: &mut UnboundedReceiver<ClientEvent>) -> Vec<Topic> {
    loop {
        if let ClientEvent::Subscribed(topics) = next_event(events).await {
            return topics;
        }
    }
}

async fn wait_ready(events: &mut UnboundedReceiver<ClientEvent>) -> Snowflake {
    loop {
        if let ClientEvent::Ready(ready) = next_event(events).await {
            return ready.user_id;
        }
    }
}

#[tokio::test]
async fn test_connect_identifies_and_sets_viewer() {
    let gateway = Gateway::start().await;
    let (client, mut events) = RealtimeClient::connect(gateway.config(42));

    client.connected().await.unwrap();
    assert_eq!(wait_ready(&mut events).await, Snowflake::new(42));
    assert_eq!(client.status(), ConnectionStatus::Connected);
    assert_eq!(client.cache().viewer(), Some(Snowflake::new(42)));

    client.close().await;
}

#[tokio::test]
async fn test_subscribed_events_reach_the_cache() {
    let gateway = Gateway::start().await;
    let (client, mut events) = RealtimeClient::connect(gateway.config(1));
    client.connected().await.unwrap();

    client.subscribe([Topic::Channel(CHANNEL)]).unwrap();
    assert_eq!(wait_subscribed(&mut events).await, vec![Topic::Channel(CHANNEL)]);

    gateway
        .router
        .emit(RealtimeEvent::MessageCreated(message(10, "hello")))
        .unwrap();

    let event = next_dispatch(&mut events).await;
    assert_eq!(event.message_id(), Snowflake::new(10));
    let cached = client.cache().channel_messages(CHANNEL);
    assert_eq!(cached.len(), 1);
    assert_eq!(cached[0].message.content, "hello");

    client.close().await;
}

#[tokio::test]
async fn test_unsubscribed_topic_is_silent() {
    let gateway = Gateway::start().await;
    let (client, mut events) = RealtimeClient::connect(gateway.config(1));
    client.connected().await.unwrap();

    let other = Topic::Channel(Snowflake::new(200));
    client.subscribe([Topic::Channel(CHANNEL), other]).unwrap();
    wait_subscribed(&mut events).await;
    client.unsubscribe([Topic::Channel(CHANNEL)]).unwrap();
    loop {
        if let ClientEvent::Unsubscribed(topics) = next_event(&mut events).await {
            assert_eq!(topics, vec![Topic::Channel(CHANNEL)]);
            break;
        }
    }

    gateway
        .router
        .emit(RealtimeEvent::MessageCreated(message(10, "missed")))
        .unwrap();
    let on_other = Message::new(
        Snowflake::new(11),
        Snowflake::new(200),
        Snowflake::new(1),
        "seen".to_string(),
    );
    gateway
        .router
        .emit(RealtimeEvent::MessageCreated(on_other))
        .unwrap();

    let event = next_dispatch(&mut events).await;
    assert_eq!(event.message_id(), Snowflake::new(11));
    assert!(!client.cache().contains(Snowflake::new(10)));

    client.close().await;
}

#[tokio::test]
async fn test_reconnect_resubscribes_without_replay() {
    let gateway = Gateway::start().await;
    let (client, mut events) = RealtimeClient::connect(gateway.config(1));
    client.connected().await.unwrap();
    wait_ready(&mut events).await;

    client.subscribe([Topic::Channel(CHANNEL)]).unwrap();
    wait_subscribed(&mut events).await;

    // Server-initiated close with ServerShutdown, which is retryable
    gateway.manager.close_all();
    client
        .wait_for_status(|s| matches!(s, ConnectionStatus::Reconnecting { .. }))
        .await
        .unwrap();

    gateway
        .router
        .emit(RealtimeEvent::MessageCreated(message(20, "while away")))
        .unwrap();

    wait_ready(&mut events).await;
    assert_eq!(wait_subscribed(&mut events).await, vec![Topic::Channel(CHANNEL)]);

    gateway
        .router
        .emit(RealtimeEvent::MessageCreated(message(21, "after")))
        .unwrap();

    let event = next_dispatch(&mut events).await;
    assert_eq!(event.message_id(), Snowflake::new(21));
    assert!(!client.cache().contains(Snowflake::new(20)));

    client.close().await;
}

#[tokio::test]
async fn test_reactions_from_others_keep_local_flag() {
    let gateway = Gateway::start().await;
    let (client, mut events) = RealtimeClient::connect(gateway.config(1));
    client.connected().await.unwrap();
    wait_ready(&mut events).await;

    client.cache().seed([ThreadedMessage {
        message: message(10, "root"),
        thread_count: 0,
    }]);
    client.subscribe([Topic::Reactions(Snowflake::new(10))]).unwrap();
    wait_subscribed(&mut events).await;

    // User 2 added the only 👍; the published flag is theirs, not ours
    let tally = ReactionTally::from_counts(&[EmojiCount {
        emoji: "👍".to_string(),
        count: 1,
        reacted: true,
    }]);
    gateway
        .router
        .emit(RealtimeEvent::ReactionsUpdated(ReactionsUpdatedPayload {
            message_id: Snowflake::new(10),
            user_id: Snowflake::new(2),
            reactions: tally,
        }))
        .unwrap();
    next_dispatch(&mut events).await;

    let cached = client.cache().get(Snowflake::new(10)).unwrap();
    let thumbs = cached.reactions.unwrap().get("👍").cloned().unwrap();
    assert_eq!(thumbs.count, 1);
    assert!(!thumbs.has_reacted);

    client.close().await;
}

#[tokio::test]
async fn test_rejected_token_is_terminal() {
    let gateway = Gateway::start().await;
    let config = ClientConfig::new(gateway.url.clone(), "not-a-token");
    let (client, _events) = RealtimeClient::connect(config);

    let err = client.connected().await.unwrap_err();
    assert!(matches!(err, ClientError::ConnectionClosed));
    assert_eq!(client.status(), ConnectionStatus::Disconnected);
}

#[tokio::test]
async fn test_gives_up_after_bounded_attempts() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let config = ClientConfig::new(format!("ws://{addr}/gateway"), "token")
        .with_reconnect(ReconnectPolicy::new(3, Duration::from_millis(200)));
    let (client, _events) = RealtimeClient::connect(config);
    let mut status = client.watch_status();

    let mut attempts = Vec::new();
    loop {
        let current = *status.borrow_and_update();
        match current {
            ConnectionStatus::Reconnecting { attempt } if attempts.last() != Some(&attempt) => {
                attempts.push(attempt);
            }
            ConnectionStatus::Disconnected => break,
            _ => {}
        }
        tokio::time::timeout(Duration::from_secs(3), status.changed())
            .await
            .expect("status change before timeout")
            .ok();
    }

    assert_eq!(attempts, vec![1, 2, 3]);
    assert!(client.connected().await.is_err());
}
