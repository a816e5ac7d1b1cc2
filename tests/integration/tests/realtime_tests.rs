//! Realtime Integration Tests
//!
//! Writes go through the HTTP API; a gateway client subscribed to the
//! affected topics observes the resulting events.
//!
//! These tests require:
//! - Running PostgreSQL instance
//! - Environment variables: DATABASE_URL, JWT_SECRET
//!
//! Run with: cargo test -p integration-tests --test realtime_tests

use std::time::Duration;

use chat_client::ConnectionStatus;
use chat_core::{RealtimeEvent, Snowflake, ThreadedMessage, Topic};
use integration_tests::{
    assert_json, assert_quiet, assert_status, check_test_env, next_dispatch, unique_id,
    wait_ready, wait_subscribed, MessageBody, MessageResponse, ReactionBody, TestServer,
};
use reqwest::StatusCode;

async fn post_message(
    server: &TestServer,
    token: &str,
    channel: Snowflake,
    content: &str,
) -> MessageResponse {
    let response = server
        .post_auth(
            &format!("/channels/{channel}/messages"),
            token,
            &MessageBody::new(content),
        )
        .await
        .unwrap();
    assert_json(response, StatusCode::CREATED).await.unwrap()
}

async fn toggle_thumbs_up(server: &TestServer, token: &str, message_id: Snowflake) -> StatusCode {
    server
        .post_auth(
            &format!("/messages/{message_id}/reactions"),
            token,
            &ReactionBody::thumbs_up(),
        )
        .await
        .unwrap()
        .status()
}

fn thumbs_count(event: &RealtimeEvent) -> i64 {
    match event {
        RealtimeEvent::ReactionsUpdated(payload) => payload.reactions.count("👍"),
        other => panic!("expected REACTIONS_UPDATED, got {}", other.event_type()),
    }
}

#[tokio::test]
async fn test_message_created_reaches_channel_subscriber() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let author = unique_id();
    let token = server.token_for(author).unwrap();
    let channel = unique_id();

    let (client, mut events) = server.realtime_client(unique_id()).unwrap();
    client.connected().await.unwrap();
    client.subscribe([Topic::Channel(channel)]).unwrap();
    wait_subscribed(&mut events).await.unwrap();

    let posted = post_message(&server, &token, channel, "hello").await;

    match next_dispatch(&mut events).await.unwrap() {
        RealtimeEvent::MessageCreated(message) => {
            assert_eq!(message.id, posted.id);
            assert_eq!(message.author_id, author);
        }
        other => panic!("expected MESSAGE_CREATED, got {}", other.event_type()),
    }
    assert_eq!(client.cache().channel_messages(channel).len(), 1);

    client.close().await;
}

#[tokio::test]
async fn test_reaction_scenario_fan_out() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let user_a = server.token_for(unique_id()).unwrap();
    let user_b = server.token_for(unique_id()).unwrap();
    let message = post_message(&server, &user_a, unique_id(), "react").await;
    assert_eq!(toggle_thumbs_up(&server, &user_a, message.id).await, StatusCode::OK);

    let (watcher, mut events) = server.realtime_client(unique_id()).unwrap();
    watcher.connected().await.unwrap();
    watcher.subscribe([Topic::Reactions(message.id)]).unwrap();
    wait_subscribed(&mut events).await.unwrap();

    assert_eq!(toggle_thumbs_up(&server, &user_b, message.id).await, StatusCode::OK);
    assert_eq!(toggle_thumbs_up(&server, &user_a, message.id).await, StatusCode::OK);

    let first = next_dispatch(&mut events).await.unwrap();
    let second = next_dispatch(&mut events).await.unwrap();
    assert_eq!(thumbs_count(&first), 2);
    assert_eq!(thumbs_count(&second), 1);

    assert_quiet(&mut events, Duration::from_millis(300)).await.unwrap();
    watcher.close().await;
}

#[tokio::test]
async fn test_thread_scenario_fan_out() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token_for(unique_id()).unwrap();
    let parent = post_message(&server, &token, unique_id(), "root").await;

    let (watcher, mut events) = server.realtime_client(unique_id()).unwrap();
    watcher.connected().await.unwrap();
    watcher.cache().seed([ThreadedMessage {
        message: chat_core::Message {
            id: parent.id,
            channel_id: parent.channel_id,
            parent_id: None,
            author_id: parent.author_id,
            content: parent.content.clone(),
            created_at: parent.created_at,
        },
        thread_count: parent.thread_count,
    }]);
    watcher.subscribe([Topic::Thread(parent.id)]).unwrap();
    wait_subscribed(&mut events).await.unwrap();

    let response = server
        .post_auth(
            &format!("/messages/{}/replies", parent.id),
            &token,
            &MessageBody::new("reply"),
        )
        .await
        .unwrap();
    let reply: MessageResponse = assert_json(response, StatusCode::CREATED).await.unwrap();

    match next_dispatch(&mut events).await.unwrap() {
        RealtimeEvent::ThreadReplyCreated(payload) => {
            assert_eq!(payload.reply.id, reply.id);
            assert_eq!(payload.thread_count, 1);
        }
        other => panic!("expected THREAD_REPLY_CREATED, got {}", other.event_type()),
    }
    assert_eq!(watcher.cache().get(parent.id).unwrap().thread_count, 1);

    let response = server
        .delete_auth(&format!("/messages/{}", reply.id), &token)
        .await
        .unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    match next_dispatch(&mut events).await.unwrap() {
        RealtimeEvent::ThreadReplyDeleted(payload) => {
            assert_eq!(payload.reply_id, reply.id);
            assert_eq!(payload.thread_count, 0);
        }
        other => panic!("expected THREAD_REPLY_DELETED, got {}", other.event_type()),
    }
    assert_eq!(watcher.cache().get(parent.id).unwrap().thread_count, 0);
    assert!(watcher.cache().replies(parent.id).is_empty());

    watcher.close().await;
}

#[tokio::test]
async fn test_message_deleted_on_message_topic() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token_for(unique_id()).unwrap();
    let message = post_message(&server, &token, unique_id(), "short-lived").await;

    let (watcher, mut events) = server.realtime_client(unique_id()).unwrap();
    watcher.connected().await.unwrap();
    watcher.subscribe([Topic::Message(message.id)]).unwrap();
    wait_subscribed(&mut events).await.unwrap();

    let response = server
        .delete_auth(&format!("/messages/{}", message.id), &token)
        .await
        .unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    match next_dispatch(&mut events).await.unwrap() {
        RealtimeEvent::MessageDeleted(payload) => {
            assert_eq!(payload.message_id, message.id);
            assert_eq!(payload.channel_id, message.channel_id);
        }
        other => panic!("expected MESSAGE_DELETED, got {}", other.event_type()),
    }

    watcher.close().await;
}

#[tokio::test]
async fn test_failed_writes_publish_nothing() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token_for(unique_id()).unwrap();
    let missing = unique_id();
    let existing = post_message(&server, &token, unique_id(), "exists").await;

    let (watcher, mut events) = server.realtime_client(unique_id()).unwrap();
    watcher.connected().await.unwrap();
    watcher
        .subscribe([
            Topic::Reactions(missing),
            Topic::Thread(missing),
            Topic::Reactions(existing.id),
        ])
        .unwrap();
    wait_subscribed(&mut events).await.unwrap();

    assert_eq!(toggle_thumbs_up(&server, &token, missing).await, StatusCode::NOT_FOUND);
    let response = server
        .post_auth(
            &format!("/messages/{missing}/replies"),
            &token,
            &MessageBody::new("orphan"),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();

    let response = server
        .post_auth(
            &format!("/messages/{}/reactions", existing.id),
            &token,
            &ReactionBody::new("🦀"),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();

    // The first event through is the only write that succeeded
    assert_eq!(toggle_thumbs_up(&server, &token, existing.id).await, StatusCode::OK);
    let event = next_dispatch(&mut events).await.unwrap();
    assert_eq!(event.message_id(), existing.id);
    assert_eq!(thumbs_count(&event), 1);

    watcher.close().await;
}

#[tokio::test]
async fn test_reconnect_resumes_without_replay() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token_for(unique_id()).unwrap();
    let channel = unique_id();

    let (client, mut events) = server.realtime_client(unique_id()).unwrap();
    client.connected().await.unwrap();
    wait_ready(&mut events).await.unwrap();
    client.subscribe([Topic::Channel(channel)]).unwrap();
    wait_subscribed(&mut events).await.unwrap();

    server.drop_gateway_connections();
    client
        .wait_for_status(|s| matches!(s, ConnectionStatus::Reconnecting { .. }))
        .await
        .unwrap();

    let missed = post_message(&server, &token, channel, "while away").await;

    wait_ready(&mut events).await.unwrap();
    assert_eq!(
        wait_subscribed(&mut events).await.unwrap(),
        vec![Topic::Channel(channel)]
    );

    let after = post_message(&server, &token, channel, "after").await;
    let event = next_dispatch(&mut events).await.unwrap();
    assert_eq!(event.message_id(), after.id);
    assert!(!client.cache().contains(missed.id));

    client.close().await;
}
