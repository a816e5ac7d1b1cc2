//! API Integration Tests
//!
//! These tests require:
//! - Running PostgreSQL instance
//! - Environment variables: DATABASE_URL, JWT_SECRET
//!
//! Run with: cargo test -p integration-tests --test api_tests

use futures::future::join_all;
use integration_tests::{
    assert_json, assert_status, check_test_env, count_of, reacted, unique_id, MessageBody,
    MessageResponse, ReactionBody, ReactionSummary, TestServer, ToggleReactionResponse,
    ToggleStatus,
};
use reqwest::StatusCode;

async fn post_message(
    server: &TestServer,
    token: &str,
    channel: i64,
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

async fn toggle(server: &TestServer, token: &str, message: &MessageResponse) -> ToggleStatus {
    let response = server
        .post_auth(
            &format!("/messages/{}/reactions", message.id),
            token,
            &ReactionBody::thumbs_up(),
        )
        .await
        .unwrap();
    let body: ToggleReactionResponse = assert_json(response, StatusCode::OK).await.unwrap();
    body.status
}

async fn tally(
    server: &TestServer,
    token: &str,
    message: &MessageResponse,
) -> Vec<ReactionSummary> {
    let response = server
        .get_auth(&format!("/messages/{}/reactions", message.id), token)
        .await
        .unwrap();
    assert_json(response, StatusCode::OK).await.unwrap()
}

// ============================================================================
// Health Check Tests
// ============================================================================

#[tokio::test]
async fn test_health_check() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health").await.expect("Request failed");
    assert_status(response, StatusCode::OK).await.unwrap();
}

#[tokio::test]
async fn test_health_ready() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let response = server.get("/health/ready").await.expect("Request failed");
    let body: serde_json::Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["checks"]["database"], "healthy");
    assert_eq!(body["checks"]["event_router"], "healthy");
}

// ============================================================================
// Message Tests
// ============================================================================

#[tokio::test]
async fn test_requires_token() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let url = format!("{}/api/v1/channels/1/messages", server.base_url());
    let response = server.client.get(&url).send().await.unwrap();
    assert_status(response, StatusCode::UNAUTHORIZED).await.unwrap();
}

#[tokio::test]
async fn test_create_and_list_messages() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let user = unique_id();
    let token = server.token_for(user).unwrap();
    let channel = unique_id().into_inner();

    let first = post_message(&server, &token, channel, "first").await;
    let second = post_message(&server, &token, channel, "second").await;
    assert_eq!(first.author_id, user);
    assert_eq!(first.thread_count, 0);
    assert!(first.parent_id.is_none());

    let response = server
        .get_auth(&format!("/channels/{channel}/messages"), &token)
        .await
        .unwrap();
    let listed: Vec<MessageResponse> = assert_json(response, StatusCode::OK).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![first.id, second.id]);

    let response = server
        .get_auth(&format!("/messages/{}", second.id), &token)
        .await
        .unwrap();
    let fetched: MessageResponse = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(fetched.content, "second");
}

#[tokio::test]
async fn test_blank_content_rejected() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token_for(unique_id()).unwrap();
    let channel = unique_id();

    let response = server
        .post_auth(
            &format!("/channels/{channel}/messages"),
            &token,
            &MessageBody::new("   "),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();

    let too_long = "a".repeat(2001);
    let response = server
        .post_auth(
            &format!("/channels/{channel}/messages"),
            &token,
            &MessageBody::new(too_long),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::BAD_REQUEST).await.unwrap();
}

#[tokio::test]
async fn test_delete_is_author_only() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let author = server.token_for(unique_id()).unwrap();
    let other = server.token_for(unique_id()).unwrap();
    let message = post_message(&server, &author, unique_id().into_inner(), "mine").await;
    let path = format!("/messages/{}", message.id);

    let response = server.delete_auth(&path, &other).await.unwrap();
    assert_status(response, StatusCode::FORBIDDEN).await.unwrap();

    let response = server.delete_auth(&path, &author).await.unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    let response = server.get_auth(&path, &author).await.unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();

    let response = server.delete_auth(&path, &author).await.unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();
}

// ============================================================================
// Thread Tests
// ============================================================================

#[tokio::test]
async fn test_reply_updates_thread_count() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token_for(unique_id()).unwrap();
    let channel = unique_id();
    let parent = post_message(&server, &token, channel.into_inner(), "root").await;

    let response = server
        .post_auth(
            &format!("/messages/{}/replies", parent.id),
            &token,
            &MessageBody::new("reply"),
        )
        .await
        .unwrap();
    let reply: MessageResponse = assert_json(response, StatusCode::CREATED).await.unwrap();
    assert_eq!(reply.parent_id, Some(parent.id));
    assert_eq!(reply.channel_id, channel);

    let parent_path = format!("/messages/{}", parent.id);
    let fetched: MessageResponse =
        assert_json(server.get_auth(&parent_path, &token).await.unwrap(), StatusCode::OK)
            .await
            .unwrap();
    assert_eq!(fetched.thread_count, 1);

    let replies: Vec<MessageResponse> = assert_json(
        server
            .get_auth(&format!("/messages/{}/replies", parent.id), &token)
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await
    .unwrap();
    assert_eq!(replies.len(), 1);

    // Replies stay out of the channel listing
    let listed: Vec<MessageResponse> = assert_json(
        server
            .get_auth(&format!("/channels/{channel}/messages"), &token)
            .await
            .unwrap(),
        StatusCode::OK,
    )
    .await
    .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].thread_count, 1);

    let response = server
        .delete_auth(&format!("/messages/{}", reply.id), &token)
        .await
        .unwrap();
    assert_status(response, StatusCode::NO_CONTENT).await.unwrap();

    let fetched: MessageResponse =
        assert_json(server.get_auth(&parent_path, &token).await.unwrap(), StatusCode::OK)
            .await
            .unwrap();
    assert_eq!(fetched.thread_count, 0);
}

#[tokio::test]
async fn test_reply_to_missing_parent() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token_for(unique_id()).unwrap();

    let response = server
        .post_auth(
            &format!("/messages/{}/replies", unique_id()),
            &token,
            &MessageBody::new("orphan"),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();
}

// ============================================================================
// Reaction Tests
// ============================================================================

#[tokio::test]
async fn test_toggle_scenario() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let user_a = server.token_for(unique_id()).unwrap();
    let user_b = server.token_for(unique_id()).unwrap();
    let message = post_message(&server, &user_a, unique_id().into_inner(), "react").await;

    assert_eq!(toggle(&server, &user_a, &message).await, ToggleStatus::Added);

    assert_eq!(toggle(&server, &user_b, &message).await, ToggleStatus::Added);
    let seen_by_b = tally(&server, &user_b, &message).await;
    assert_eq!(count_of(&seen_by_b, "👍"), 2);
    assert!(reacted(&seen_by_b, "👍"));

    assert_eq!(toggle(&server, &user_a, &message).await, ToggleStatus::Removed);
    let seen_by_a = tally(&server, &user_a, &message).await;
    assert_eq!(count_of(&seen_by_a, "👍"), 1);
    assert!(!reacted(&seen_by_a, "👍"));
    assert_eq!(seen_by_a.len(), 6);
}

#[tokio::test]
async fn test_disallowed_emoji() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token_for(unique_id()).unwrap();
    let message = post_message(&server, &token, unique_id().into_inner(), "react").await;

    let response = server
        .post_auth(
            &format!("/messages/{}/reactions", message.id),
            &token,
            &ReactionBody::new("🦀"),
        )
        .await
        .unwrap();
    let body: serde_json::Value = assert_json(response, StatusCode::BAD_REQUEST).await.unwrap();
    assert_eq!(body["error"]["code"], "EMOJI_NOT_ALLOWED");
}

#[tokio::test]
async fn test_toggle_on_missing_message() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token_for(unique_id()).unwrap();

    let response = server
        .post_auth(
            &format!("/messages/{}/reactions", unique_id()),
            &token,
            &ReactionBody::thumbs_up(),
        )
        .await
        .unwrap();
    assert_status(response, StatusCode::NOT_FOUND).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_toggles_leave_at_most_one_row() {
    if !check_test_env().await {
        return;
    }

    let server = TestServer::start().await.expect("Failed to start server");
    let token = server.token_for(unique_id()).unwrap();
    let message = post_message(&server, &token, unique_id().into_inner(), "race").await;

    let toggles = (0..8).map(|_| toggle(&server, &token, &message));
    join_all(toggles).await;

    let count = count_of(&tally(&server, &token, &message).await, "👍");
    assert!(count <= 1, "count was {count}");
}
