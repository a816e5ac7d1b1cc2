//! Route definitions
//!
//! Message, thread and reaction routes are mounted under /api/v1. Health
//! checks sit at the root so probes bypass rate limiting.

use axum::{routing::get, Router};

use crate::handlers::{health, messages, reactions, threads};
use crate::state::AppState;

/// Create the main API router with all authenticated routes
pub fn create_router() -> Router<AppState> {
    Router::new().nest("/api/v1", api_v1_routes())
}

/// Health check routes (exported separately to bypass rate limiting)
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route("/health/realtime", get(health::realtime_stats))
}

/// API v1 routes
fn api_v1_routes() -> Router<AppState> {
    Router::new()
        .merge(channel_routes())
        .merge(message_routes())
}

/// Channel routes
fn channel_routes() -> Router<AppState> {
    Router::new().route(
        "/channels/:channel_id/messages",
        get(messages::list_channel_messages).post(messages::create_message),
    )
}

/// Message routes: lookup, delete, replies and reactions
fn message_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/messages/:message_id",
            get(messages::get_message).delete(messages::delete_message),
        )
        .route(
            "/messages/:message_id/replies",
            get(threads::list_replies).post(threads::create_reply),
        )
        .route(
            "/messages/:message_id/reactions",
            get(reactions::get_reactions).post(reactions::toggle_reaction),
        )
}

