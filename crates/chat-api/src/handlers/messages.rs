//! Message handlers
//!
//! Top-level channel messages plus single-message lookup and delete.

use axum::{extract::State, Json};
use chat_service::dto::{CreateMessageRequest, MessageResponse};
use chat_service::MessageService;

use crate::extractors::{AuthUser, ChannelIdPath, MessageIdPath, SnowflakePath, ValidatedJson};
use crate::response::{ApiResult, Created, NoContent};
use crate::state::AppState;

/// Post a top-level message
///
/// POST /channels/{channel_id}/messages
pub async fn create_message(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<ChannelIdPath>,
    ValidatedJson(request): ValidatedJson<CreateMessageRequest>,
) -> ApiResult<Created<Json<MessageResponse>>> {
    let channel_id = path.channel_id()?;

    let message = MessageService::new(state.service_context())
        .create_message(channel_id, auth.user_id, request)
        .await?;
    Ok(Created(Json(message.into())))
}

/// List a channel's top-level messages, oldest first
///
/// GET /channels/{channel_id}/messages
pub async fn list_channel_messages(
    State(state): State<AppState>,
    _auth: AuthUser,
    SnowflakePath(path): SnowflakePath<ChannelIdPath>,
) -> ApiResult<Json<Vec<MessageResponse>>> {
    let channel_id = path.channel_id()?;

    let messages = MessageService::new(state.service_context())
        .list_channel_messages(channel_id)
        .await?;
    Ok(Json(messages.into_iter().map(MessageResponse::from).collect()))
}

/// Get one message with its thread count
///
/// GET /messages/{message_id}
pub async fn get_message(
    State(state): State<AppState>,
    _auth: AuthUser,
    SnowflakePath(path): SnowflakePath<MessageIdPath>,
) -> ApiResult<Json<MessageResponse>> {
    let message_id = path.message_id()?;

    let message = MessageService::new(state.service_context())
        .get_message(message_id)
        .await?;
    Ok(Json(message.into()))
}

/// Delete a message (author only)
///
/// DELETE /messages/{message_id}
pub async fn delete_message(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<MessageIdPath>,
) -> ApiResult<NoContent> {
    let message_id = path.message_id()?;

    MessageService::new(state.service_context())
        .delete_message(message_id, auth.user_id)
        .await?;
    Ok(NoContent)
}
