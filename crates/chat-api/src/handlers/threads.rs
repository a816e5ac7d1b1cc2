//! Thread reply handlers

use axum::{extract::State, Json};
use chat_service::dto::{CreateMessageRequest, MessageResponse};
use chat_service::ThreadService;

use crate::extractors::{AuthUser, MessageIdPath, SnowflakePath, ValidatedJson};
use crate::response::{ApiResult, Created};
use crate::state::AppState;

/// Reply to a message
///
/// POST /messages/{message_id}/replies
pub async fn create_reply(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<MessageIdPath>,
    ValidatedJson(request): ValidatedJson<CreateMessageRequest>,
) -> ApiResult<Created<Json<MessageResponse>>> {
    let parent_id = path.message_id()?;

    let reply = ThreadService::new(state.service_context())
        .create_reply(parent_id, auth.user_id, request)
        .await?;
    Ok(Created(Json(reply.into())))
}

/// Replies to a message, oldest first
///
/// GET /messages/{message_id}/replies
pub async fn list_replies(
    State(state): State<AppState>,
    _auth: AuthUser,
    SnowflakePath(path): SnowflakePath<MessageIdPath>,
) -> ApiResult<Json<Vec<MessageResponse>>> {
    let parent_id = path.message_id()?;

    let replies = ThreadService::new(state.service_context())
        .list_replies(parent_id)
        .await?;
    Ok(Json(replies.into_iter().map(MessageResponse::from).collect()))
}
