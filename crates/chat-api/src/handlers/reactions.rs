//! Reaction handlers

use axum::{extract::State, Json};
use chat_core::ReactionSummary;
use chat_service::dto::{ToggleReactionRequest, ToggleReactionResponse};
use chat_service::ReactionService;

use crate::extractors::{AuthUser, MessageIdPath, SnowflakePath, ValidatedJson};
use crate::response::ApiResult;
use crate::state::AppState;

/// Toggle the caller's reaction
///
/// POST /messages/{message_id}/reactions
pub async fn toggle_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<MessageIdPath>,
    ValidatedJson(request): ValidatedJson<ToggleReactionRequest>,
) -> ApiResult<Json<ToggleReactionResponse>> {
    let message_id = path.message_id()?;

    let status = ReactionService::new(state.service_context())
        .toggle(auth.user_id, message_id, &request.emoji)
        .await?;
    Ok(Json(ToggleReactionResponse { status }))
}

/// Reaction tally as seen by the caller
///
/// GET /messages/{message_id}/reactions
pub async fn get_reactions(
    State(state): State<AppState>,
    auth: AuthUser,
    SnowflakePath(path): SnowflakePath<MessageIdPath>,
) -> ApiResult<Json<Vec<ReactionSummary>>> {
    let message_id = path.message_id()?;

    let tally = ReactionService::new(state.service_context())
        .tally(message_id, auth.user_id)
        .await?;
    Ok(Json(tally.into_entries()))
}
