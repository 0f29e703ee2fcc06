//! Chat session endpoints.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chat_store::{ChatSession, NEW_CHAT_TITLE};
use tracing::info;

use crate::{
    core::app_state::AppState,
    error_handler::AppResult,
    routes::chats::chat_request::{ClearChatsResponse, SendMessageRequest},
};

/// Handler: POST /chats
pub async fn create_chat(
    State(state): State<Arc<AppState>>,
) -> AppResult<(StatusCode, Json<ChatSession>)> {
    let chat = state.conversation.chats().create(NEW_CHAT_TITLE).await?;
    info!(id = %chat.id, "chat created");
    Ok((StatusCode::CREATED, Json(chat)))
}

/// Handler: GET /chats
pub async fn list_chats(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<ChatSession>>> {
    Ok(Json(state.conversation.chats().list().await?))
}

/// Handler: GET /chats/{id}
pub async fn get_chat(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ChatSession>> {
    Ok(Json(state.conversation.chats().get(&id).await?))
}

/// Handler: POST /chats/{id}/messages
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8000/chats/6650c0ffee0000000000abcd/messages \
///   -H 'content-type: application/json' \
///   -d '{"content":"how many users live in Lyon?"}'
/// ```
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<SendMessageRequest>,
) -> AppResult<Json<ChatSession>> {
    Ok(Json(state.conversation.send(&id, &body.content).await?))
}

/// Handler: DELETE /chats
pub async fn clear_chats(State(state): State<Arc<AppState>>) -> AppResult<Json<ClearChatsResponse>> {
    let deleted = state.conversation.chats().clear().await?;
    info!(deleted, "chat history cleared");
    Ok(Json(ClearChatsResponse { deleted }))
}
