use serde::{Deserialize, Serialize};

/// Request payload for POST /chats/{id}/messages.
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

/// Response payload for DELETE /chats.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClearChatsResponse {
    pub deleted: u64,
}
