//! Chat session records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to sessions until their first message is summarized.
pub const NEW_CHAT_TITLE: &str = "New Chat";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// One conversation. `id` is a 24-char hex ObjectId.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
}

impl ChatSession {
    /// Whether the session still carries the placeholder title and no messages.
    pub fn is_untitled(&self) -> bool {
        self.messages.is_empty() && self.title == NEW_CHAT_TITLE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn roles_serialize_lowercase() {
        let v = serde_json::to_value(ChatMessage::assistant("hi")).unwrap();
        assert_eq!(v, json!({"role": "assistant", "content": "hi"}));
    }
}
