//! One chat turn: title on first message, query, persist both messages.

use std::sync::Arc;

use ai_llm_service::TextGenerator;
use query_engine::QueryEngine;
use tracing::{info, instrument};

use crate::error::ChatError;
use crate::model::{ChatMessage, ChatSession};
use crate::store::ChatStore;
use crate::title::generate_title;

/// Wires chat persistence to the query engine.
#[derive(Clone)]
pub struct Conversation {
    chats: Arc<dyn ChatStore>,
    engine: Arc<QueryEngine>,
    titles: Arc<dyn TextGenerator>,
    collection: String,
}

impl Conversation {
    /// `collection` is the data collection every chat message is run against.
    pub fn new(
        chats: Arc<dyn ChatStore>,
        engine: Arc<QueryEngine>,
        titles: Arc<dyn TextGenerator>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            chats,
            engine,
            titles,
            collection: collection.into(),
        }
    }

    pub fn chats(&self) -> &Arc<dyn ChatStore> {
        &self.chats
    }

    /// Sends `content` to chat `chat_id` and returns the updated session.
    ///
    /// Query failures do not fail the turn: their message becomes the
    /// assistant reply.
    #[instrument(skip(self, content), fields(collection = %self.collection))]
    pub async fn send(&self, chat_id: &str, content: &str) -> Result<ChatSession, ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let chat = self.chats.get(chat_id).await?;
        if chat.is_untitled() {
            let title = generate_title(self.titles.as_ref(), content).await;
            self.chats.set_title(chat_id, &title).await?;
        }

        let reply = self.engine.run(content, &self.collection).await;
        let updated = self
            .chats
            .append(
                chat_id,
                vec![ChatMessage::user(content), ChatMessage::assistant(reply)],
            )
            .await?;

        info!(messages = updated.messages.len(), "chat turn stored");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use ai_llm_service::GenerateFuture;
    use query_engine::MemoryStore;
    use serde_json::json;

    use crate::model::{ChatRole, NEW_CHAT_TITLE};
    use crate::store::MemoryChatStore;

    /// Returns replies in order, repeating the last one.
    struct Script {
        replies: Vec<&'static str>,
        calls: Mutex<usize>,
    }

    impl Script {
        fn new(replies: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                replies,
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    impl TextGenerator for Script {
        fn generate<'a>(&'a self, _prompt: &'a str) -> GenerateFuture<'a> {
            let mut n = self.calls.lock().unwrap();
            let reply = self.replies[(*n).min(self.replies.len() - 1)].to_string();
            *n += 1;
            Box::pin(async move { Ok::<_, ai_llm_service::AiLlmError>(reply) })
        }
    }

    async fn setup(titles: Arc<Script>) -> Conversation {
        let data = Arc::new(MemoryStore::new());
        data.insert("users", json!({"name": "Ann", "age": 34}))
            .await
            .unwrap();
        let queries = Script::new(vec![r#"{"find": "users", "filter": {"age": {"$gt": 30}}}"#]);
        let engine = Arc::new(QueryEngine::new(data, queries));
        Conversation::new(Arc::new(MemoryChatStore::new()), engine, titles, "users")
    }

    #[tokio::test]
    async fn first_message_titles_the_chat_and_stores_both_messages() {
        let titles = Script::new(vec!["\"Users Over Thirty\""]);
        let conv = setup(titles.clone()).await;
        let chat = conv.chats().create(NEW_CHAT_TITLE).await.unwrap();

        let updated = conv.send(&chat.id, "users older than 30").await.unwrap();

        assert_eq!(updated.title, "Users Over Thirty");
        assert_eq!(updated.messages.len(), 2);
        assert_eq!(updated.messages[0].role, ChatRole::User);
        assert_eq!(updated.messages[1].role, ChatRole::Assistant);
        assert!(updated.messages[1].content.contains("\"name\": \"Ann\""));

        conv.send(&chat.id, "and again").await.unwrap();
        assert_eq!(titles.calls(), 1);
    }

    #[tokio::test]
    async fn renamed_chats_keep_their_title() {
        let titles = Script::new(vec!["Ignored"]);
        let conv = setup(titles.clone()).await;
        let chat = conv.chats().create("My queries").await.unwrap();

        let updated = conv.send(&chat.id, "users").await.unwrap();
        assert_eq!(updated.title, "My queries");
        assert_eq!(titles.calls(), 0);
    }

    #[tokio::test]
    async fn blank_messages_and_unknown_chats_are_rejected() {
        let conv = setup(Script::new(vec!["x"])).await;
        assert!(matches!(
            conv.send("65a1f0c2e4b0a1b2c3d4e5f6", "   ").await,
            Err(ChatError::EmptyMessage)
        ));
        assert!(matches!(
            conv.send("65a1f0c2e4b0a1b2c3d4e5f6", "hello").await,
            Err(ChatError::NotFound(_))
        ));
    }
}
