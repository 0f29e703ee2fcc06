use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;
use tracing::debug;

use super::{ChatFuture, ChatStore, parse_id};
use crate::error::ChatError;
use crate::model::{ChatMessage, ChatSession};

/// In-memory [`ChatStore`]; ids are real ObjectIds so validation matches
/// [`super::MongoChatStore`].
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    chats: RwLock<Vec<ChatSession>>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn update(
        &self,
        id: &str,
        apply: impl FnOnce(&mut ChatSession) + Send,
    ) -> Result<ChatSession, ChatError> {
        let oid = parse_id(id)?.to_hex();
        let mut chats = self.chats.write().await;
        let chat = chats
            .iter_mut()
            .find(|c| c.id == oid)
            .ok_or_else(|| ChatError::NotFound(id.to_string()))?;
        apply(chat);
        Ok(chat.clone())
    }
}

impl ChatStore for MemoryChatStore {
    fn create<'a>(&'a self, title: &'a str) -> ChatFuture<'a, ChatSession> {
        Box::pin(async move {
            let chat = ChatSession {
                id: ObjectId::new().to_hex(),
                title: title.to_string(),
                messages: Vec::new(),
                created_at: Utc::now(),
            };
            self.chats.write().await.push(chat.clone());
            debug!(id = %chat.id, "chat created");
            Ok::<_, ChatError>(chat)
        })
    }

    fn list(&self) -> ChatFuture<'_, Vec<ChatSession>> {
        Box::pin(async move { Ok::<_, ChatError>(self.chats.read().await.clone()) })
    }

    fn get<'a>(&'a self, id: &'a str) -> ChatFuture<'a, ChatSession> {
        Box::pin(async move {
            let oid = parse_id(id)?.to_hex();
            self.chats
                .read()
                .await
                .iter()
                .find(|c| c.id == oid)
                .cloned()
                .ok_or_else(|| ChatError::NotFound(id.to_string()))
        })
    }

    fn append<'a>(
        &'a self,
        id: &'a str,
        messages: Vec<ChatMessage>,
    ) -> ChatFuture<'a, ChatSession> {
        Box::pin(self.update(id, move |c| c.messages.extend(messages)))
    }

    fn set_title<'a>(&'a self, id: &'a str, title: &'a str) -> ChatFuture<'a, ChatSession> {
        Box::pin(self.update(id, move |c| c.title = title.to_string()))
    }

    fn clear(&self) -> ChatFuture<'_, u64> {
        Box::pin(async move {
            let mut chats = self.chats.write().await;
            let n = chats.len() as u64;
            chats.clear();
            Ok::<_, ChatError>(n)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NEW_CHAT_TITLE;

    #[tokio::test]
    async fn create_append_and_list_in_order() {
        let store = MemoryChatStore::new();
        let a = store.create(NEW_CHAT_TITLE).await.unwrap();
        let b = store.create("Second").await.unwrap();

        let updated = store
            .append(&a.id, vec![ChatMessage::user("q"), ChatMessage::assistant("r")])
            .await
            .unwrap();
        assert_eq!(updated.messages.len(), 2);

        let titles: Vec<_> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.title)
            .collect();
        assert_eq!(titles, [NEW_CHAT_TITLE, "Second"]);
        assert_eq!(store.get(&b.id).await.unwrap().title, "Second");
    }

    #[tokio::test]
    async fn unknown_and_malformed_ids() {
        let store = MemoryChatStore::new();
        let missing = ObjectId::new().to_hex();
        assert!(matches!(
            store.get(&missing).await,
            Err(ChatError::NotFound(_))
        ));
        assert!(matches!(
            store.set_title("not-an-id", "x").await,
            Err(ChatError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn clear_reports_deleted_count() {
        let store = MemoryChatStore::new();
        store.create("a").await.unwrap();
        store.create("b").await.unwrap();
        assert_eq!(store.clear().await.unwrap(), 2);
        assert!(store.list().await.unwrap().is_empty());
    }
}
