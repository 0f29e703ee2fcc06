use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{ChatFuture, ChatStore, parse_id};
use crate::cfg::ChatStoreConfig;
use crate::error::ChatError;
use crate::model::{ChatMessage, ChatSession};

/// Stored shape: `{_id, title, messages, created_at}`.
#[derive(Debug, Serialize, Deserialize)]
struct ChatRecord {
    #[serde(rename = "_id")]
    id: ObjectId,
    title: String,
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<bson::DateTime>,
}

impl From<ChatRecord> for ChatSession {
    fn from(r: ChatRecord) -> Self {
        // Older records have no created_at; the ObjectId carries a timestamp.
        let millis = r.created_at.unwrap_or_else(|| r.id.timestamp()).timestamp_millis();
        Self {
            id: r.id.to_hex(),
            title: r.title,
            messages: r.messages,
            created_at: DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_else(Utc::now),
        }
    }
}

/// [`ChatStore`] over a MongoDB collection.
#[derive(Clone, Debug)]
pub struct MongoChatStore {
    coll: Collection<ChatRecord>,
}

impl MongoChatStore {
    pub async fn connect(cfg: &ChatStoreConfig) -> Result<Self, ChatError> {
        let client = Client::with_uri_str(&cfg.uri).await?;
        info!(database = %cfg.database, collection = %cfg.collection, "chat store initialized");
        Ok(Self::from_client(&client, &cfg.database, &cfg.collection))
    }

    pub fn from_client(client: &Client, database: &str, collection: &str) -> Self {
        Self {
            coll: client.database(database).collection(collection),
        }
    }

    async fn create_impl(&self, title: &str) -> Result<ChatSession, ChatError> {
        let record = ChatRecord {
            id: ObjectId::new(),
            title: title.to_string(),
            messages: Vec::new(),
            created_at: Some(bson::DateTime::now()),
        };
        self.coll.insert_one(&record).await?;
        debug!(id = %record.id, "chat created");
        Ok(record.into())
    }

    async fn list_impl(&self) -> Result<Vec<ChatSession>, ChatError> {
        let cursor = self.coll.find(doc! {}).sort(doc! { "_id": 1 }).await?;
        let records: Vec<ChatRecord> = cursor.try_collect().await?;
        Ok(records.into_iter().map(ChatSession::from).collect())
    }

    async fn get_impl(&self, id: &str) -> Result<ChatSession, ChatError> {
        let oid = parse_id(id)?;
        self.coll
            .find_one(doc! { "_id": oid })
            .await?
            .map(ChatSession::from)
            .ok_or_else(|| ChatError::NotFound(id.to_string()))
    }

    async fn update_impl(&self, id: &str, update: bson::Document) -> Result<ChatSession, ChatError> {
        let oid = parse_id(id)?;
        self.coll
            .find_one_and_update(doc! { "_id": oid }, update)
            .return_document(ReturnDocument::After)
            .await?
            .map(ChatSession::from)
            .ok_or_else(|| ChatError::NotFound(id.to_string()))
    }

    async fn append_impl(
        &self,
        id: &str,
        messages: Vec<ChatMessage>,
    ) -> Result<ChatSession, ChatError> {
        let each = bson::to_bson(&messages)?;
        self.update_impl(id, doc! { "$push": { "messages": { "$each": each } } })
            .await
    }
}

impl ChatStore for MongoChatStore {
    fn create<'a>(&'a self, title: &'a str) -> ChatFuture<'a, ChatSession> {
        Box::pin(self.create_impl(title))
    }

    fn list(&self) -> ChatFuture<'_, Vec<ChatSession>> {
        Box::pin(self.list_impl())
    }

    fn get<'a>(&'a self, id: &'a str) -> ChatFuture<'a, ChatSession> {
        Box::pin(self.get_impl(id))
    }

    fn append<'a>(
        &'a self,
        id: &'a str,
        messages: Vec<ChatMessage>,
    ) -> ChatFuture<'a, ChatSession> {
        Box::pin(self.append_impl(id, messages))
    }

    fn set_title<'a>(&'a self, id: &'a str, title: &'a str) -> ChatFuture<'a, ChatSession> {
        Box::pin(self.update_impl(id, doc! { "$set": { "title": title } }))
    }

    fn clear(&self) -> ChatFuture<'_, u64> {
        Box::pin(async move {
            let res = self.coll.delete_many(doc! {}).await?;
            info!(deleted = res.deleted_count, "chats cleared");
            Ok::<_, ChatError>(res.deleted_count)
        })
    }
}
