//! Chat session persistence.

mod memory;
mod mongo;

use std::future::Future;
use std::pin::Pin;

use mongodb::bson::oid::ObjectId;

pub use memory::MemoryChatStore;
pub use mongo::MongoChatStore;

use crate::error::ChatError;
use crate::model::{ChatMessage, ChatSession};

pub type ChatFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ChatError>> + Send + 'a>>;

/// CRUD over chat sessions. Sessions are listed in creation order.
pub trait ChatStore: Send + Sync {
    /// Creates an empty session with the given title.
    fn create<'a>(&'a self, title: &'a str) -> ChatFuture<'a, ChatSession>;

    fn list(&self) -> ChatFuture<'_, Vec<ChatSession>>;

    /// # Errors
    /// [`ChatError::InvalidId`] for malformed ids, [`ChatError::NotFound`]
    /// for unknown ones. The same applies to every id-taking method.
    fn get<'a>(&'a self, id: &'a str) -> ChatFuture<'a, ChatSession>;

    /// Appends messages in order and returns the updated session.
    fn append<'a>(
        &'a self,
        id: &'a str,
        messages: Vec<ChatMessage>,
    ) -> ChatFuture<'a, ChatSession>;

    fn set_title<'a>(&'a self, id: &'a str, title: &'a str) -> ChatFuture<'a, ChatSession>;

    /// Deletes every session; returns how many were removed.
    fn clear(&self) -> ChatFuture<'_, u64>;
}

pub(crate) fn parse_id(id: &str) -> Result<ObjectId, ChatError> {
    ObjectId::parse_str(id.trim()).map_err(|_| ChatError::InvalidId(id.to_string()))
}
