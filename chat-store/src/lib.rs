//! Chat sessions on top of the query engine.
//!
//! Each session is `{title, messages: [{role, content}]}`. A turn stores the
//! user's message and the engine's answer, and the first message of a fresh
//! session is summarized into its title.

pub mod cfg;
mod conversation;
mod error;
mod model;
pub mod store;
pub mod title;

pub use cfg::ChatStoreConfig;
pub use conversation::Conversation;
pub use error::ChatError;
pub use model::{ChatMessage, ChatRole, ChatSession, NEW_CHAT_TITLE};
pub use store::{ChatFuture, ChatStore, MemoryChatStore, MongoChatStore};
pub use title::generate_title;
