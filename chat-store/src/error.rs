use thiserror::Error;

/// Chat persistence and conversation failures.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat not found: {0}")]
    NotFound(String),

    #[error("invalid chat id: {0}")]
    InvalidId(String),

    #[error("message content is empty")]
    EmptyMessage,

    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("conversion error: {0}")]
    Conversion(String),
}

impl From<mongodb::bson::ser::Error> for ChatError {
    fn from(e: mongodb::bson::ser::Error) -> Self {
        Self::Conversion(e.to_string())
    }
}
