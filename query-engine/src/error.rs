//! Error types for translation, execution and the document stores.
//!
//! The `Display` of [`QueryError`] is the exact text returned to callers of
//! [`crate::QueryEngine::run`], so variants carry user-facing messages.

use ai_llm_service::AiLlmError;
use thiserror::Error;

/// Failure of one engine stage.
#[derive(Debug, Error)]
pub enum QueryError {
    /// No sample document exists to describe the collection shape.
    #[error("No documents found in the collection '{0}' to derive a schema.")]
    EmptyCollection(String),

    /// The generation reply contains no complete JSON object.
    #[error("Error: Could not extract JSON object from the LLM response.")]
    Extraction,

    /// The extracted object is not valid JSON.
    #[error("Error parsing extracted JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),

    /// Valid JSON that does not describe a query.
    #[error("Error: invalid query descriptor: {0}")]
    InvalidDescriptor(String),

    /// The text-generation backend failed after retries.
    #[error("Error: text generation failed: {0}")]
    GenerationBackend(#[from] AiLlmError),

    /// The document store rejected or failed the request.
    #[error("Error: document store failure: {0}")]
    Store(#[from] StoreError),
}

impl QueryError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor(reason.into())
    }
}

/// Document store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// MongoDB driver errors (connection, server, cursor).
    #[error("mongodb: {0}")]
    Mongo(#[from] mongodb::error::Error),

    /// JSON ↔ BSON conversion failed.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// Operator or projection form the store does not evaluate.
    #[error("unsupported {0}")]
    Unsupported(String),

    /// Structurally invalid filter, projection or sort.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Missing or invalid environment configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),
}
