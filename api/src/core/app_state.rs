use std::sync::Arc;

use ai_llm_service::{AiLlmError, LlmProfilesConfig, LlmServiceProfiles, llm_profiles_from_env};
use chat_store::{ChatStoreConfig, Conversation, MongoChatStore};
use query_engine::{MongoStore, QueryEngine, StoreConfig};
use thiserror::Error;
use tracing::info;

use crate::error_handler::AppError;

pub const DEFAULT_API_ADDRESS: &str = "127.0.0.1:8000";

/// Startup configuration failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("document store config: {0}")]
    Store(#[from] query_engine::ConfigError),

    #[error("llm config: {0}")]
    Llm(#[from] AiLlmError),
}

/// Everything read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// `API_ADDRESS`, default `127.0.0.1:8000`.
    pub api_address: String,
    pub store: StoreConfig,
    pub chats: ChatStoreConfig,
    pub llm: LlmProfilesConfig,
    /// Timeout for LLM health probes, seconds.
    pub health_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_address: std::env::var("API_ADDRESS")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_API_ADDRESS.into()),
            store: StoreConfig::from_env()?,
            chats: ChatStoreConfig::from_env()?,
            llm: llm_profiles_from_env()?,
            health_timeout_secs: 10,
        })
    }
}

/// Shared state for all HTTP handlers.
pub struct AppState {
    pub engine: Arc<QueryEngine>,
    pub conversation: Conversation,
    /// `None` when no real backend is wired (tests); health then lists no models.
    pub llm: Option<Arc<LlmServiceProfiles>>,
    /// Collection queried when a request names none.
    pub default_collection: String,
}

impl AppState {
    pub fn new(
        engine: Arc<QueryEngine>,
        conversation: Conversation,
        llm: Option<Arc<LlmServiceProfiles>>,
        default_collection: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            conversation,
            llm,
            default_collection: default_collection.into(),
        }
    }

    /// Connects MongoDB (data and chats) and the LLM profiles.
    pub async fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        let llm = Arc::new(
            LlmServiceProfiles::new(
                cfg.llm.query.clone(),
                Some(cfg.llm.title.clone()),
                Some(cfg.health_timeout_secs),
            )
            .map_err(ConfigError::from)?,
        );

        let store = MongoStore::connect(&cfg.store)
            .await
            .map_err(|e| AppError::Internal(format!("document store: {e}")))?;
        let chats = MongoChatStore::connect(&cfg.chats).await?;

        let engine = Arc::new(QueryEngine::new(
            Arc::new(store),
            Arc::new(LlmServiceProfiles::query_generator(&llm)),
        ));
        let conversation = Conversation::new(
            Arc::new(chats),
            Arc::clone(&engine),
            Arc::new(LlmServiceProfiles::title_generator(&llm)),
            cfg.store.collection.clone(),
        );

        info!(
            collection = %cfg.store.collection,
            query_model = %cfg.llm.query.model,
            title_model = %cfg.llm.title.model,
            "application state ready"
        );

        Ok(Self::new(
            engine,
            conversation,
            Some(llm),
            cfg.store.collection.clone(),
        ))
    }
}
