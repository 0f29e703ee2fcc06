//! Shared LLM service with two profiles: `query` and `title`.
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches underlying HTTP clients per config (provider+endpoint+model+key+timeout).
//! - If `title` profile is not provided, it falls back to `query`.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{LlmModelConfig, LlmProvider, LlmServiceProfiles, TextGenerator};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let query = LlmModelConfig {
//!     provider: LlmProvider::OpenAI,
//!     model: "llama-3.3-70b-versatile".into(),
//!     endpoint: "https://api.groq.com/openai".into(),
//!     api_key: Some("gsk_...".into()),
//!     max_tokens: None,
//!     temperature: Some(0.3),
//!     top_p: None,
//!     timeout_secs: Some(60),
//!     max_retries: Some(2),
//! };
//!
//! let svc = Arc::new(LlmServiceProfiles::new(query, None, Some(10))?);
//! let generator = LlmServiceProfiles::query_generator(&svc);
//! let text = generator.generate("Return {} as JSON.").await?;
//! println!("{text}");
//! # Ok(()) }
//! ```

use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
    sync::Arc,
};

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::AiLlmError,
    generator::{GenerateFuture, TextGenerator},
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Logical role a generation call is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProfile {
    /// Natural language → query descriptor.
    Query,
    /// Chat title summarization.
    Title,
}

/// Shared service that manages the **query** and **title** profiles.
pub struct LlmServiceProfiles {
    query: LlmModelConfig,
    title: LlmModelConfig,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates a new service.
    ///
    /// - `query`: model used for query translation.
    /// - `title_opt`: model used for chat titles; falls back to `query`.
    /// - `health_timeout_secs`: optional timeout for the health checker.
    pub fn new(
        query: LlmModelConfig,
        title_opt: Option<LlmModelConfig>,
        health_timeout_secs: Option<u64>,
    ) -> Result<Self, AiLlmError> {
        let title = title_opt.unwrap_or_else(|| query.clone());

        Ok(Self {
            query,
            title,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Generates text with the **query** profile.
    pub async fn generate_query(&self, prompt: &str) -> Result<String, AiLlmError> {
        self.generate_with(&self.query, prompt, None).await
    }

    /// Generates text with the **title** profile.
    pub async fn generate_title(&self, prompt: &str) -> Result<String, AiLlmError> {
        self.generate_with(&self.title, prompt, None).await
    }

    /// Generates text with the given profile.
    pub async fn generate(&self, profile: LlmProfile, prompt: &str) -> Result<String, AiLlmError> {
        match profile {
            LlmProfile::Query => self.generate_query(prompt).await,
            LlmProfile::Title => self.generate_title(prompt).await,
        }
    }

    /// Health snapshot for all distinct profiles.
    ///
    /// If the title profile equals the query profile, it is checked only once.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut list = Vec::<LlmModelConfig>::with_capacity(2);
        list.push(self.query.clone());
        if self.title != self.query {
            list.push(self.title.clone());
        }
        self.health.check_many(&list).await
    }

    /// References to the current profiles `(query, title)`.
    pub fn profiles(&self) -> (&LlmModelConfig, &LlmModelConfig) {
        (&self.query, &self.title)
    }

    /// [`TextGenerator`] bound to the query profile.
    pub fn query_generator(svc: &Arc<Self>) -> ProfileGenerator {
        ProfileGenerator {
            svc: Arc::clone(svc),
            profile: LlmProfile::Query,
        }
    }

    /// [`TextGenerator`] bound to the title profile.
    pub fn title_generator(svc: &Arc<Self>) -> ProfileGenerator {
        ProfileGenerator {
            svc: Arc::clone(svc),
            profile: LlmProfile::Title,
        }
    }

    /* --------------------- Internals --------------------- */

    async fn generate_with(
        &self,
        cfg: &LlmModelConfig,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        match cfg.provider {
            LlmProvider::Ollama => {
                let cli = self.get_or_init_ollama(cfg).await?;
                cli.generate(prompt).await
            }
            LlmProvider::OpenAI => {
                let cli = self.get_or_init_openai(cfg).await?;
                cli.generate(prompt, system).await
            }
        }
    }

    async fn get_or_init_ollama(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.ollama.write().await;
        if let Some(cli) = w.get(&key).cloned() {
            return Ok(cli);
        }
        debug!(model = %cfg.model, "creating Ollama client");
        let cli = Arc::new(OllamaService::new(cfg.clone())?);
        w.insert(key, Arc::clone(&cli));
        Ok(cli)
    }

    async fn get_or_init_openai(
        &self,
        cfg: &LlmModelConfig,
    ) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let mut w = self.openai.write().await;
        if let Some(cli) = w.get(&key).cloned() {
            return Ok(cli);
        }
        debug!(model = %cfg.model, "creating OpenAI-compatible client");
        let cli = Arc::new(OpenAiService::new(cfg.clone())?);
        w.insert(key, Arc::clone(&cli));
        Ok(cli)
    }
}

/// A shared service pinned to one profile.
#[derive(Clone)]
pub struct ProfileGenerator {
    svc: Arc<LlmServiceProfiles>,
    profile: LlmProfile,
}

impl ProfileGenerator {
    pub fn profile(&self) -> LlmProfile {
        self.profile
    }
}

impl TextGenerator for ProfileGenerator {
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a> {
        Box::pin(self.svc.generate(self.profile, prompt))
    }
}

/// Internal cache key to identify unique client configs.
#[derive(Clone, Eq)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
    retries: u32,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
            retries: cfg.retries(),
        }
    }
}

impl PartialEq for ClientKey {
    fn eq(&self, other: &Self) -> bool {
        self.provider == other.provider
            && self.endpoint == other.endpoint
            && self.model == other.model
            && self.api_key == other.api_key
            && self.timeout == other.timeout
            && self.retries == other.retries
    }
}

impl Hash for ClientKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.provider.hash(state);
        self.endpoint.hash(state);
        self.model.hash(state);
        self.api_key.hash(state);
        self.timeout.hash(state);
        self.retries.hash(state);
    }
}
