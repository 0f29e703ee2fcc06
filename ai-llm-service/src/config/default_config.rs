//! Default LLM configs loaded strictly from environment variables.
//!
//! Two roles are resolved for the selected provider:
//!
//! - **query** → turns natural language into a query descriptor
//! - **title** → summarizes a chat's first message into a short title
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND` = `groq` (default), `openai` or `ollama`
//! - `LLM_MAX_TOKENS` = optional max tokens (u32)
//! - `LLM_MAX_RETRIES` = optional retry budget (u32, default 2)
//! - `LLM_TIMEOUT_SECS` = optional request timeout (u64, default 60)
//! - `LLM_TEMPERATURE` = optional temperature (0.0..=2.0, default 0.3)
//!
//! Groq:
//! - `GROQ_API_KEY`, `GROQ_MODEL` (required)
//! - `GROQ_URL` (default `https://api.groq.com/openai`)
//! - `GROQ_TITLE_MODEL` (default `llama3-70b-8192`)
//!
//! OpenAI:
//! - `OPENAI_API_KEY`, `OPENAI_MODEL` (required)
//! - `OPENAI_URL` (default `https://api.openai.com`)
//! - `OPENAI_TITLE_MODEL` (default: same as `OPENAI_MODEL`)
//!
//! Ollama:
//! - `OLLAMA_URL` or `OLLAMA_PORT`, `OLLAMA_MODEL` (required)
//! - `OLLAMA_TITLE_MODEL` (default: same as `OLLAMA_MODEL`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, env_opt, env_opt_f32, env_opt_u32, env_opt_u64, must_env,
        validate_http_endpoint, validate_range_f32,
    },
};

pub const DEFAULT_GROQ_URL: &str = "https://api.groq.com/openai";
pub const DEFAULT_GROQ_TITLE_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Resolved `query` and `title` model configs.
#[derive(Debug, Clone)]
pub struct LlmProfilesConfig {
    pub query: LlmModelConfig,
    pub title: LlmModelConfig,
}

/// Options shared by both roles.
struct Shared {
    max_tokens: Option<u32>,
    max_retries: Option<u32>,
    timeout_secs: Option<u64>,
    temperature: f32,
}

impl Shared {
    fn from_env() -> Result<Self, AiLlmError> {
        let temperature = env_opt_f32("LLM_TEMPERATURE")?.unwrap_or(DEFAULT_TEMPERATURE);
        validate_range_f32("temperature", temperature, 0.0, 2.0)?;
        Ok(Self {
            max_tokens: env_opt_u32("LLM_MAX_TOKENS")?,
            max_retries: env_opt_u32("LLM_MAX_RETRIES")?,
            timeout_secs: Some(env_opt_u64("LLM_TIMEOUT_SECS")?.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            temperature,
        })
    }

    fn model(
        &self,
        provider: LlmProvider,
        endpoint: &str,
        api_key: Option<&str>,
        model: String,
    ) -> LlmModelConfig {
        LlmModelConfig {
            provider,
            model,
            endpoint: endpoint.to_string(),
            api_key: api_key.map(str::to_string),
            max_tokens: self.max_tokens,
            temperature: Some(self.temperature),
            top_p: None,
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
        }
    }
}

/// Builds both profiles for the provider selected by `LLM_KIND`.
///
/// # Errors
/// - [`ConfigError::UnsupportedProvider`] for an unknown `LLM_KIND`
/// - [`ConfigError::MissingVar`] for missing keys/models
/// - [`ConfigError::InvalidNumber`] / [`ConfigError::InvalidFormat`] for bad values
pub fn llm_profiles_from_env() -> Result<LlmProfilesConfig, AiLlmError> {
    let kind = env_opt("LLM_KIND").unwrap_or_else(|| "groq".to_string());
    let shared = Shared::from_env()?;

    match kind.to_ascii_lowercase().as_str() {
        "groq" => config_groq(&shared),
        "openai" | "chatgpt" => config_openai(&shared),
        "ollama" => config_ollama(&shared),
        other => Err(ConfigError::UnsupportedProvider(other.to_string()).into()),
    }
}

fn config_groq(shared: &Shared) -> Result<LlmProfilesConfig, AiLlmError> {
    let api_key = must_env("GROQ_API_KEY")?;
    let model = must_env("GROQ_MODEL")?;
    let endpoint = env_opt("GROQ_URL").unwrap_or_else(|| DEFAULT_GROQ_URL.to_string());
    validate_http_endpoint("GROQ_URL", &endpoint)?;
    let title_model =
        env_opt("GROQ_TITLE_MODEL").unwrap_or_else(|| DEFAULT_GROQ_TITLE_MODEL.to_string());

    Ok(LlmProfilesConfig {
        query: shared.model(LlmProvider::OpenAI, &endpoint, Some(&api_key), model),
        title: shared.model(LlmProvider::OpenAI, &endpoint, Some(&api_key), title_model),
    })
}

fn config_openai(shared: &Shared) -> Result<LlmProfilesConfig, AiLlmError> {
    let api_key = must_env("OPENAI_API_KEY")?;
    let model = must_env("OPENAI_MODEL")?;
    let endpoint = env_opt("OPENAI_URL").unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string());
    validate_http_endpoint("OPENAI_URL", &endpoint)?;
    let title_model = env_opt("OPENAI_TITLE_MODEL").unwrap_or_else(|| model.clone());

    Ok(LlmProfilesConfig {
        query: shared.model(LlmProvider::OpenAI, &endpoint, Some(&api_key), model),
        title: shared.model(LlmProvider::OpenAI, &endpoint, Some(&api_key), title_model),
    })
}

fn config_ollama(shared: &Shared) -> Result<LlmProfilesConfig, AiLlmError> {
    let endpoint = ollama_endpoint()?;
    let model = must_env("OLLAMA_MODEL")?;
    let title_model = env_opt("OLLAMA_TITLE_MODEL").unwrap_or_else(|| model.clone());

    Ok(LlmProfilesConfig {
        query: shared.model(LlmProvider::Ollama, &endpoint, None, model),
        title: shared.model(LlmProvider::Ollama, &endpoint, None, title_model),
    })
}

/// Resolves the Ollama endpoint strictly from environment.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint() -> Result<String, AiLlmError> {
    if let Some(url) = env_opt("OLLAMA_URL") {
        validate_http_endpoint("OLLAMA_URL", &url)?;
        return Ok(url);
    }
    if let Some(port) = env_opt("OLLAMA_PORT") {
        port.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_PORT",
            reason: "expected u16 (1..=65535)",
        })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(ConfigError::MissingVar("OLLAMA_URL or OLLAMA_PORT").into())
}
