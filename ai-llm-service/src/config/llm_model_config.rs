use crate::config::llm_provider::LlmProvider;

/// Retries applied when a config does not specify `max_retries`.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Configuration for a single text-generation model.
///
/// # Fields
///
/// - `provider`: which backend to call.
/// - `model`: model identifier (e.g. `"llama-3.3-70b-versatile"`).
/// - `endpoint`: base URL without the API path (e.g. `https://api.groq.com/openai`).
/// - `api_key`: bearer token for hosted providers.
/// - `max_tokens`: generation cap, if supported.
/// - `temperature`: sampling temperature.
/// - `top_p`: nucleus sampling cutoff.
/// - `timeout_secs`: per-request HTTP timeout.
/// - `max_retries`: how many times a transient failure is retried.
///
/// # Examples
///
/// ```
/// use ai_llm_service::{LlmModelConfig, LlmProvider};
///
/// let cfg = LlmModelConfig {
///     provider: LlmProvider::OpenAI,
///     model: "llama-3.3-70b-versatile".to_string(),
///     endpoint: "https://api.groq.com/openai".to_string(),
///     api_key: Some("gsk_...".to_string()),
///     max_tokens: None,
///     temperature: Some(0.3),
///     top_p: None,
///     timeout_secs: Some(60),
///     max_retries: Some(2),
/// };
/// assert_eq!(cfg.retries(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModelConfig {
    pub provider: LlmProvider,
    pub model: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
}

impl LlmModelConfig {
    /// Effective retry budget.
    pub fn retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }
}
