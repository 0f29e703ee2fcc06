//! Health probes for text-generation backends.
//!
//! - Ollama: `GET {endpoint}/api/tags` (best-effort model existence check)
//! - OpenAI-compatible (OpenAI, Groq): `GET {endpoint}/v1/models` with Bearer auth
//!
//! [`HealthService::check`] never fails: errors are mapped to `ok=false`.
//! The provider-specific probes (`try_*`) return strict `Result`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet, retry_after_secs};

/// A serializable health snapshot for a single model config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    /// Backend name (`openai`, `ollama`).
    pub provider: String,
    /// Target endpoint base URL.
    pub endpoint: String,
    /// Model identifier relevant to the probe.
    pub model: Option<String>,
    /// Overall health flag.
    pub ok: bool,
    /// Measured HTTP latency in milliseconds for the probe.
    pub latency_ms: u64,
    /// Short human-readable message with details.
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &LlmModelConfig, ok: bool, latency_ms: u64, message: impl Into<String>) -> Self {
        Self {
            provider: cfg.provider.as_str().to_string(),
            endpoint: cfg.endpoint.clone(),
            model: Some(cfg.model.clone()),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Health checker that reuses a single HTTP client.
pub struct HealthService {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional client timeout (seconds).
    ///
    /// # Errors
    /// Returns [`AiLlmError::HttpTransport`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        info!(
            default_timeout_secs = timeout.as_secs(),
            "HealthService initialized"
        );

        Ok(Self {
            client,
            default_timeout: timeout,
        })
    }

    /// Checks one config, routing to the provider-specific probe.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let endpoint = cfg.endpoint.trim();
        if endpoint.is_empty()
            || !(endpoint.starts_with("http://") || endpoint.starts_with("https://"))
        {
            warn!(
                provider = cfg.provider.as_str(),
                endpoint = %cfg.endpoint,
                "invalid endpoint (empty or missing http/https)"
            );
            let err = HealthError::InvalidEndpoint(cfg.endpoint.clone());
            return HealthStatus::new(cfg, false, 0, err.to_string());
        }

        let start = Instant::now();
        let result = match cfg.provider {
            LlmProvider::Ollama => self.try_probe_ollama(cfg).await,
            LlmProvider::OpenAI => self.try_probe_openai(cfg).await,
        };

        match result {
            Ok(status) => {
                info!(
                    provider = %status.provider,
                    model = %cfg.model,
                    ok = status.ok,
                    latency_ms = status.latency_ms,
                    "health probe completed"
                );
                status
            }
            Err(err) => {
                let latency = start.elapsed().as_millis() as u64;
                warn!(
                    provider = cfg.provider.as_str(),
                    endpoint = %cfg.endpoint,
                    model = %cfg.model,
                    latency_ms = latency,
                    error = %err,
                    "health probe failed"
                );
                HealthStatus::new(cfg, false, latency, err.to_string())
            }
        }
    }

    /// Checks several configs sequentially; never fails.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        debug!(count = configs.len(), "running batch health probes");
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    /// Strict Ollama probe: `GET /api/tags`, 2xx, model listed.
    async fn try_probe_ollama(&self, cfg: &LlmModelConfig) -> Result<HealthStatus, AiLlmError> {
        let url = format!("{}/api/tags", cfg.endpoint.trim_end_matches('/'));
        let req = self.client.get(&url).timeout(self.timeout_for(cfg));

        let start = Instant::now();
        debug!(provider = "ollama", model = %cfg.model, "GET {}", url);
        let resp = req.send().await?;
        let latency = start.elapsed().as_millis() as u64;
        let resp = ensure_success(resp, url).await?;

        #[derive(Deserialize)]
        struct Tag {
            name: String,
        }
        #[derive(Deserialize)]
        struct Tags {
            models: Option<Vec<Tag>>,
        }

        let tags: Tags = resp
            .json()
            .await
            .map_err(|e| HealthError::Decode(format!("/api/tags: {e}")))?;

        Ok(match tags.models {
            Some(models) if models.iter().any(|m| m.name == cfg.model) => {
                HealthStatus::new(cfg, true, latency, "Ollama is healthy; model is available")
            }
            Some(_) => HealthStatus::new(
                cfg,
                false,
                latency,
                "Ollama is up, but model not found in /api/tags",
            ),
            None => HealthStatus::new(cfg, true, latency, "Ollama is reachable"),
        })
    }

    /// Strict OpenAI-compatible probe: `GET /v1/models` with Bearer auth.
    async fn try_probe_openai(&self, cfg: &LlmModelConfig) -> Result<HealthStatus, AiLlmError> {
        let url = format!("{}/v1/models", cfg.endpoint.trim_end_matches('/'));
        let api_key = cfg
            .api_key
            .as_ref()
            .ok_or_else(|| HealthError::Decode("missing API key".into()))?;
        let auth = header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;

        let start = Instant::now();
        debug!(provider = "openai", model = %cfg.model, "GET {}", url);
        let resp = self
            .client
            .get(&url)
            .timeout(self.timeout_for(cfg))
            .header(header::AUTHORIZATION, auth)
            .send()
            .await?;
        let latency = start.elapsed().as_millis() as u64;
        let resp = ensure_success(resp, url).await?;

        #[derive(Deserialize)]
        struct ModelItem {
            id: String,
        }
        #[derive(Deserialize)]
        struct Models {
            data: Vec<ModelItem>,
        }

        let models: Models = resp
            .json()
            .await
            .map_err(|e| HealthError::Decode(format!("/v1/models: {e}")))?;

        Ok(if models.data.iter().any(|m| m.id == cfg.model) {
            HealthStatus::new(cfg, true, latency, "backend is healthy; model is available")
        } else {
            HealthStatus::new(
                cfg,
                false,
                latency,
                "backend is up, but model not found in /v1/models",
            )
        })
    }

    fn timeout_for(&self, cfg: &LlmModelConfig) -> Duration {
        cfg.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(self.default_timeout)
            .min(self.default_timeout)
    }
}

async fn ensure_success(
    resp: reqwest::Response,
    url: String,
) -> Result<reqwest::Response, AiLlmError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status();
    let retry_after = retry_after_secs(resp.headers());
    let text = resp.text().await.unwrap_or_default();
    Err(HealthError::HttpStatus(HttpError {
        status,
        url,
        snippet: make_snippet(&text),
        retry_after_secs: retry_after,
    })
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_endpoint_reports_failure_without_network() {
        let svc = HealthService::new(Some(1)).unwrap();
        let cfg = LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: "llama3-70b-8192".into(),
            endpoint: "api.groq.com".into(),
            api_key: Some("k".into()),
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: None,
            max_retries: None,
        };

        let status = svc.check(&cfg).await;
        assert!(!status.ok);
        assert_eq!(status.provider, "openai");
        assert_eq!(status.latency_ms, 0);
        assert!(status.message.contains("invalid endpoint"));
    }
}
