//! Unified error handling for `ai-llm-service`.
//!
//! This module exposes a single top-level error type [`AiLlmError`] for the whole
//! library, and groups domain-specific errors in nested types ([`ConfigError`],
//! [`HealthError`], [`ProviderError`]). Small helpers for reading/validating
//! environment variables are provided and return the unified [`Result<T>`] alias.
//!
//! All messages include the suffix `[AI LLM Service]` to simplify attribution in logs.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

use crate::config::llm_provider::LlmProvider;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, AiLlmError>;

/// Maximum number of characters kept from an upstream error body.
const SNIPPET_CHARS: usize = 240;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `ai-llm-service` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum AiLlmError {
    /// Configuration/validation errors (startup/readiness).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Health-check/connectivity/decoding errors.
    #[error(transparent)]
    Health(#[from] HealthError),

    /// Provider call failed (bad status, bad payload, bad setup).
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Underlying HTTP transport error (e.g., `reqwest::Error`).
    #[error("[AI LLM Service] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Operation exceeded the configured timeout.
    #[error("[AI LLM Service] operation timed out after {0:?}")]
    Timeout(Duration),
}

impl AiLlmError {
    /// Whether a retry has a reasonable chance to succeed.
    ///
    /// Transient: timeouts, connection failures, HTTP 429 and 5xx.
    /// Everything else (auth, bad request, decode, config) is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            AiLlmError::Timeout(_) => true,
            AiLlmError::HttpTransport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            AiLlmError::Provider(ProviderError {
                kind: ProviderErrorKind::HttpStatus(http),
                ..
            }) => http.is_transient(),
            _ => false,
        }
    }

    /// `Retry-After` hint (seconds) carried by a rate-limited response.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            AiLlmError::Provider(ProviderError {
                kind: ProviderErrorKind::HttpStatus(http),
                ..
            }) => http.retry_after_secs,
            _ => None,
        }
    }
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for environment/config-driven setup.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable is missing or empty.
    #[error("[AI LLM Service] missing required environment variable: {0}")]
    MissingVar(&'static str),

    /// A number failed to parse (like ports, limits, timeouts).
    #[error("[AI LLM Service] invalid number in {var}: {reason}")]
    InvalidNumber {
        /// Variable name (e.g., `LLM_MAX_TOKENS`, `OLLAMA_PORT`).
        var: &'static str,
        /// Human-readable reason (e.g., `expected u32`).
        reason: &'static str,
    },

    /// Unsupported provider in `LLM_KIND`.
    #[error("[AI LLM Service] unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[AI LLM Service] invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },

    /// A numeric field was outside of the allowed range.
    #[error("[AI LLM Service] {field} is out of range: {detail}")]
    OutOfRange {
        field: &'static str,
        detail: &'static str,
    },
}

/* ------------------------------------------------------------------------- */
/* HTTP status detail                                                        */
/* ------------------------------------------------------------------------- */

/// Non-successful HTTP response from an upstream service.
#[derive(Debug, Clone)]
pub struct HttpError {
    /// HTTP status code.
    pub status: StatusCode,
    /// Request URL.
    pub url: String,
    /// Short snippet of the response body (trimmed).
    pub snippet: String,
    /// Parsed `Retry-After` header, when the upstream sent one.
    pub retry_after_secs: Option<u64>,
}

impl HttpError {
    /// 429 and 5xx are worth retrying.
    pub fn is_transient(&self) -> bool {
        self.status == StatusCode::TOO_MANY_REQUESTS || self.status.is_server_error()
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} from {}: {}", self.status, self.url, self.snippet)
    }
}

/* ------------------------------------------------------------------------- */
/* Health errors                                                             */
/* ------------------------------------------------------------------------- */

/// Error enum for provider health checks.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum HealthError {
    /// The endpoint is empty or does not start with http/https.
    #[error("[AI LLM Service] invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Upstream returned a non-successful HTTP status.
    #[error("[AI LLM Service] {0}")]
    HttpStatus(HttpError),

    /// Response payload could not be decoded as expected.
    #[error("[AI LLM Service] decode error: {0}")]
    Decode(String),
}

/* ------------------------------------------------------------------------- */
/* Provider errors                                                           */
/* ------------------------------------------------------------------------- */

/// Failure raised by a concrete provider client.
#[derive(Debug, Error)]
#[error("[AI LLM Service] {name} provider: {kind}", name = .provider.as_str())]
pub struct ProviderError {
    pub provider: LlmProvider,
    pub kind: ProviderErrorKind,
}

impl ProviderError {
    pub fn new(provider: LlmProvider, kind: ProviderErrorKind) -> Self {
        Self { provider, kind }
    }
}

/// What went wrong inside a provider call.
#[derive(Debug, Error)]
pub enum ProviderErrorKind {
    /// The config targets another provider.
    #[error("config targets a different provider")]
    InvalidProvider,

    /// Hosted provider without an API key.
    #[error("missing API key")]
    MissingApiKey,

    /// Endpoint is empty or not http(s).
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// Upstream answered with a non-2xx status.
    #[error("{0}")]
    HttpStatus(HttpError),

    /// Response JSON did not have the expected shape.
    #[error("decode error: {0}")]
    Decode(String),

    /// Chat completion without any message content.
    #[error("response contained no choices")]
    EmptyChoices,
}

/// Trims an upstream body to a short, single-line snippet for logs and errors.
pub fn make_snippet(text: &str) -> String {
    let one_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    one_line.chars().take(SNIPPET_CHARS).collect()
}

/// Reads a `Retry-After` header expressed in seconds.
pub fn retry_after_secs(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/* ------------------------------------------------------------------------- */
/* Env helpers (return unified `Result<T>`)                                  */
/* ------------------------------------------------------------------------- */

/// Fetches a required, non-empty environment variable.
///
/// # Errors
/// Returns [`AiLlmError::Config`] with [`ConfigError::MissingVar`] if the
/// variable is absent or empty.
pub fn must_env(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}

/// Reads an optional non-empty environment variable.
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parses an optional `u32` from env (`Ok(None)` if unset/empty).
///
/// # Errors
/// Returns [`ConfigError::InvalidNumber`] if the variable is set but not a valid `u32`.
pub fn env_opt_u32(name: &'static str) -> Result<Option<u32>> {
    match env_opt(name) {
        Some(v) => v.parse::<u32>().map(Some).map_err(|_| {
            AiLlmError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u32",
            })
        }),
        None => Ok(None),
    }
}

/// Parses an optional `u64` from env (`Ok(None)` if unset/empty).
pub fn env_opt_u64(name: &'static str) -> Result<Option<u64>> {
    match env_opt(name) {
        Some(v) => v.parse::<u64>().map(Some).map_err(|_| {
            AiLlmError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected u64",
            })
        }),
        None => Ok(None),
    }
}

/// Parses an optional `f32` from env (`Ok(None)` if unset/empty).
pub fn env_opt_f32(name: &'static str) -> Result<Option<f32>> {
    match env_opt(name) {
        Some(v) => v.parse::<f32>().map(Some).map_err(|_| {
            AiLlmError::from(ConfigError::InvalidNumber {
                var: name,
                reason: "expected floating point number",
            })
        }),
        None => Ok(None),
    }
}

/* ------------------------------------------------------------------------- */
/* Validation helpers                                                        */
/* ------------------------------------------------------------------------- */

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

/// Validates that a floating-point value lies within an inclusive range.
pub fn validate_range_f32(field: &'static str, value: f32, min: f32, max: f32) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            detail: "expected value in inclusive range",
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(code: u16) -> AiLlmError {
        ProviderError::new(
            LlmProvider::OpenAI,
            ProviderErrorKind::HttpStatus(HttpError {
                status: StatusCode::from_u16(code).unwrap(),
                url: "https://api.groq.com/openai/v1/chat/completions".into(),
                snippet: String::new(),
                retry_after_secs: Some(3),
            }),
        )
        .into()
    }

    #[test]
    fn rate_limits_and_server_errors_are_retryable() {
        assert!(status_error(429).is_retryable());
        assert!(status_error(503).is_retryable());
        assert_eq!(status_error(429).retry_after_secs(), Some(3));
    }

    #[test]
    fn client_errors_are_final() {
        assert!(!status_error(401).is_retryable());
        assert!(!status_error(400).is_retryable());
        let decode: AiLlmError =
            ProviderError::new(LlmProvider::Ollama, ProviderErrorKind::Decode("x".into())).into();
        assert!(!decode.is_retryable());
        assert!(AiLlmError::Timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn snippet_is_single_line_and_bounded() {
        let body = format!("line one\n  line two\t{}", "x".repeat(1000));
        let s = make_snippet(&body);
        assert!(s.starts_with("line one line two "));
        assert_eq!(s.chars().count(), SNIPPET_CHARS);
    }

    #[test]
    fn endpoint_validation() {
        assert!(validate_http_endpoint("GROQ_URL", "https://api.groq.com/openai").is_ok());
        assert!(validate_http_endpoint("GROQ_URL", "api.groq.com").is_err());
        assert!(validate_range_f32("temperature", 0.3, 0.0, 2.0).is_ok());
        assert!(validate_range_f32("temperature", f32::NAN, 0.0, 2.0).is_err());
    }
}
