//! Shared text-generation service for the NoSQL agent.
//!
//! Providers: OpenAI-compatible chat completions (OpenAI itself and Groq)
//! and local Ollama. Every call goes through a bounded retry policy and
//! errors are normalized into [`AiLlmError`].
//!
//! Consumers usually depend only on [`TextGenerator`], which decouples the
//! query engine and chat layer from the concrete backend.

pub mod config;
pub mod error_handler;
pub mod generator;
pub mod health_service;
pub mod retry;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::{
    default_config::{llm_profiles_from_env, LlmProfilesConfig},
    llm_model_config::LlmModelConfig,
    llm_provider::LlmProvider,
};
pub use error_handler::{AiLlmError, Result};
pub use generator::{GenerateFuture, TextGenerator};
pub use health_service::{HealthService, HealthStatus};
pub use service_profiles::{LlmProfile, LlmServiceProfiles, ProfileGenerator};
