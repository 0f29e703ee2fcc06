use std::{future::Future, pin::Pin};

use crate::error_handler::AiLlmError;

/// Boxed future returned by [`TextGenerator::generate`].
pub type GenerateFuture<'a> = Pin<Box<dyn Future<Output = Result<String, AiLlmError>> + Send + 'a>>;

/// Provider interface for free-text generation.
///
/// Implemented by [`crate::ProfileGenerator`] for real backends; tests plug
/// in canned generators.
pub trait TextGenerator: Send + Sync {
    /// Sends `prompt` to the backend and returns the raw completion text.
    fn generate<'a>(&'a self, prompt: &'a str) -> GenerateFuture<'a>;
}
