/// Backend used for text generation.
///
/// Groq exposes an OpenAI-compatible API, so it is served by
/// [`LlmProvider::OpenAI`] with a Groq endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LlmProvider {
    /// Local Ollama runtime (`/api/generate`).
    Ollama,
    /// OpenAI-compatible chat completions (`/v1/chat/completions`).
    OpenAI,
}

impl LlmProvider {
    /// Short, stable name used in logs and health reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "ollama",
            LlmProvider::OpenAI => "openai",
        }
    }
}
