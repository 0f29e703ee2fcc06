//! Short chat titles summarized from the first user message.

use ai_llm_service::TextGenerator;
use tracing::{debug, warn};

use crate::model::NEW_CHAT_TITLE;

/// Longest title kept, in characters.
pub const MAX_TITLE_CHARS: usize = 60;

pub fn title_prompt(message: &str) -> String {
    format!(
        "Based on the user Message: '{message}', generate a very short title that summarizes \
         the query in 3 to 5 words, and do not generate any quotes or markdowns"
    )
}

/// Asks `generator` for a title; falls back to [`NEW_CHAT_TITLE`] on failure
/// or empty output.
pub async fn generate_title(generator: &dyn TextGenerator, message: &str) -> String {
    match generator.generate(&title_prompt(message)).await {
        Ok(raw) => match clean_title(&raw) {
            Some(title) => {
                debug!(%title, "chat title generated");
                title
            }
            None => {
                warn!("title backend returned nothing usable; keeping placeholder");
                NEW_CHAT_TITLE.to_string()
            }
        },
        Err(e) => {
            warn!(error = %e, "title generation failed; keeping placeholder");
            NEW_CHAT_TITLE.to_string()
        }
    }
}

/// Strips quotes and markdown markers, joins lines and clamps the length.
pub fn clean_title(raw: &str) -> Option<String> {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '`' | '#' | '*'))
        .collect();
    let one_line = stripped.split_whitespace().collect::<Vec<_>>().join(" ");
    let title: String = one_line.chars().take(MAX_TITLE_CHARS).collect();
    let title = title.trim_end().to_string();
    (!title.is_empty()).then_some(title)
}
