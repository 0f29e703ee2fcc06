//! Extraction of a query descriptor from free-form generation output.
//!
//! Replies usually wrap the JSON object in commentary or markdown fences,
//! and chat models sometimes escape underscores (`user\_id`). Both are
//! tolerated here.

use serde_json::Value;

use crate::descriptor::QueryDescriptor;
use crate::error::QueryError;

/// Parses a generation reply into a validated [`QueryDescriptor`].
///
/// # Errors
/// - [`QueryError::Extraction`] if no complete `{...}` object is present
/// - [`QueryError::MalformedJson`] if the object is not valid JSON
/// - [`QueryError::InvalidDescriptor`] if it does not describe a query
pub fn parse(raw: &str) -> Result<QueryDescriptor, QueryError> {
    let cleaned = unescape_underscores(raw);
    let json = first_json_object(&cleaned).ok_or(QueryError::Extraction)?;
    let value: Value = serde_json::from_str(json)?;
    QueryDescriptor::from_value(value)
}

/// Replaces markdown-escaped underscores (`\_`) with `_`.
///
/// An escaped backslash (`\\`) is copied through untouched, so JSON text
/// containing a literal backslash before an underscore survives.
pub fn unescape_underscores(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('_') => out.push('_'),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Returns the first balanced `{...}` substring.
///
/// Braces inside JSON strings (and escaped quotes) are not counted. Returns
/// `None` when the first `{` is never closed.
pub fn first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strips_commentary_and_fences() {
        let raw = "Here you go:\n```json\n{\"find\": \"users\", \"filter\": {}}\n```\nDone.";
        assert_eq!(
            first_json_object(raw),
            Some("{\"find\": \"users\", \"filter\": {}}")
        );
    }

    #[test]
    fn braces_inside_strings_are_ignored() {
        let raw = r#"x {"find":"a","filter":{"name":"}{\"}"}} trailing }"#;
        assert_eq!(
            first_json_object(raw),
            Some(r#"{"find":"a","filter":{"name":"}{\"}"}}"#)
        );
    }

    #[test]
    fn unclosed_object_is_an_extraction_error() {
        let err = parse("{\"find\": \"users\", \"filter\": {").unwrap_err();
        assert!(matches!(err, QueryError::Extraction));
        assert!(matches!(parse("no json here"), Err(QueryError::Extraction)));
    }

    #[test]
    fn escaped_underscores_are_restored() {
        let d = parse(r#"{"find": "users", "filter": {"user\_id": 7}}"#).unwrap();
        assert_eq!(d.filter.unwrap().get("user_id"), Some(&json!(7)));
    }

    #[test]
    fn escaped_backslash_before_underscore_is_kept() {
        assert_eq!(unescape_underscores(r#"a\\_b"#), r#"a\\_b"#);
        assert_eq!(unescape_underscores(r#"a\_b"#), "a_b");
    }

    #[test]
    fn malformed_object_reports_parse_error() {
        let err = parse("{find: users}").unwrap_err();
        assert!(err.to_string().starts_with("Error parsing extracted JSON: "));
    }
}
