//! Best-effort search query extraction from free-form orchestrator output.

use regex::Regex;
use std::sync::OnceLock;

/// First `{` through last `}`, across lines.
static JSON_SPAN: OnceLock<Option<Regex>> = OnceLock::new();

fn json_span() -> Option<&'static Regex> {
    JSON_SPAN
        .get_or_init(|| Regex::new(r"(?s)\{.*\}").ok())
        .as_ref()
}

/// Pull the `search_query` field out of a JSON fragment embedded in `text`.
///
/// Returns `None` when there is no brace-delimited span, when the span is not
/// valid JSON, or when the field is missing, not a string, or blank. Never
/// fails.
pub fn extract_search_query(text: &str) -> Option<String> {
    let span = json_span()?.find(text)?.as_str();

    let value: serde_json::Value = match serde_json::from_str(span) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Ignoring malformed search query fragment: {}", e);
            return None;
        }
    };

    match value.get("search_query").and_then(|q| q.as_str()) {
        Some(query) if !query.trim().is_empty() => Some(query.trim().to_string()),
        _ => {
            tracing::debug!("JSON fragment has no usable search_query field");
            None
        }
    }
}
