//! Parsing of generated text into structured data
//!
//! Generated replies are expected to be JSON, possibly wrapped in a Markdown
//! code fence. Parse failures are reported as [`FlightRiskError::Parse`] or,
//! through [`parse_or_else`], replaced by a caller-supplied default.

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::{FlightRiskError, Result};

/// Remove a leading ```` ```json ```` (or bare ```` ``` ````) fence and a
/// trailing ```` ``` ```` fence, then surrounding whitespace
#[must_use]
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix("```json") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```JSON") {
        body = rest;
    } else if let Some(rest) = body.strip_prefix("```") {
        body = rest;
    }
    if let Some(rest) = body.strip_suffix("```") {
        body = rest;
    }
    body.trim()
}

/// The span from the first `{` to the last `}`, if any
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Strip fences and deserialize the body
pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let body = strip_code_fences(text);
    serde_json::from_str(body).map_err(|e| {
        FlightRiskError::parse(format!(
            "Generated text is not valid JSON ({e}): {}",
            preview(body)
        ))
    })
}

/// Like [`parse_model_json`] but tolerates prose around a single object
pub fn parse_embedded_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    let body = strip_code_fences(text);
    let candidate = extract_json_object(body).unwrap_or(body);
    serde_json::from_str(candidate).map_err(|e| {
        FlightRiskError::parse(format!(
            "No JSON object in generated text ({e}): {}",
            preview(body)
        ))
    })
}

/// Parse generated text, substituting `fallback` when it is not valid JSON
pub fn parse_or_else<T, F>(text: &str, fallback: F) -> T
where
    T: DeserializeOwned,
    F: FnOnce() -> T,
{
    match parse_model_json(text) {
        Ok(value) => value,
        Err(e) => {
            warn!("Using fallback for unparsable model output: {}", e);
            fallback()
        }
    }
}

/// Truncate to at most `max` characters on a char boundary
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((index, _)) => text[..index].to_string(),
        None => text.to_string(),
    }
}

fn preview(text: &str) -> String {
    truncate_chars(text, 200)
}
