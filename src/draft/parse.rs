//! Parsing of backend drafts: fence stripping and shape validation.

use serde_json::Value;

use super::DraftContent;
use crate::error::DraftError;

const FENCE_JSON: &str = "```json";
const FENCE: &str = "```";

/// Remove Markdown code fences by exact substring removal.
///
/// The text is trimmed, every ```` ```json ```` and ```` ``` ```` marker is
/// deleted wherever it appears, and the result is trimmed again.
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .replace(FENCE_JSON, "")
        .replace(FENCE, "")
        .trim()
        .to_string()
}

/// Parse a backend response into a draft.
///
/// The stripped text must be a JSON object with exactly the string keys
/// `subject` and `body`.
pub fn parse_draft(raw: &str) -> Result<DraftContent, DraftError> {
    let stripped = strip_code_fences(raw);
    let value: Value = serde_json::from_str(&stripped)?;

    let Value::Object(map) = value else {
        return Err(DraftError::NotAnObject);
    };

    if let Some(extra) = map.keys().find(|k| *k != "subject" && *k != "body") {
        return Err(DraftError::UnexpectedKey(extra.clone()));
    }

    let subject = string_field(&map, "subject")?;
    let body = string_field(&map, "body")?;

    DraftContent::new(subject, body)
}

fn string_field<'a>(
    map: &'a serde_json::Map<String, Value>,
    key: &'static str,
) -> Result<&'a str, DraftError> {
    match map.get(key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(DraftError::NotAString(key)),
        None => Err(DraftError::MissingKey(key)),
    }
}
