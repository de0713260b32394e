// SPDX-FileCopyrightText: 2026 Chatlens Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pulling the JSON payload out of a free-form model reply.
//!
//! Replies usually wrap the payload in a ```` ```json ```` fence, sometimes
//! in an untagged fence, and occasionally return bare JSON surrounded by
//! prose. The extractor tries those shapes in that order.

use chatlens_core::{ChatlensError, Discussion};
use serde_json::Value;
use tracing::warn;

const FENCE: &str = "```";
const JSON_FENCE: &str = "```json";

/// Content of the first fenced block, preferring one tagged as JSON.
///
/// An unterminated fence runs to the end of the reply.
pub fn fenced_block(raw: &str) -> Option<&str> {
    // ASCII lowercasing keeps byte offsets aligned with `raw`.
    let lower = raw.to_ascii_lowercase();
    if let Some(pos) = lower.find(JSON_FENCE) {
        return Some(until_fence(&raw[pos + JSON_FENCE.len()..]));
    }

    let pos = raw.find(FENCE)?;
    let mut body = &raw[pos + FENCE.len()..];
    // Skip a language tag such as `javascript` on the opening fence line.
    if let Some((tag, rest)) = body.split_once('\n') {
        let tag = tag.trim();
        if !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            body = rest;
        }
    }
    Some(until_fence(body))
}

fn until_fence(body: &str) -> &str {
    match body.find(FENCE) {
        Some(end) => &body[..end],
        None => body,
    }
}

/// Extracts the structured payload of a reply.
///
/// Fails with [`ChatlensError::Parse`] when no candidate parses as JSON.
pub fn extract_json(raw: &str) -> Result<Value, ChatlensError> {
    let candidate = fenced_block(raw).unwrap_or(raw).trim();
    if candidate.is_empty() {
        return Err(ChatlensError::Parse {
            message: "reply contains no JSON".to_string(),
        });
    }

    let first_error = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    // Prose around an unfenced object: retry on the outermost braces.
    if let (Some(start), Some(end)) = (candidate.find('{'), candidate.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&candidate[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(ChatlensError::Parse {
        message: first_error.to_string(),
    })
}

/// Parses the discussion list of a reply.
///
/// Accepts `{"discussions": [...]}` or a bare array. Items that are not
/// objects or do not deserialize are skipped with a warning.
pub fn parse_discussions(raw: &str) -> Result<Vec<Discussion>, ChatlensError> {
    let items = match extract_json(raw)? {
        Value::Object(mut map) => match map.remove("discussions") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => {
                return Err(ChatlensError::Parse {
                    message: "payload has no 'discussions' array".to_string(),
                });
            }
            Some(other) => {
                return Err(ChatlensError::Parse {
                    message: format!("'discussions' is not an array: {other}"),
                });
            }
        },
        Value::Array(items) => items,
        other => {
            return Err(ChatlensError::Parse {
                message: format!("unexpected payload type: {}", type_name(&other)),
            });
        }
    };

    let mut discussions = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        if !item.is_object() {
            warn!(index, "skipping non-object discussion entry");
            continue;
        }
        match serde_json::from_value::<Discussion>(item) {
            Ok(d) => discussions.push(d),
            Err(e) => warn!(index, error = %e, "skipping malformed discussion entry"),
        }
    }
    Ok(discussions)
}

/// Whether a reply is short enough to be worth a warning.
pub fn is_suspect(raw: &str, min_chars: usize) -> bool {
    raw.trim().chars().count() < min_chars
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fence_wins_over_earlier_generic_fence() {
        let raw = "```\nnot this\n```\ntext\n```JSON\n{\"a\": 1}\n```";
        assert_eq!(extract_json(raw).unwrap()["a"], 1);
    }

    #[test]
    fn generic_fence_skips_language_tag() {
        let raw = "Result:\n```javascript\n{\"discussions\": []}\n```";
        assert_eq!(fenced_block(raw).unwrap().trim(), "{\"discussions\": []}");

        let untagged = "```\n[1, 2]\n```";
        assert_eq!(extract_json(untagged).unwrap(), serde_json::json!([1, 2]));
    }

    #[test]
    fn bare_json_and_surrounding_prose() {
        assert_eq!(extract_json("  {\"x\": true} ").unwrap()["x"], true);
        let prose = "Sure! Here you go: {\"x\": 2} Hope this helps.";
        assert_eq!(extract_json(prose).unwrap()["x"], 2);
    }

    #[test]
    fn unterminated_fence_runs_to_end() {
        let raw = "```json\n{\"discussions\": []}";
        assert!(parse_discussions(raw).unwrap().is_empty());
    }

    #[test]
    fn malformed_reply_is_parse_error() {
        for raw in ["", "I could not find any discussions.", "```json\n{broken\n```"] {
            let err = extract_json(raw).unwrap_err();
            assert_eq!(err.kind(), "parse", "input: {raw:?}");
        }
    }

    #[test]
    fn discussions_from_object_or_array() {
        let wrapped = r#"{"discussions": [{"topic": "A"}, {"topic": "B"}]}"#;
        assert_eq!(parse_discussions(wrapped).unwrap().len(), 2);

        let bare = r#"[{"topic": "A"}]"#;
        assert_eq!(parse_discussions(bare).unwrap()[0].topic, "A");
    }

    #[test]
    fn bad_entries_are_skipped() {
        let raw = r#"{"discussions": [{"topic": "A"}, 42, {"topic": ["x"]}]}"#;
        let discussions = parse_discussions(raw).unwrap();
        assert_eq!(discussions.len(), 1);
        assert_eq!(discussions[0].topic, "A");
    }

    #[test]
    fn missing_discussions_key_is_parse_error() {
        assert_eq!(parse_discussions(r#"{"topics": []}"#).unwrap_err().kind(), "parse");
        assert_eq!(parse_discussions("\"text\"").unwrap_err().kind(), "parse");
    }

    #[test]
    fn suspect_threshold_counts_characters() {
        assert!(is_suspect("short", 1000));
        assert!(!is_suspect(&"x".repeat(1000), 1000));
        assert!(!is_suspect("", 0));
    }
}
