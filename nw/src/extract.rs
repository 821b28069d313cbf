//! JSON extraction from free-form model output
//!
//! Model responses wrap JSON in prose, markdown fences, or both, and are
//! sometimes cut off mid-object. Extraction never backtracks: the fence search
//! runs on the `regex` crate's finite automata and the brace scan is a single
//! pass over the bytes, so cost stays linear in the response size.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// A fenced block (```json or bare ```) whose body is a brace-delimited block
static FENCED_OBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"```(?:json)?\s*(\{[\s\S]*?\})\s*```").expect("fence pattern is valid")
});

/// Errors from JSON extraction
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("No '{{' found in response")]
    NoJsonFound,

    #[error("Malformed JSON in response: {0}")]
    MalformedJson(String),
}

/// Extract the first complete JSON value starting at a `{`
///
/// A fenced code block containing an object is preferred over any unfenced
/// object in the same text.
pub fn extract_first_json_object(text: &str) -> Result<Value, ExtractError> {
    debug!(text_len = text.len(), "extract_first_json_object: called");

    if let Some(caps) = FENCED_OBJECT.captures(text)
        && let Some(body) = caps.get(1)
    {
        debug!(start = body.start(), "extract_first_json_object: using fenced block");
        return serde_json::from_str(body.as_str()).map_err(|e| ExtractError::MalformedJson(e.to_string()));
    }

    let start = text.find('{').ok_or(ExtractError::NoJsonFound)?;
    let end = find_object_end(&text.as_bytes()[start..]).ok_or_else(|| {
        debug!(start, "extract_first_json_object: object never closed");
        ExtractError::MalformedJson("unbalanced braces: object never closed".to_string())
    })?;

    let candidate = &text[start..start + end + 1];
    debug!(start, len = candidate.len(), "extract_first_json_object: found candidate span");
    serde_json::from_str(candidate).map_err(|e| ExtractError::MalformedJson(e.to_string()))
}

/// Extract the first JSON object as a map
pub fn extract_object(text: &str) -> Result<Map<String, Value>, ExtractError> {
    match extract_first_json_object(text)? {
        Value::Object(map) => Ok(map),
        other => Err(ExtractError::MalformedJson(format!(
            "expected an object, found {}",
            json_kind(&other)
        ))),
    }
}

/// Offset of the `}` that closes the `{` at offset 0, if any
///
/// Braces inside strings and escaped characters inside strings do not affect
/// the depth. Scanning bytes is safe: every byte of a multi-byte UTF-8
/// sequence is >= 0x80, so it never matches `{`, `}`, `"` or `\`.
fn find_object_end(bytes: &[u8]) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Short name of a JSON value's type for error messages
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_plain_object() {
        let value = extract_first_json_object(r#"{"a": 1}"#).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn test_object_surrounded_by_prose() {
        let text = "Sure! Here is the plan:\n{\"chapter\": 3, \"title\": \"Night\"}\nHope this helps.";
        let value = extract_first_json_object(text).unwrap();
        assert_eq!(value, json!({"chapter": 3, "title": "Night"}));
    }

    #[test]
    fn test_nested_objects_and_arrays() {
        let text = r#"prefix {"a": {"b": [1, {"c": 2}]}, "d": []} suffix {"e": 1}"#;
        let value = extract_first_json_object(text).unwrap();
        assert_eq!(value, json!({"a": {"b": [1, {"c": 2}]}, "d": []}));
    }

    #[test]
    fn test_braces_and_escaped_quotes_inside_strings() {
        let text = r#"note: {"text": "he said \"{not a brace}\" and left }", "n": "\\"} trailing }"#;
        let value = extract_first_json_object(text).unwrap();
        assert_eq!(value["text"], json!("he said \"{not a brace}\" and left }"));
        assert_eq!(value["n"], json!("\\"));
    }

    #[test]
    fn test_fenced_json_block() {
        let text = "Here you go:\n```json\n{\"scenes\": [1, 2]}\n```\nDone.";
        let value = extract_first_json_object(text).unwrap();
        assert_eq!(value, json!({"scenes": [1, 2]}));
    }

    #[test]
    fn test_bare_fence_block() {
        let text = "```\n{\"ok\": true}\n```";
        assert_eq!(extract_first_json_object(text).unwrap(), json!({"ok": true}));
    }

    #[test]
    fn test_fenced_block_preferred_over_earlier_unfenced_object() {
        let text = "draft {\"v\": 1}\n```json\n{\"v\": 2}\n```";
        assert_eq!(extract_first_json_object(text).unwrap(), json!({"v": 2}));
    }

    #[test]
    fn test_fenced_block_preferred_over_later_unfenced_object() {
        let text = "```json\n{\"v\": 1}\n```\nand also {\"v\": 2}";
        assert_eq!(extract_first_json_object(text).unwrap(), json!({"v": 1}));
    }

    #[test]
    fn test_no_brace_is_no_json_found() {
        assert_eq!(
            extract_first_json_object("I cannot help with that."),
            Err(ExtractError::NoJsonFound)
        );
        assert_eq!(extract_first_json_object(""), Err(ExtractError::NoJsonFound));
    }

    #[test]
    fn test_truncated_object_is_malformed() {
        let text = r#"{"chapter": 1, "scenes": [{"idx": 1, "title": "cut off"#;
        assert!(matches!(
            extract_first_json_object(text),
            Err(ExtractError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_balanced_but_invalid_is_malformed() {
        let text = "{chapter: 1, 'title': 'single quotes',}";
        assert!(matches!(
            extract_first_json_object(text),
            Err(ExtractError::MalformedJson(_))
        ));
    }

    #[test]
    fn test_multibyte_text_around_object() {
        let text = "好的，这是结果：{\"标题\": \"第一章：开端\"}。谢谢";
        let value = extract_first_json_object(text).unwrap();
        assert_eq!(value, json!({"标题": "第一章：开端"}));
    }

    #[test]
    fn test_extract_object_returns_map() {
        let map = extract_object("```json\n{\"a\": 1}\n```").unwrap();
        assert_eq!(map.get("a"), Some(&json!(1)));
        assert_eq!(json_kind(&json!([1])), "array");
    }

    fn json_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(|n| json!(n)),
            // Strings heavy on the characters that trip naive scanners
            "[a-z{}\"\\\\ ]{0,12}".prop_map(Value::String),
        ]
    }

    fn json_object() -> impl Strategy<Value = Value> {
        let leaf = json_leaf();
        let tree = leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
                prop::collection::btree_map("[a-z{}\"]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        });
        prop::collection::btree_map("[a-z]{1,6}", tree, 0..5).prop_map(|m| Value::Object(m.into_iter().collect()))
    }

    proptest! {
        #[test]
        fn prop_extracts_object_between_prefix_and_suffix(
            prefix in "[^{`]{0,40}",
            object in json_object(),
            suffix in "[^`]{0,40}",
        ) {
            let text = format!("{}{}{}", prefix, serde_json::to_string(&object).unwrap(), suffix);
            prop_assert_eq!(extract_first_json_object(&text).unwrap(), object);
        }

        #[test]
        fn prop_text_without_brace_has_no_json(text in "[^{]{0,200}") {
            prop_assert_eq!(extract_first_json_object(&text), Err(ExtractError::NoJsonFound));
        }
    }
}
