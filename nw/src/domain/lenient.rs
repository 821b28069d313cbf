//! Forgiving field deserializers for model-written JSON
//!
//! A plan with the right shape is never rejected over a single field: numbers
//! arrive as `"3"` or `"第3章"`, single values as lists, lists of strings as
//! lists of objects. Each field falls back to a string rendering or to its
//! default instead of failing the whole document.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// A chapter or scene number; the first run of digits in a string, else 0
pub(crate) fn number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(number_from(&Value::deserialize(deserializer)?))
}

/// Any value as text: lists are joined with ", ", objects become JSON text
pub(crate) fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(render(Value::deserialize(deserializer)?))
}

/// A list of texts; a lone value becomes a one-item list
pub(crate) fn texts<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(render).collect(),
        Value::Null => Vec::new(),
        Value::String(s) if s.trim().is_empty() => Vec::new(),
        other => vec![render(other)],
    })
}

/// A nested section; anything that does not fit becomes the default
pub(crate) fn section<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).unwrap_or_default())
}

/// A list of sections; positions are kept so counts stay meaningful
pub(crate) fn sections<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let parse = |value: Value| serde_json::from_value(value).unwrap_or_default();
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(parse).collect(),
        value @ Value::Object(_) => vec![parse(value)],
        _ => Vec::new(),
    })
}

fn number_from(value: &Value) -> u32 {
    match value {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u32)
            })
            .unwrap_or(0),
        Value::String(s) => s
            .split(|c: char| !c.is_ascii_digit())
            .find(|digits| !digits.is_empty())
            .and_then(|digits| digits.parse().ok())
            .unwrap_or(0),
        _ => 0,
    }
}

fn render(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Array(items) => items
            .into_iter()
            .map(render)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}
