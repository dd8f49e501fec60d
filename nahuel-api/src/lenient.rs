//! Lenient request field decoding
//!
//! Form-driven clients send identifiers and years either as JSON strings or
//! as numbers. Both decode to text; anything else is rejected.

use serde::de::{Deserializer, Error};
use serde::Deserialize;
use serde_json::Value;

/// Decode an optional string-or-number field
pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

/// Trimmed value of a field, `None` when absent or blank
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}
