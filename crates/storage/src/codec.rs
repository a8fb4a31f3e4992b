#![forbid(unsafe_code)]

//! JSON text codec for job arguments and results.

use crate::StoreError;
use serde_json::Value;

pub(crate) fn encode(value: &Value) -> Result<String, StoreError> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes a stored column. NULL and the empty string both decode to
/// `Value::Null`.
pub(crate) fn decode(text: Option<&str>) -> Result<Value, StoreError> {
    match text {
        None | Some("") => Ok(Value::Null),
        Some(text) => Ok(serde_json::from_str(text)?),
    }
}
