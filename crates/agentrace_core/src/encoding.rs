//! Canonical encoding of checkpoint state.
//!
//! State is a structured JSON value. Its canonical form has every object's
//! keys sorted recursively, and the canonical bytes are the compact JSON
//! serialization of that form. Those bytes are both hashed and persisted.

use crate::error::CoreResult;
use serde_json::{Map, Value};

/// Rebuild `value` with object keys sorted at every depth
#[must_use]
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Encode state into its canonical bytes
///
/// # Errors
///
/// Returns error if the value cannot be serialized
pub fn encode_state(state: &Value) -> CoreResult<Vec<u8>> {
    Ok(serde_json::to_vec(&canonicalize(state))?)
}

/// Decode canonical bytes back into a state value
///
/// # Errors
///
/// Returns error if the bytes are not valid JSON
pub fn decode_state(bytes: &[u8]) -> CoreResult<Value> {
    Ok(serde_json::from_slice(bytes)?)
}
