//! Stable fingerprints for plan ids.
//!
//! The id depends only on the canonical JSON form of its input: object keys
//! sorted, strings trimmed. The canonical text is hashed with SHA-256 and the
//! first 8 bytes become the id, so the same specification yields the same id
//! across processes and platforms.

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

/// First 8 bytes of the SHA-256 digest of `text`, as 16 lowercase hex chars.
pub fn short_hash(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    hex::encode(&digest[..8])
}

/// Canonical text form of a JSON value: sorted keys, trimmed strings,
/// no insignificant whitespace.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::String(s) => out.push_str(&Value::String(s.trim().to_string()).to_string()),
        other => out.push_str(&other.to_string()),
    }
}

/// `plan-<16 lowercase hex>` derived from `input`.
pub fn plan_id_for<T: Serialize>(input: &T) -> crate::Result<String> {
    let value = serde_json::to_value(input)?;
    Ok(plan_id_for_value(&value))
}

pub fn plan_id_for_value(value: &Value) -> String {
    format!("plan-{}", short_hash(&canonical_json(value)))
}
