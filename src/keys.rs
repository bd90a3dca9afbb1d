//! Key construction helpers.
//!
//! Keys are hierarchical paths such as `/pods/<namespace>/<name>`. The store
//! orders them byte-wise, so every object of one namespace lands in one
//! contiguous range under `/pods/<namespace>/`.

use crate::error::BoxError;
use crate::types::Keyed;
use serde_json::Value;
use std::sync::Arc;

/// Maps a payload to its store key.
pub type KeyFunc<P> = Arc<dyn Fn(&P) -> Result<String, BoxError> + Send + Sync>;

/// The smallest key strictly greater than `key`.
///
/// Passing it as `continue_key` resumes a listing right after `key`.
pub fn successor(key: &str) -> String {
    let mut next = String::with_capacity(key.len() + 1);
    next.push_str(key);
    next.push('\u{0}');
    next
}

/// Key function for payloads that already carry their key.
pub fn keyed_key_func<P: Keyed + 'static>() -> KeyFunc<P> {
    Arc::new(|payload: &P| Ok(payload.key().to_string()))
}

/// Key function for JSON objects with `metadata.name` and an optional
/// `metadata.namespace`.
///
/// Produces `<prefix>/<namespace>/<name>` for namespaced objects and
/// `<prefix>/<name>` otherwise.
pub fn namespaced_key_func(resource_prefix: &str) -> KeyFunc<Value> {
    let prefix = resource_prefix.trim_end_matches('/').to_string();
    Arc::new(move |obj: &Value| namespaced_key(&prefix, obj))
}

fn namespaced_key(prefix: &str, obj: &Value) -> Result<String, BoxError> {
    let meta = obj
        .get("metadata")
        .ok_or("object has no metadata")?;
    let name = meta
        .get("name")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .ok_or("object has no metadata.name")?;
    validate_segment(name)?;

    match meta.get("namespace").and_then(Value::as_str) {
        Some(ns) if !ns.is_empty() => {
            validate_segment(ns)?;
            Ok(format!("{prefix}/{ns}/{name}"))
        }
        _ => Ok(format!("{prefix}/{name}")),
    }
}

/// Rejects names that would break the path structure of a key.
fn validate_segment(segment: &str) -> Result<(), BoxError> {
    if segment == "." || segment == ".." {
        return Err(format!("{segment:?} may not be used as a key segment").into());
    }
    if let Some(bad) = segment.chars().find(|c| *c == '/' || *c == '%') {
        return Err(format!("key segment {segment:?} may not contain {bad:?}").into());
    }
    Ok(())
}
