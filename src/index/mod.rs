//! Secondary Index Module
//!
//! Named index functions map a payload to zero or more index values. The
//! indexer keeps, per index name, a `ValueIndex` from each value to the set
//! of elements producing it.
//!
//! Design:
//! - `Indexer`: owns every index, diffs old vs new element on update
//! - `ValueIndex`: value -> `ElementSet`, empty buckets dropped
//! - JSON helpers: field and label index functions for `serde_json::Value`

mod indexer;
mod value_index;

pub use indexer::Indexer;
pub use value_index::{ElementSet, ValueIndex};

use crate::error::BoxError;
use crate::types::IndexValues;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Computes the index values of one payload.
pub type IndexFunc<P> = Arc<dyn Fn(&P) -> Result<IndexValues, BoxError> + Send + Sync>;

/// Index name -> index function. Fixed for the lifetime of a store.
pub type Indexers<P> = BTreeMap<String, IndexFunc<P>>;

/// Conventional name of the namespace index.
pub const NAMESPACE_INDEX: &str = "namespace";

/// Wrap a closure as an `IndexFunc`.
pub fn index_func<P, F>(f: F) -> IndexFunc<P>
where
    F: Fn(&P) -> Result<IndexValues, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Index a JSON payload by the value at a dotted field path, e.g.
/// `"spec.nodeName"`.
///
/// Strings, numbers and booleans yield one value, arrays of them one value
/// per entry. A missing field or `null` yields none. Objects cannot be
/// indexed.
pub fn json_field_index(path: &str) -> IndexFunc<Value> {
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    Arc::new(move |obj: &Value| {
        let mut current = obj;
        for segment in &segments {
            match current.get(segment.as_str()) {
                Some(next) => current = next,
                None => return Ok(IndexValues::new()),
            }
        }
        json_values(current)
    })
}

/// Index a JSON payload by the value of one `metadata.labels` entry.
///
/// Label names may contain dots, so they are looked up verbatim.
pub fn label_index(label: &str) -> IndexFunc<Value> {
    let label = label.to_string();
    Arc::new(move |obj: &Value| {
        match obj.pointer("/metadata/labels").and_then(|labels| labels.get(label.as_str())) {
            Some(value) => json_values(value),
            None => Ok(IndexValues::new()),
        }
    })
}

/// Index JSON objects by `metadata.namespace`.
pub fn namespace_index() -> IndexFunc<Value> {
    json_field_index("metadata.namespace")
}

fn json_values(value: &Value) -> Result<IndexValues, BoxError> {
    match value {
        Value::Null => Ok(IndexValues::new()),
        Value::Array(items) => {
            let mut values = IndexValues::new();
            for item in items {
                match scalar(item) {
                    Some(v) => values.push(v),
                    None if item.is_null() => {}
                    None => return Err(format!("cannot index nested value {item}").into()),
                }
            }
            Ok(values)
        }
        other => scalar(other)
            .map(|v| IndexValues::from_elem(v, 1))
            .ok_or_else(|| format!("cannot index object value {other}").into()),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pod() -> Value {
        json!({
            "metadata": {
                "name": "web-0",
                "namespace": "prod",
                "labels": {"app.kubernetes.io/name": "web", "tier": "frontend"}
            },
            "spec": {"nodeName": "node-1", "priority": 7, "hostNetwork": false},
            "status": {"podIPs": ["10.0.0.1", "fd00::1"], "conditions": [{"type": "Ready"}]}
        })
    }

    #[test]
    fn test_json_field_index() {
        let obj = pod();
        assert_eq!(json_field_index("spec.nodeName")(&obj).unwrap().as_slice(), ["node-1"]);
        assert_eq!(json_field_index("spec.priority")(&obj).unwrap().as_slice(), ["7"]);
        assert_eq!(json_field_index("spec.hostNetwork")(&obj).unwrap().as_slice(), ["false"]);
        assert_eq!(
            json_field_index("status.podIPs")(&obj).unwrap().as_slice(),
            ["10.0.0.1", "fd00::1"]
        );
        assert!(json_field_index("spec.missing")(&obj).unwrap().is_empty());
    }

    #[test]
    fn test_json_field_index_rejects_objects() {
        let obj = pod();
        assert!(json_field_index("spec")(&obj).is_err());
        assert!(json_field_index("status.conditions")(&obj).is_err());
    }

    #[test]
    fn test_label_and_namespace_index() {
        let obj = pod();
        assert_eq!(label_index("app.kubernetes.io/name")(&obj).unwrap().as_slice(), ["web"]);
        assert!(label_index("missing")(&obj).unwrap().is_empty());
        assert_eq!(namespace_index()(&obj).unwrap().as_slice(), ["prod"]);
        assert!(namespace_index()(&json!({"metadata": {"name": "n"}})).unwrap().is_empty());
    }
}
