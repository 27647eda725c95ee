//! Normalization of configuration trees.
//!
//! Facts and user input are normalized before diffing: null-valued fields and
//! empty containers carry no configuration and are stripped recursively.

use serde_json::{Map, Value};

/// Strips null-valued fields and empty containers from a tree.
///
/// Nulls and empty containers inside lists are dropped as well. A tree that
/// normalizes to nothing becomes [`Value::Null`]. Explicit falsy scalars
/// (`false`, `0`, `""`) are configuration and are kept.
#[must_use]
pub fn normalize(value: &Value) -> Value {
    strip(value).unwrap_or(Value::Null)
}

fn strip(value: &Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(object) => {
            let stripped: Map<String, Value> = object
                .iter()
                .filter_map(|(name, child)| strip(child).map(|c| (name.clone(), c)))
                .collect();
            (!stripped.is_empty()).then_some(Value::Object(stripped))
        }
        Value::Array(items) => {
            let stripped: Vec<Value> = items.iter().filter_map(strip).collect();
            (!stripped.is_empty()).then_some(Value::Array(stripped))
        }
        scalar => Some(scalar.clone()),
    }
}

/// Returns true if the tree holds no configuration.
#[must_use]
pub fn is_empty_tree(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(object) => object.values().all(is_empty_tree),
        Value::Array(items) => items.iter().all(is_empty_tree),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_nulls_and_empties() {
        let tree = json!({
            "name": "Ethernet0",
            "description": null,
            "ipv4": { "addresses": [] },
            "tags": [null, {}, "x"],
        });
        assert_eq!(normalize(&tree), json!({ "name": "Ethernet0", "tags": ["x"] }));
    }

    #[test]
    fn test_keeps_falsy_scalars() {
        let tree = json!({ "enabled": false, "mtu": 0, "description": "" });
        assert_eq!(normalize(&tree), tree);
    }

    #[test]
    fn test_empty_becomes_null() {
        assert_eq!(normalize(&json!({ "a": { "b": null } })), Value::Null);
        assert!(is_empty_tree(&json!([{}, null])));
        assert!(!is_empty_tree(&json!({ "a": false })));
    }
}
