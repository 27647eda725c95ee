//! In-place edits of configuration trees addressed by [`TreePath`].

use serde_json::{Map, Value};

use super::path::{ElementKey, PathSegment, TreePath, join_schema_path};
use crate::error::{ReconcileError, Result};
use crate::schema::KeySpecTable;

/// Returns the node at `path`, if present.
///
/// When several elements share a key, the last one is addressed, matching
/// how the differ resolves duplicates.
#[must_use]
pub fn get_at<'a>(root: &'a Value, path: &TreePath) -> Option<&'a Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| match segment {
            PathSegment::Field(name) => node.as_object()?.get(name),
            PathSegment::Key(key) => node.as_array()?.iter().rev().find(|e| key.matches(e)),
            PathSegment::Index(index) => node.as_array()?.get(*index),
        })
}

/// Mutable access to the node at `path`, if present.
pub fn get_at_mut<'a>(root: &'a mut Value, path: &TreePath) -> Option<&'a mut Value> {
    path.segments()
        .iter()
        .try_fold(root, |node, segment| match segment {
            PathSegment::Field(name) => node.as_object_mut()?.get_mut(name),
            PathSegment::Key(key) => node.as_array_mut()?.iter_mut().rev().find(|e| key.matches(e)),
            PathSegment::Index(index) => node.as_array_mut()?.get_mut(*index),
        })
}

/// Sets the node at `path`, creating intermediate containers.
///
/// A keyed element that already exists is replaced in place; a missing one is
/// appended. Positional segments in last position append.
///
/// # Errors
///
/// Returns an error if an intermediate node has the wrong shape.
pub fn set_at(root: &mut Value, path: &TreePath, value: Value) -> Result<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        *root = value;
        return Ok(());
    };

    let mut node = root;
    for segment in parents {
        node = descend_or_create(node, segment, path)?;
    }

    match last {
        PathSegment::Field(name) => {
            ensure_object(node, path)?.insert(name.clone(), value);
        }
        PathSegment::Key(key) => {
            let items = ensure_array(node, path)?;
            match items.iter_mut().rev().find(|e| key.matches(e)) {
                Some(existing) => *existing = value,
                None => items.push(value),
            }
        }
        PathSegment::Index(_) => ensure_array(node, path)?.push(value),
    }
    Ok(())
}

/// Removes the node at `path`. Missing nodes are ignored.
///
/// For a positional segment, `hint` selects the element to remove by value,
/// which stays correct after earlier removals shifted positions.
///
/// # Errors
///
/// Returns an error if an intermediate node has the wrong shape.
pub fn remove_at(root: &mut Value, path: &TreePath, hint: Option<&Value>) -> Result<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        *root = Value::Null;
        return Ok(());
    };

    let mut node = root;
    for segment in parents {
        let next = match segment {
            PathSegment::Field(name) => node.as_object_mut().and_then(|o| o.get_mut(name)),
            PathSegment::Key(key) => node
                .as_array_mut()
                .and_then(|items| items.iter_mut().rev().find(|e| key.matches(e))),
            PathSegment::Index(index) => node.as_array_mut().and_then(|i| i.get_mut(*index)),
        };
        match next {
            Some(next) => node = next,
            None => return Ok(()),
        }
    }

    match (last, node) {
        (PathSegment::Field(name), Value::Object(object)) => {
            object.remove(name);
        }
        (PathSegment::Key(key), Value::Array(items)) => items.retain(|e| !key.matches(e)),
        (PathSegment::Index(index), Value::Array(items)) => {
            let position = hint.map_or(Some(*index), |h| items.iter().position(|e| e == h));
            if let Some(position) = position.filter(|p| *p < items.len()) {
                items.remove(position);
            }
        }
        (_, Value::Null) => {}
        _ => {
            return Err(ReconcileError::UnresolvedPath {
                path: path.to_string(),
                reason: String::from("parent has the wrong shape"),
            }
            .into());
        }
    }
    Ok(())
}

/// Deep-merges `overlay` into `base`; overlay values win on conflict.
///
/// Keyed lists merge element-wise by key, unkeyed lists are replaced whole.
pub fn deep_merge(base: &mut Value, overlay: &Value, keys: &KeySpecTable, schema_path: &str) {
    match (base, overlay) {
        (Value::Object(base_obj), Value::Object(overlay_obj)) => {
            for (name, value) in overlay_obj {
                let child_path = join_schema_path(schema_path, name);
                match base_obj.get_mut(name) {
                    Some(existing) => deep_merge(existing, value, keys, &child_path),
                    None => {
                        base_obj.insert(name.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(base_items), Value::Array(overlay_items)) => {
            let Some(key_fields) = keys.keys_for(schema_path) else {
                base_items.clone_from(overlay_items);
                return;
            };
            // Key-less elements match equal base elements one for one.
            let mut consumed = vec![false; base_items.len()];
            for item in overlay_items {
                match ElementKey::extract(item, key_fields) {
                    Some(key) => match base_items.iter().rposition(|e| key.matches(e)) {
                        Some(position) => {
                            deep_merge(&mut base_items[position], item, keys, schema_path);
                        }
                        None => base_items.push(item.clone()),
                    },
                    None => {
                        let position =
                            (0..consumed.len()).find(|&i| !consumed[i] && base_items[i] == *item);
                        match position {
                            Some(position) => consumed[position] = true,
                            None => base_items.push(item.clone()),
                        }
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

fn descend_or_create<'a>(
    node: &'a mut Value,
    segment: &PathSegment,
    path: &TreePath,
) -> Result<&'a mut Value> {
    match segment {
        PathSegment::Field(name) => Ok(ensure_object(node, path)?
            .entry(name.clone())
            .or_insert(Value::Null)),
        PathSegment::Key(key) => {
            let items = ensure_array(node, path)?;
            let position = match items.iter().rposition(|e| key.matches(e)) {
                Some(position) => position,
                None => {
                    items.push(key.to_object());
                    items.len() - 1
                }
            };
            Ok(&mut items[position])
        }
        PathSegment::Index(index) => ensure_array(node, path)?
            .get_mut(*index)
            .ok_or_else(|| {
                ReconcileError::UnresolvedPath {
                    path: path.to_string(),
                    reason: format!("no element at position {index}"),
                }
                .into()
            }),
    }
}

fn ensure_object<'a>(node: &'a mut Value, path: &TreePath) -> Result<&'a mut Map<String, Value>> {
    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    node.as_object_mut().ok_or_else(|| {
        ReconcileError::UnresolvedPath {
            path: path.to_string(),
            reason: String::from("expected a mapping"),
        }
        .into()
    })
}

fn ensure_array<'a>(node: &'a mut Value, path: &TreePath) -> Result<&'a mut Vec<Value>> {
    if node.is_null() {
        *node = Value::Array(Vec::new());
    }
    node.as_array_mut().ok_or_else(|| {
        ReconcileError::UnresolvedPath {
            path: path.to_string(),
            reason: String::from("expected a list"),
        }
        .into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn key(name: &str) -> ElementKey {
        ElementKey::extract(&json!({ "name": name }), &[String::from("name")])
            .expect("key should extract")
    }

    #[test]
    fn test_get_at() {
        let tree = json!({ "vrfs": [{ "name": "A", "mtu": 1500 }] });
        let path = TreePath::root().field("vrfs").key(key("A")).field("mtu");
        assert_eq!(get_at(&tree, &path), Some(&json!(1500)));
        assert!(get_at(&tree, &TreePath::root().field("missing")).is_none());
    }

    #[test]
    fn test_get_at_mut() {
        let mut tree = json!({ "vrfs": [{ "name": "A", "mtu": 1500 }] });
        let path = TreePath::root().field("vrfs").key(key("A")).field("mtu");
        if let Some(mtu) = get_at_mut(&mut tree, &path) {
            *mtu = json!(9216);
        }
        assert_eq!(tree, json!({ "vrfs": [{ "name": "A", "mtu": 9216 }] }));
    }

    #[test]
    fn test_set_creates_intermediates() {
        let mut tree = Value::Null;
        let path = TreePath::root().field("vrfs").key(key("A")).field("mtu");
        set_at(&mut tree, &path, json!(9216)).expect("set should succeed");
        assert_eq!(tree, json!({ "vrfs": [{ "name": "A", "mtu": 9216 }] }));
    }

    #[test]
    fn test_set_replaces_keyed_element() {
        let mut tree = json!([{ "name": "A", "mtu": 1500 }]);
        let path = TreePath::root().key(key("A"));
        set_at(&mut tree, &path, json!({ "name": "A", "mtu": 9000 })).expect("set");
        assert_eq!(tree, json!([{ "name": "A", "mtu": 9000 }]));
    }

    #[test]
    fn test_remove() {
        let mut tree = json!([{ "name": "A", "mtu": 1500 }, { "name": "B" }]);
        remove_at(&mut tree, &TreePath::root().key(key("B")), None).expect("remove");
        remove_at(&mut tree, &TreePath::root().key(key("A")).field("mtu"), None).expect("remove");
        assert_eq!(tree, json!([{ "name": "A" }]));

        let mut tags = json!({ "tags": ["x", "y", "z"] });
        let hint = json!("z");
        remove_at(&mut tags, &TreePath::root().field("tags").index(2), Some(&hint)).expect("remove");
        assert_eq!(tags, json!({ "tags": ["x", "y"] }));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut tree = json!({ "a": 1 });
        remove_at(&mut tree, &TreePath::root().field("b").field("c"), None).expect("remove");
        assert_eq!(tree, json!({ "a": 1 }));
    }

    #[test]
    fn test_deep_merge() {
        let keys = KeySpecTable::new().with("vrfs", &["name"]);
        let mut base = json!({
            "vrfs": [{ "name": "A", "mtu": 1500, "desc": "a" }],
            "tags": ["x", "y"],
        });
        let overlay = json!({
            "vrfs": [{ "name": "A", "mtu": 9216 }, { "name": "B" }],
            "tags": ["z"],
        });
        deep_merge(&mut base, &overlay, &keys, "");
        assert_eq!(
            base,
            json!({
                "vrfs": [{ "name": "A", "mtu": 9216, "desc": "a" }, { "name": "B" }],
                "tags": ["z"],
            })
        );
    }

    #[test]
    fn test_duplicate_keys_address_last_element() {
        let mut tree = json!([{ "name": "A", "mtu": 1 }, { "name": "A", "mtu": 2 }]);
        let mtu = TreePath::root().key(key("A")).field("mtu");
        assert_eq!(get_at(&tree, &mtu), Some(&json!(2)));

        set_at(&mut tree, &mtu, json!(3)).expect("set");
        assert_eq!(tree, json!([{ "name": "A", "mtu": 1 }, { "name": "A", "mtu": 3 }]));
    }

    #[test]
    fn test_deep_merge_counts_keyless_duplicates() {
        let keys = KeySpecTable::new().with("", &["name"]);
        let mut base = json!([{ "name": "A" }, { "mtu": 1 }]);
        let overlay = json!([{ "name": "A" }, { "mtu": 1 }, { "mtu": 1 }]);
        deep_merge(&mut base, &overlay, &keys, "");
        assert_eq!(base, overlay);
    }
}
