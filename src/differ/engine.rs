//! Structural diff engine.
//!
//! This module computes the difference between a desired ("want") tree and
//! the device ("have") tree, matching keyed list elements by their key
//! fields and treating unkeyed lists as single values.

use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

use super::change::{Change, ChangeKind, DiffResult};
use crate::error::ConfigError;
use crate::schema::KeySpecTable;
use crate::tree::{ElementKey, TreePath, join_schema_path};

static NULL: Value = Value::Null;

/// Engine for computing diffs between want and have trees.
#[derive(Debug)]
pub struct DiffEngine<'a> {
    /// Key specifications of the resource's lists.
    keys: &'a KeySpecTable,
}

/// Want-side and have-side residue of one node.
#[derive(Debug, Default)]
struct Delta {
    want: Option<Value>,
    have: Option<Value>,
}

/// Elements of one list side, split by whether they carry their key.
struct IndexedList<'v> {
    keyed: Vec<(ElementKey, &'v Value)>,
    lookup: HashMap<String, usize>,
    unkeyed: Vec<(usize, &'v Value)>,
}

/// Mutable state of one diff walk.
struct Walk<'a> {
    keys: &'a KeySpecTable,
    changes: Vec<Change>,
    diagnostics: Vec<ConfigError>,
}

impl<'a> DiffEngine<'a> {
    /// Creates a diff engine for a key specification table.
    #[must_use]
    pub const fn new(keys: &'a KeySpecTable) -> Self {
        Self { keys }
    }

    /// Computes the diff between `want` and `have`.
    ///
    /// A `Null` side is treated as absent: every field of the other side is
    /// reported, mappings field by field and keyed lists element by element.
    #[must_use]
    pub fn diff(&self, want: &Value, have: &Value) -> DiffResult {
        let mut walk = Walk {
            keys: self.keys,
            changes: Vec::new(),
            diagnostics: Vec::new(),
        };
        let delta = walk.node(want, have, "", &TreePath::root());

        debug!(
            "Diff: {} change(s), {} key diagnostic(s)",
            walk.changes.len(),
            walk.diagnostics.len()
        );

        DiffResult {
            want_delta: delta.want.unwrap_or(Value::Null),
            have_delta: delta.have.unwrap_or(Value::Null),
            changes: walk.changes,
            diagnostics: walk.diagnostics,
        }
    }

    /// Reports every field of `tree` as added or removed, as if the other
    /// side were empty.
    #[must_use]
    pub fn skeleton(&self, tree: &Value, kind: ChangeKind) -> DiffResult {
        match kind {
            ChangeKind::Removed => self.diff(&Value::Null, tree),
            ChangeKind::Added | ChangeKind::Modified => self.diff(tree, &Value::Null),
        }
    }
}

impl Walk<'_> {
    fn node(&mut self, want: &Value, have: &Value, spath: &str, path: &TreePath) -> Delta {
        if want == have {
            return Delta::default();
        }

        match (want, have) {
            (Value::Null, _) => {
                self.expand(have, spath, path, ChangeKind::Removed);
                Delta {
                    want: None,
                    have: Some(have.clone()),
                }
            }
            (_, Value::Null) => {
                self.expand(want, spath, path, ChangeKind::Added);
                Delta {
                    want: Some(want.clone()),
                    have: None,
                }
            }
            (Value::Object(w), Value::Object(h)) => self.objects(w, h, spath, path),
            (Value::Array(w), Value::Array(h)) => {
                let table = self.keys;
                match table.keys_for(spath) {
                    Some(keys) => self.keyed_lists(w, h, keys, spath, path),
                    None => self.whole(want, have, path),
                }
            }
            _ => self.whole(want, have, path),
        }
    }

    fn objects(
        &mut self,
        want: &Map<String, Value>,
        have: &Map<String, Value>,
        spath: &str,
        path: &TreePath,
    ) -> Delta {
        let names: BTreeSet<&String> = want.keys().chain(have.keys()).collect();
        let mut want_out = Map::new();
        let mut have_out = Map::new();

        for name in names {
            let delta = self.node(
                want.get(name).unwrap_or(&NULL),
                have.get(name).unwrap_or(&NULL),
                &join_schema_path(spath, name),
                &path.field(name),
            );
            if let Some(value) = delta.want {
                want_out.insert(name.clone(), value);
            }
            if let Some(value) = delta.have {
                have_out.insert(name.clone(), value);
            }
        }

        Delta {
            want: (!want_out.is_empty()).then_some(Value::Object(want_out)),
            have: (!have_out.is_empty()).then_some(Value::Object(have_out)),
        }
    }

    fn keyed_lists(
        &mut self,
        want: &[Value],
        have: &[Value],
        keys: &[String],
        spath: &str,
        path: &TreePath,
    ) -> Delta {
        let want_idx = IndexedList::build(want, keys, path);
        let have_idx = IndexedList::build(have, keys, path);

        if want_idx.keyed.is_empty() && have_idx.keyed.is_empty() {
            self.malformed(keys, spath, path);
            return self.whole_list(want, have, path);
        }

        let mut want_out = Vec::new();
        let mut have_out = Vec::new();

        for (key, want_elem) in &want_idx.keyed {
            let elem_path = path.key(key.clone());
            match have_idx.get(key) {
                None => {
                    self.changes.push(Change::added(elem_path, (*want_elem).clone()));
                    want_out.push((*want_elem).clone());
                }
                Some(have_elem) => {
                    let delta = self.node(want_elem, have_elem, spath, &elem_path);
                    if let Some(value) = delta.want {
                        want_out.push(with_key_fields(value, key));
                    }
                    if let Some(value) = delta.have {
                        have_out.push(with_key_fields(value, key));
                    }
                }
            }
        }

        for (key, have_elem) in &have_idx.keyed {
            if want_idx.get(key).is_none() {
                self.changes
                    .push(Change::removed(path.key(key.clone()), (*have_elem).clone()));
                have_out.push((*have_elem).clone());
            }
        }

        // Elements without their key fields are matched as whole values, each
        // have element answering for at most one want element.
        let mut matched = vec![false; have_idx.unkeyed.len()];
        for (index, want_elem) in &want_idx.unkeyed {
            let hit = (0..matched.len())
                .find(|&i| !matched[i] && have_idx.unkeyed[i].1 == *want_elem);
            match hit {
                Some(i) => matched[i] = true,
                None => {
                    self.changes
                        .push(Change::added(path.index(*index), (*want_elem).clone()));
                    want_out.push((*want_elem).clone());
                }
            }
        }
        for ((index, have_elem), &used) in have_idx.unkeyed.iter().zip(&matched) {
            if !used {
                self.changes
                    .push(Change::removed(path.index(*index), (*have_elem).clone()));
                have_out.push((*have_elem).clone());
            }
        }

        Delta {
            want: (!want_out.is_empty()).then_some(Value::Array(want_out)),
            have: (!have_out.is_empty()).then_some(Value::Array(have_out)),
        }
    }

    fn whole_list(&mut self, want: &[Value], have: &[Value], path: &TreePath) -> Delta {
        let want = Value::Array(want.to_vec());
        let have = Value::Array(have.to_vec());
        if want == have {
            return Delta::default();
        }
        self.whole(&want, &have, path)
    }

    fn whole(&mut self, want: &Value, have: &Value, path: &TreePath) -> Delta {
        self.changes
            .push(Change::modified(path.clone(), have.clone(), want.clone()));
        Delta {
            want: Some(want.clone()),
            have: Some(have.clone()),
        }
    }

    /// Reports a one-sided value: mappings field by field, keyed lists element
    /// by element, anything else as a single change.
    fn expand(&mut self, value: &Value, spath: &str, path: &TreePath, kind: ChangeKind) {
        match value {
            Value::Null => {}
            Value::Object(object) if !object.is_empty() => {
                for (name, child) in object {
                    self.expand(child, &join_schema_path(spath, name), &path.field(name), kind);
                }
            }
            Value::Array(items) if !items.is_empty() => {
                let table = self.keys;
                let indexed = match table.keys_for(spath) {
                    Some(keys) => {
                        let indexed = IndexedList::build(items, keys, path);
                        if indexed.keyed.is_empty() {
                            self.malformed(keys, spath, path);
                            None
                        } else {
                            Some(indexed)
                        }
                    }
                    None => None,
                };
                match indexed {
                    Some(indexed) => {
                        for (key, elem) in &indexed.keyed {
                            self.push_one_sided(kind, path.key(key.clone()), elem);
                        }
                        for (index, elem) in &indexed.unkeyed {
                            self.push_one_sided(kind, path.index(*index), elem);
                        }
                    }
                    None => self.push_one_sided(kind, path.clone(), value),
                }
            }
            _ => self.push_one_sided(kind, path.clone(), value),
        }
    }

    /// Records a key specification that no element of the list satisfies.
    fn malformed(&mut self, keys: &[String], spath: &str, path: &TreePath) {
        warn!(
            "Key [{}] absent from every element of {path}; comparing the whole list",
            keys.join(", ")
        );
        self.diagnostics.push(ConfigError::MalformedKeySpec {
            path: if spath.is_empty() { String::from("<root>") } else { spath.to_string() },
            keys: keys.join(", "),
        });
    }

    fn push_one_sided(&mut self, kind: ChangeKind, path: TreePath, value: &Value) {
        let change = match kind {
            ChangeKind::Removed => Change::removed(path, value.clone()),
            ChangeKind::Added | ChangeKind::Modified => Change::added(path, value.clone()),
        };
        self.changes.push(change);
    }
}

impl<'v> IndexedList<'v> {
    /// Indexes list elements by key. When two elements share a key the last
    /// one wins, keeping the position of the first.
    fn build(items: &'v [Value], keys: &[String], path: &TreePath) -> Self {
        let mut indexed = Self {
            keyed: Vec::new(),
            lookup: HashMap::new(),
            unkeyed: Vec::new(),
        };

        for (index, item) in items.iter().enumerate() {
            let Some(key) = ElementKey::extract(item, keys) else {
                indexed.unkeyed.push((index, item));
                continue;
            };
            let canonical = key.canonical();
            match indexed.lookup.get(&canonical) {
                Some(&position) => {
                    warn!("Duplicate key [{key}] in {path}; the last element wins");
                    indexed.keyed[position].1 = item;
                }
                None => {
                    indexed.lookup.insert(canonical, indexed.keyed.len());
                    indexed.keyed.push((key, item));
                }
            }
        }

        indexed
    }

    fn get(&self, key: &ElementKey) -> Option<&'v Value> {
        self.lookup
            .get(&key.canonical())
            .map(|&position| self.keyed[position].1)
    }
}

/// Re-adds key fields to a matched element's residue.
fn with_key_fields(value: Value, key: &ElementKey) -> Value {
    match value {
        Value::Object(mut object) => {
            for (name, key_value) in key.fields() {
                object.insert(name.clone(), key_value.clone());
            }
            Value::Object(object)
        }
        other => other,
    }
}
