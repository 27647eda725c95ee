//! Per-mode selection of operations.
//!
//! Every mode starts from `diff(want, have)` over normalized trees. Values
//! equal to their schema default are treated as unset and never removed.

use serde_json::Value;

use super::mode::DesiredState;
use super::operation::Operation;
use crate::differ::{ChangeKind, DiffEngine, DiffResult};
use crate::schema::{KeySpecTable, ResourceDescriptor};
use crate::tree::{ElementKey, TreePath, is_empty_tree, join_schema_path};

/// Builds the unordered operations of one reconciliation.
pub(super) struct Policy<'a> {
    pub(super) resource: &'a ResourceDescriptor,
    pub(super) keys: &'a KeySpecTable,
}

impl Policy<'_> {
    /// Operations for `state`, with the diff they were drawn from.
    pub(super) fn operations(
        &self,
        want: &Value,
        have: &Value,
        state: DesiredState,
    ) -> (Vec<Operation>, DiffResult) {
        let engine = DiffEngine::new(self.keys);

        match state {
            DesiredState::Merged | DesiredState::Replaced | DesiredState::Overridden => {
                let diff = engine.diff(want, have);
                let ops = diff
                    .changes
                    .iter()
                    .filter(|change| match change.kind {
                        ChangeKind::Added | ChangeKind::Modified => true,
                        ChangeKind::Removed => {
                            let in_scope = match state {
                                DesiredState::Replaced => change.path.is_within_element(),
                                DesiredState::Overridden => true,
                                DesiredState::Merged | DesiredState::Deleted => false,
                            };
                            in_scope && !self.is_default_value(&change.path, change.old.as_ref())
                        }
                    })
                    .map(Operation::from)
                    .collect();
                (ops, diff)
            }
            DesiredState::Deleted if is_empty_tree(want) => {
                let diff = engine.skeleton(have, ChangeKind::Removed);
                let ops = diff
                    .changes
                    .iter()
                    .filter(|change| !self.is_default_value(&change.path, change.old.as_ref()))
                    .map(Operation::from)
                    .collect();
                (ops, diff)
            }
            DesiredState::Deleted => {
                let mut ops = Vec::new();
                self.intersect(want, have, "", &TreePath::root(), &mut ops);
                (ops, engine.diff(want, have))
            }
        }
    }

    fn is_default_value(&self, path: &TreePath, value: Option<&Value>) -> bool {
        value.is_some_and(|v| self.resource.is_default(&path.schema_path(), v))
    }

    /// Removes what `want` and `have` share.
    fn intersect(
        &self,
        want: &Value,
        have: &Value,
        spath: &str,
        path: &TreePath,
        ops: &mut Vec<Operation>,
    ) {
        match (want, have) {
            (Value::Object(w), Value::Object(h)) => {
                for (name, want_child) in w {
                    if let Some(have_child) = h.get(name) {
                        self.intersect(
                            want_child,
                            have_child,
                            &join_schema_path(spath, name),
                            &path.field(name),
                            ops,
                        );
                    }
                }
            }
            (Value::Array(w), Value::Array(h)) => match self.keys.keys_for(spath) {
                Some(keys) => self.intersect_keyed(w, h, keys, spath, path, ops),
                None => intersect_unkeyed(w, h, path, ops),
            },
            _ if want == have && !self.resource.is_default(spath, have) => {
                ops.push(Operation::remove(path.clone(), have.clone()));
            }
            _ => {}
        }
    }

    fn intersect_keyed(
        &self,
        want: &[Value],
        have: &[Value],
        keys: &[String],
        spath: &str,
        path: &TreePath,
        ops: &mut Vec<Operation>,
    ) {
        for want_elem in want {
            let Some(key) = ElementKey::extract(want_elem, keys) else {
                if let Some(index) = have.iter().position(|h| h == want_elem) {
                    ops.push(Operation::remove(path.index(index), want_elem.clone()));
                }
                continue;
            };
            // Last element wins on duplicate keys, as in the differ.
            let Some(have_elem) = have.iter().rev().find(|h| key.matches(h)) else {
                continue;
            };
            let elem_path = path.key(key);

            match (non_key_fields(want_elem, keys), have_elem) {
                (Some(fields), Value::Object(h)) if !fields.is_empty() => {
                    for (name, want_child) in fields {
                        if let Some(have_child) = h.get(name) {
                            self.intersect(
                                want_child,
                                have_child,
                                &join_schema_path(spath, name),
                                &elem_path.field(name),
                                ops,
                            );
                        }
                    }
                }
                _ => ops.push(Operation::remove(elem_path, have_elem.clone())),
            }
        }
    }
}

/// Shared elements of an unkeyed list are removed one by one, or the whole
/// field when nothing else would remain.
fn intersect_unkeyed(want: &[Value], have: &[Value], path: &TreePath, ops: &mut Vec<Operation>) {
    let shared: Vec<(usize, &Value)> = have
        .iter()
        .enumerate()
        .filter(|(_, h)| want.contains(h))
        .collect();

    if shared.is_empty() {
        return;
    }
    if shared.len() == have.len() {
        ops.push(Operation::remove(path.clone(), Value::Array(have.to_vec())));
        return;
    }
    for (index, value) in shared {
        ops.push(Operation::remove(path.index(index), value.clone()));
    }
}

/// Fields of a list element other than its key fields.
fn non_key_fields<'v>(element: &'v Value, keys: &[String]) -> Option<Vec<(&'v String, &'v Value)>> {
    element.as_object().map(|object| {
        object
            .iter()
            .filter(|(name, _)| !keys.contains(name))
            .collect()
    })
}
