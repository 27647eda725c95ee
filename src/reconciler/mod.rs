//! State reconciler.
//!
//! Turns a want tree, a have tree and a [`DesiredState`] into ordered device
//! operations and a predicted after tree. Pure computation: no I/O happens
//! here.
//!
//! | Mode         | Writes                | Removals                                   |
//! |--------------|-----------------------|--------------------------------------------|
//! | `merged`     | added and changed     | none                                       |
//! | `replaced`   | added and changed     | unnamed fields inside elements want names  |
//! | `overridden` | added and changed     | everything absent from want                |
//! | `deleted`    | none                  | all of have, or what want and have share   |

mod mode;
mod operation;
mod ordering;
mod plan;
mod policy;
mod predict;

pub use mode::DesiredState;
pub use operation::{Operation, OperationKind};
pub use ordering::{DefaultOrdering, OrderingHook};
pub use plan::Reconciliation;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::differ::{DiffEngine, DiffResult};
use crate::error::Result;
use crate::schema::{KeySpecTable, ResourceDescriptor, SchemaValidator};
use crate::tree::normalize;

use policy::Policy;
use predict::predict_after;

static DEFAULT_ORDERING: DefaultOrdering = DefaultOrdering;

/// Reconciler for one resource.
pub struct StateReconciler<'a> {
    resource: &'a ResourceDescriptor,
    keys: KeySpecTable,
    ordering: &'a dyn OrderingHook,
}

impl<'a> StateReconciler<'a> {
    /// Creates a reconciler using the resource's key specifications and the
    /// default ordering.
    #[must_use]
    pub fn new(resource: &'a ResourceDescriptor) -> Self {
        Self {
            resource,
            keys: resource.key_specs(),
            ordering: &DEFAULT_ORDERING,
        }
    }

    /// Replaces the ordering hook.
    #[must_use]
    pub fn with_ordering(mut self, ordering: &'a dyn OrderingHook) -> Self {
        self.ordering = ordering;
        self
    }

    /// Key specifications in use.
    #[must_use]
    pub const fn keys(&self) -> &KeySpecTable {
        &self.keys
    }

    /// Structural diff of `want` against `have`, after the same normalization
    /// and schema checks as [`Self::reconcile`].
    ///
    /// # Errors
    ///
    /// Returns an error if either tree violates the resource schema.
    pub fn diff(&self, want: &Value, have: &Value) -> Result<DiffResult> {
        let (want, have) = self.prepare(want, have)?;
        Ok(DiffEngine::new(&self.keys).diff(&want, &have))
    }

    /// Computes the operations that move `have` to `want` under `state`.
    ///
    /// Both trees are normalized first. An empty or null `want` under
    /// `deleted` removes everything.
    ///
    /// # Errors
    ///
    /// Returns an error if either tree violates the resource schema, or if an
    /// operation cannot be applied to the predicted tree.
    pub fn reconcile(&self, want: &Value, have: &Value, state: DesiredState) -> Result<Reconciliation> {
        let (want, have) = self.prepare(want, have)?;

        let policy = Policy {
            resource: self.resource,
            keys: &self.keys,
        };
        let (operations, diff) = policy.operations(&want, &have, state);
        debug!(
            "{}: {} change(s) selected {} operation(s) under {state}",
            self.resource.name,
            diff.changes.len(),
            operations.len()
        );

        let warnings: Vec<String> = diff.diagnostics.iter().map(ToString::to_string).collect();
        for warning in &warnings {
            warn!("{}: {warning}", self.resource.name);
        }

        let operations = self.ordering.order(operations);
        let after = predict_after(&have, &operations, self.resource, &self.keys)?;

        info!(
            "Reconciled {} ({state}): {} operation(s)",
            self.resource.name,
            operations.len()
        );

        Ok(Reconciliation {
            resource: self.resource.name.clone(),
            state,
            before: have,
            operations,
            after,
            warnings,
        })
    }
}

impl StateReconciler<'_> {
    /// Normalizes both trees and checks them against the schema.
    fn prepare(&self, want: &Value, have: &Value) -> Result<(Value, Value)> {
        let want = normalize(want);
        let have = normalize(have);

        let validator = SchemaValidator::new(self.resource);
        validator.validate(&want)?;
        validator.validate(&have)?;
        Ok((want, have))
    }
}

impl std::fmt::Debug for StateReconciler<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateReconciler")
            .field("resource", &self.resource.name)
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::deep_merge;
    use serde_json::json;

    const INTERFACES: &str = r"
name: interfaces
schema:
  type: list
  key: [name]
  element:
    type: dict
    fields:
      name: { type: scalar, kind: string }
      mtu: { type: scalar, kind: int, default: 9100 }
      description: { type: scalar, kind: string }
      enabled: { type: scalar, kind: bool, default: true }
";

    const SYSTEM: &str = r"
name: system
schema:
  type: dict
  fields:
    hostname: { type: scalar, kind: string }
    tags: { type: list, element: { type: scalar, kind: string } }
    timezone: { type: scalar, kind: string, default: UTC }
";

    fn descriptor(yaml: &str) -> ResourceDescriptor {
        serde_yaml::from_str(yaml).expect("descriptor should parse")
    }

    fn paths(plan: &Reconciliation) -> Vec<String> {
        plan.operations
            .iter()
            .map(|op| format!("{} {}", op.kind, op.path))
            .collect()
    }

    fn scenario() -> (Value, Value) {
        let have = json!([{ "name": "A", "mtu": 1500 }, { "name": "B", "mtu": 9000 }]);
        let want = json!([{ "name": "A", "mtu": 9216 }]);
        (want, have)
    }

    #[test]
    fn test_merged_scenario() {
        let resource = descriptor(INTERFACES);
        let (want, have) = scenario();
        let plan = StateReconciler::new(&resource)
            .reconcile(&want, &have, DesiredState::Merged)
            .expect("reconcile");

        assert_eq!(paths(&plan), vec!["REPLACE [name=A].mtu"]);
        assert_eq!(plan.operations[0].value, Some(json!(9216)));
        assert_eq!(
            plan.after,
            json!([{ "name": "A", "mtu": 9216 }, { "name": "B", "mtu": 9000 }])
        );
        assert_eq!(plan.before, have);
    }

    #[test]
    fn test_replaced_scenario() {
        let resource = descriptor(INTERFACES);
        let (want, have) = scenario();
        let plan = StateReconciler::new(&resource)
            .reconcile(&want, &have, DesiredState::Replaced)
            .expect("reconcile");

        assert_eq!(paths(&plan), vec!["REPLACE [name=A].mtu"]);
    }

    #[test]
    fn test_replaced_resets_unnamed_fields() {
        let resource = descriptor(INTERFACES);
        let have = json!([
            { "name": "A", "mtu": 1500, "description": "uplink", "enabled": true },
            { "name": "B", "description": "spare" }
        ]);
        let want = json!([{ "name": "A" }]);
        let plan = StateReconciler::new(&resource)
            .reconcile(&want, &have, DesiredState::Replaced)
            .expect("reconcile");

        // enabled is at its default and counts as unset
        assert_eq!(
            paths(&plan),
            vec!["REMOVE [name=A].description", "REMOVE [name=A].mtu"]
        );
        assert_eq!(
            plan.after,
            json!([
                { "name": "A", "mtu": 9100, "enabled": true },
                { "name": "B", "description": "spare" }
            ])
        );
    }

    #[test]
    fn test_overridden_scenario() {
        let resource = descriptor(INTERFACES);
        let (want, have) = scenario();
        let plan = StateReconciler::new(&resource)
            .reconcile(&want, &have, DesiredState::Overridden)
            .expect("reconcile");

        assert_eq!(paths(&plan), vec!["REMOVE [name=B]", "REPLACE [name=A].mtu"]);
        assert_eq!(plan.after, json!([{ "name": "A", "mtu": 9216 }]));
    }

    #[test]
    fn test_deleted_everything() {
        let resource = descriptor(INTERFACES);
        let (_, have) = scenario();
        let plan = StateReconciler::new(&resource)
            .reconcile(&Value::Null, &have, DesiredState::Deleted)
            .expect("reconcile");

        assert_eq!(paths(&plan), vec!["REMOVE [name=A]", "REMOVE [name=B]"]);
        assert_eq!(plan.after, Value::Null);
    }

    #[test]
    fn test_deleted_intersection() {
        let resource = descriptor(INTERFACES);
        let (_, have) = scenario();
        let reconciler = StateReconciler::new(&resource);

        let plan = reconciler
            .reconcile(&json!([{ "name": "B" }]), &have, DesiredState::Deleted)
            .expect("reconcile");
        assert_eq!(paths(&plan), vec!["REMOVE [name=B]"]);

        // Fields named with another value, or absent from have, are left alone.
        let want = json!([
            { "name": "A", "mtu": 1500, "description": "x" },
            { "name": "B", "mtu": 1 },
            { "name": "C" }
        ]);
        let plan = reconciler
            .reconcile(&want, &have, DesiredState::Deleted)
            .expect("reconcile");
        assert_eq!(paths(&plan), vec!["REMOVE [name=A].mtu"]);
        assert_eq!(
            plan.after,
            json!([{ "name": "A", "mtu": 9100 }, { "name": "B", "mtu": 9000 }])
        );
    }

    #[test]
    fn test_deleted_unkeyed_list() {
        let resource = descriptor(SYSTEM);
        let have = json!({ "hostname": "leaf1", "tags": ["x", "y", "z"] });
        let reconciler = StateReconciler::new(&resource);

        let plan = reconciler
            .reconcile(&json!({ "tags": ["y"] }), &have, DesiredState::Deleted)
            .expect("reconcile");
        assert_eq!(paths(&plan), vec!["REMOVE tags[#1]"]);
        assert_eq!(plan.after, json!({ "hostname": "leaf1", "tags": ["x", "z"] }));

        let plan = reconciler
            .reconcile(&json!({ "tags": ["z", "y", "x"] }), &have, DesiredState::Deleted)
            .expect("reconcile");
        assert_eq!(paths(&plan), vec!["REMOVE tags"]);
    }

    #[test]
    fn test_unkeyed_list_replaced_whole() {
        let resource = descriptor(SYSTEM);
        let have = json!({ "tags": ["x", "y"] });
        let want = json!({ "tags": ["y", "x"] });
        let plan = StateReconciler::new(&resource)
            .reconcile(&want, &have, DesiredState::Merged)
            .expect("reconcile");

        assert_eq!(paths(&plan), vec!["REPLACE tags"]);
        assert_eq!(plan.after, want);
    }

    #[test]
    fn test_replaced_leaves_top_level_fields_of_dicts() {
        let resource = descriptor(SYSTEM);
        let have = json!({ "hostname": "leaf1", "timezone": "CET" });
        let want = json!({ "tags": ["a"] });

        let replaced = StateReconciler::new(&resource)
            .reconcile(&want, &have, DesiredState::Replaced)
            .expect("reconcile");
        assert_eq!(paths(&replaced), vec!["ADD tags"]);

        let overridden = StateReconciler::new(&resource)
            .reconcile(&want, &have, DesiredState::Overridden)
            .expect("reconcile");
        assert_eq!(
            paths(&overridden),
            vec!["REMOVE hostname", "REMOVE timezone", "ADD tags"]
        );
        assert_eq!(overridden.after, json!({ "tags": ["a"], "timezone": "UTC" }));
    }

    #[test]
    fn test_second_run_is_empty() {
        let resource = descriptor(INTERFACES);
        let have = json!([
            { "name": "A", "mtu": 1500, "description": "uplink" },
            { "name": "B", "mtu": 9000, "enabled": false }
        ]);
        let wants = [
            json!([{ "name": "A", "mtu": 9216 }, { "name": "C", "enabled": false }]),
            json!([{ "name": "B", "description": "spare" }]),
            json!([{ "name": "A", "description": "uplink" }]),
            Value::Null,
        ];
        let reconciler = StateReconciler::new(&resource);

        for want in &wants {
            for state in [
                DesiredState::Merged,
                DesiredState::Replaced,
                DesiredState::Overridden,
                DesiredState::Deleted,
            ] {
                let first = reconciler.reconcile(want, &have, state).expect("first run");
                let second = reconciler
                    .reconcile(want, &first.after, state)
                    .expect("second run");
                assert!(
                    second.is_empty(),
                    "{state} with want {want} not idempotent: {second}"
                );
            }
        }
    }

    #[test]
    fn test_merged_after_is_deep_merge() {
        let resource = descriptor(INTERFACES);
        let have = json!([
            { "name": "A", "mtu": 1500, "description": "uplink" },
            { "name": "B", "mtu": 9000 }
        ]);
        let want = json!([
            { "name": "A", "enabled": false },
            { "name": "C", "mtu": 1600 }
        ]);
        let plan = StateReconciler::new(&resource)
            .reconcile(&want, &have, DesiredState::Merged)
            .expect("reconcile");

        let mut expected = have.clone();
        deep_merge(&mut expected, &want, &resource.key_specs(), "");
        assert_eq!(plan.after, expected);
    }

    #[test]
    fn test_overridden_is_superset_of_replaced() {
        let resource = descriptor(INTERFACES);
        let have = json!([
            { "name": "A", "mtu": 1500, "description": "uplink" },
            { "name": "B", "mtu": 9000 },
            { "name": "C", "enabled": false }
        ]);
        let want = json!([{ "name": "A", "mtu": 9216 }, { "name": "C" }]);
        let reconciler = StateReconciler::new(&resource);

        let replaced = reconciler
            .reconcile(&want, &have, DesiredState::Replaced)
            .expect("reconcile");
        let overridden = reconciler
            .reconcile(&want, &have, DesiredState::Overridden)
            .expect("reconcile");

        for op in &replaced.operations {
            assert!(overridden.operations.contains(op), "missing {op}");
        }
        assert!(overridden.operations.len() > replaced.operations.len());
    }

    #[test]
    fn test_schema_violation_fails_before_diffing() {
        let resource = descriptor(INTERFACES);
        let want = json!([{ "name": "A", "mtu": "jumbo" }]);
        let result = StateReconciler::new(&resource).reconcile(&want, &json!([]), DesiredState::Merged);

        let err = result.expect_err("schema violation");
        assert!(err.to_string().contains("[name=A].mtu"));
    }

    #[test]
    fn test_missing_keys_degrade_to_whole_list() {
        let resource = descriptor(INTERFACES);
        let want = json!([{ "mtu": 1600 }]);
        let have = json!([{ "mtu": 1500 }]);
        let plan = StateReconciler::new(&resource)
            .reconcile(&want, &have, DesiredState::Merged)
            .expect("reconcile");

        assert_eq!(plan.warnings.len(), 1);
        assert_eq!(paths(&plan), vec!["REPLACE ."]);
        assert_eq!(plan.after, want);
    }

    #[test]
    fn test_duplicate_keys_are_idempotent() {
        let resource = descriptor(INTERFACES);
        let have = json!([{ "name": "A", "mtu": 1 }, { "name": "A", "mtu": 2 }]);
        let want = json!([{ "name": "A", "mtu": 3 }]);
        let reconciler = StateReconciler::new(&resource);

        let first = reconciler
            .reconcile(&want, &have, DesiredState::Merged)
            .expect("first run");
        assert_eq!(paths(&first), vec!["REPLACE [name=A].mtu"]);
        assert_eq!(first.after, json!([{ "name": "A", "mtu": 1 }, { "name": "A", "mtu": 3 }]));

        let second = reconciler
            .reconcile(&want, &first.after, DesiredState::Merged)
            .expect("second run");
        assert!(second.is_empty(), "not idempotent: {second}");
    }

    #[test]
    fn test_merged_adds_repeated_keyless_elements() {
        let resource = descriptor(INTERFACES);
        let have = json!([{ "name": "A" }, { "mtu": 1 }]);
        let want = json!([{ "name": "A" }, { "mtu": 1 }, { "mtu": 1 }]);
        let plan = StateReconciler::new(&resource)
            .reconcile(&want, &have, DesiredState::Merged)
            .expect("reconcile");

        assert_eq!(paths(&plan), vec!["ADD [#2]"]);
        assert_eq!(plan.after, want);
    }

    #[test]
    fn test_missing_keys_on_one_side_are_reported() {
        let resource = descriptor(INTERFACES);
        let tree = json!([{ "mtu": 1500 }]);
        let reconciler = StateReconciler::new(&resource);

        let merged = reconciler
            .reconcile(&tree, &Value::Null, DesiredState::Merged)
            .expect("reconcile");
        assert_eq!(paths(&merged), vec!["ADD ."]);
        assert_eq!(merged.warnings.len(), 1);

        let deleted = reconciler
            .reconcile(&Value::Null, &tree, DesiredState::Deleted)
            .expect("reconcile");
        assert_eq!(paths(&deleted), vec!["REMOVE ."]);
        assert_eq!(deleted.warnings.len(), 1);
    }

    #[test]
    fn test_diff_validates_both_trees() {
        let resource = descriptor(INTERFACES);
        let reconciler = StateReconciler::new(&resource);
        let valid = json!([{ "name": "A", "mtu": 1500 }]);
        let invalid = json!([{ "name": "A", "speed": 100 }]);

        assert!(reconciler.diff(&invalid, &valid).is_err());
        assert!(reconciler.diff(&valid, &invalid).is_err());

        let diff = reconciler
            .diff(&json!([{ "name": "A", "mtu": 9216 }]), &valid)
            .expect("diff");
        assert_eq!(diff.changes.len(), 1);
    }

    struct WritesFirst;

    impl OrderingHook for WritesFirst {
        fn order(&self, mut operations: Vec<Operation>) -> Vec<Operation> {
            operations.sort_by_key(Operation::is_remove);
            operations
        }
    }

    #[test]
    fn test_custom_ordering_hook() {
        let resource = descriptor(INTERFACES);
        let (want, have) = scenario();
        let hook = WritesFirst;
        let plan = StateReconciler::new(&resource)
            .with_ordering(&hook)
            .reconcile(&want, &have, DesiredState::Overridden)
            .expect("reconcile");

        assert_eq!(paths(&plan), vec!["REPLACE [name=A].mtu", "REMOVE [name=B]"]);
    }
}
