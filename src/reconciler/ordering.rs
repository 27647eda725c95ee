//! Ordering of operations before they reach the device.
//!
//! Removals run before writes so the device never holds two elements with the
//! same key at once. Request translators with resource-specific constraints
//! supply their own [`OrderingHook`].

use tracing::debug;

use super::operation::Operation;

/// Orders (and may prune) the operations of one reconciliation.
pub trait OrderingHook: Send + Sync {
    /// Returns the operations in execution order.
    fn order(&self, operations: Vec<Operation>) -> Vec<Operation>;
}

/// Default ordering.
///
/// 1. Removals first. A removal whose ancestor is also removed is dropped,
///    and ancestors run before descendants.
/// 2. Adds and replaces next, parents before children.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultOrdering;

impl OrderingHook for DefaultOrdering {
    fn order(&self, operations: Vec<Operation>) -> Vec<Operation> {
        let (removes, mut writes): (Vec<_>, Vec<_>) =
            operations.into_iter().partition(Operation::is_remove);

        let before = removes.len();
        let mut pruned: Vec<Operation> = removes
            .iter()
            .filter(|op| !removes.iter().any(|other| other.path.is_ancestor_of(&op.path)))
            .cloned()
            .collect();
        if pruned.len() < before {
            debug!(
                "Pruned {} removal(s) covered by a parent removal",
                before - pruned.len()
            );
        }

        pruned.sort_by_key(|op| op.path.len());
        writes.sort_by_key(|op| op.path.len());

        pruned.extend(writes);
        pruned
    }
}
