//! Device-facing operations produced by the reconciler.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::differ::{Change, ChangeKind};
use crate::tree::TreePath;

/// A single operation to apply to the device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Operation {
    /// Operation type.
    pub kind: OperationKind,
    /// Location of the operation.
    pub path: TreePath,
    /// Value to write, or the value being removed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

/// Types of operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OperationKind {
    /// Create a field or element absent from the device.
    Add,
    /// Delete a field or element from the device.
    Remove,
    /// Overwrite a value present on the device.
    Replace,
}

impl Operation {
    /// Creates an add operation.
    #[must_use]
    pub const fn add(path: TreePath, value: Value) -> Self {
        Self {
            kind: OperationKind::Add,
            path,
            value: Some(value),
        }
    }

    /// Creates a remove operation.
    #[must_use]
    pub const fn remove(path: TreePath, value: Value) -> Self {
        Self {
            kind: OperationKind::Remove,
            path,
            value: Some(value),
        }
    }

    /// Creates a replace operation.
    #[must_use]
    pub const fn replace(path: TreePath, value: Value) -> Self {
        Self {
            kind: OperationKind::Replace,
            path,
            value: Some(value),
        }
    }

    /// Returns true for removals.
    #[must_use]
    pub fn is_remove(&self) -> bool {
        self.kind == OperationKind::Remove
    }
}

impl From<&Change> for Operation {
    fn from(change: &Change) -> Self {
        let path = change.path.clone();
        match change.kind {
            ChangeKind::Added => Self::add(path, change.new.clone().unwrap_or_default()),
            ChangeKind::Removed => Self::remove(path, change.old.clone().unwrap_or_default()),
            ChangeKind::Modified => Self::replace(path, change.new.clone().unwrap_or_default()),
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "ADD",
            Self::Remove => "REMOVE",
            Self::Replace => "REPLACE",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.path)?;
        if let (OperationKind::Add | OperationKind::Replace, Some(value)) = (self.kind, &self.value) {
            write!(f, " = {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_change() {
        let path = TreePath::root().field("mtu");
        let op = Operation::from(&Change::modified(path.clone(), json!(1500), json!(9216)));
        assert_eq!(op, Operation::replace(path.clone(), json!(9216)));

        let op = Operation::from(&Change::removed(path.clone(), json!(1500)));
        assert!(op.is_remove());
        assert_eq!(op.value, Some(json!(1500)));
    }

    #[test]
    fn test_display_and_json() {
        let op = Operation::replace(TreePath::root().field("mtu"), json!(9216));
        assert_eq!(op.to_string(), "REPLACE mtu = 9216");
        assert_eq!(
            serde_json::to_value(&op).expect("serialize"),
            json!({ "kind": "REPLACE", "path": "mtu", "value": 9216 })
        );
    }
}
