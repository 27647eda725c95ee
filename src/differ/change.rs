//! Diff result types.

use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::ConfigError;
use crate::tree::TreePath;

/// Kind of difference at one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Present in want only.
    Added,
    /// Present in have only.
    Removed,
    /// Present in both with different values.
    Modified,
}

/// A single difference between want and have.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    /// Kind of difference.
    pub kind: ChangeKind,
    /// Location of the difference.
    pub path: TreePath,
    /// Have-side value (removed or modified).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old: Option<Value>,
    /// Want-side value (added or modified).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new: Option<Value>,
}

/// Complete diff between a want tree and a have tree.
#[derive(Debug, Default)]
pub struct DiffResult {
    /// Want-only and changed content, shaped like the inputs. Matched list
    /// elements carry their key fields. `Null` when nothing differs.
    pub want_delta: Value,
    /// Have-only and changed content, shaped like the inputs. `Null` when
    /// nothing differs.
    pub have_delta: Value,
    /// Every difference, one per path.
    pub changes: Vec<Change>,
    /// Key specifications that could not be applied; the affected lists were
    /// compared as whole values.
    pub diagnostics: Vec<ConfigError>,
}

impl Change {
    /// Creates an addition.
    #[must_use]
    pub const fn added(path: TreePath, value: Value) -> Self {
        Self {
            kind: ChangeKind::Added,
            path,
            old: None,
            new: Some(value),
        }
    }

    /// Creates a removal.
    #[must_use]
    pub const fn removed(path: TreePath, value: Value) -> Self {
        Self {
            kind: ChangeKind::Removed,
            path,
            old: Some(value),
            new: None,
        }
    }

    /// Creates a modification.
    #[must_use]
    pub const fn modified(path: TreePath, old: Value, new: Value) -> Self {
        Self {
            kind: ChangeKind::Modified,
            path,
            old: Some(old),
            new: Some(new),
        }
    }
}

impl DiffResult {
    /// Returns true if want and have are deeply equal.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Changes of the given kind.
    pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.kind == kind)
    }

    /// Number of changes of the given kind.
    #[must_use]
    pub fn count(&self, kind: ChangeKind) -> usize {
        self.of_kind(kind).count()
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "added",
            Self::Removed => "removed",
            Self::Modified => "modified",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.old, &self.new) {
            (Some(old), Some(new)) => write!(f, "~ {}: {old} -> {new}", self.path),
            (None, Some(new)) => write!(f, "+ {}: {new}", self.path),
            (Some(old), None) => write!(f, "- {}: {old}", self.path),
            (None, None) => write!(f, "  {}", self.path),
        }
    }
}
