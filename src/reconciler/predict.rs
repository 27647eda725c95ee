//! Prediction of the device tree after a set of operations.

use serde_json::Value;

use super::operation::{Operation, OperationKind};
use crate::error::Result;
use crate::schema::{KeySpecTable, ResourceDescriptor};
use crate::tree::{PathSegment, deep_merge, get_at, get_at_mut, normalize, remove_at, set_at};

/// Applies `operations` to a copy of `have`.
///
/// A removed field with a schema default reads back as that default, which is
/// what the device reports once the configured value is gone.
pub(super) fn predict_after(
    have: &Value,
    operations: &[Operation],
    resource: &ResourceDescriptor,
    keys: &KeySpecTable,
) -> Result<Value> {
    let mut after = have.clone();

    for op in operations {
        let value = op.value.clone().unwrap_or_default();
        match op.kind {
            OperationKind::Remove => {
                remove_at(&mut after, &op.path, Some(&value))?;
                restore_default(&mut after, op, resource)?;
            }
            OperationKind::Add => {
                let is_element = matches!(op.path.last(), Some(PathSegment::Key(_)));
                let merged = match get_at_mut(&mut after, &op.path) {
                    Some(existing) if is_element && existing.is_object() => {
                        deep_merge(existing, &value, keys, &op.path.schema_path());
                        true
                    }
                    _ => false,
                };
                if !merged {
                    set_at(&mut after, &op.path, value)?;
                }
            }
            OperationKind::Replace => set_at(&mut after, &op.path, value)?,
        }
    }

    Ok(normalize(&after))
}

fn restore_default(after: &mut Value, op: &Operation, resource: &ResourceDescriptor) -> Result<()> {
    if !matches!(op.path.last(), Some(PathSegment::Field(_))) {
        return Ok(());
    }
    let Some(default) = resource.schema.default_at(&op.path.schema_path()) else {
        return Ok(());
    };
    let parent_exists = op
        .path
        .parent()
        .is_some_and(|parent| get_at(after, &parent).is_some());
    if parent_exists {
        set_at(after, &op.path, default.clone())?;
    }
    Ok(())
}
