//! Reconciliation result type.

use serde::Serialize;
use serde_json::Value;

use super::mode::DesiredState;
use super::operation::{Operation, OperationKind};

/// Outcome of reconciling one resource.
#[derive(Debug, Clone, Serialize)]
pub struct Reconciliation {
    /// Resource name.
    pub resource: String,
    /// Mode the operations were computed for.
    pub state: DesiredState,
    /// Device tree the operations were computed against.
    pub before: Value,
    /// Operations in execution order.
    pub operations: Vec<Operation>,
    /// Predicted device tree once the operations are applied.
    pub after: Value,
    /// Non-fatal findings, such as degraded key specifications.
    pub warnings: Vec<String>,
}

impl Reconciliation {
    /// Returns true if nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of operations of one kind.
    #[must_use]
    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations.iter().filter(|op| op.kind == kind).count()
    }
}

impl std::fmt::Display for Reconciliation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.operations.is_empty() {
            return write!(f, "{} ({}): no changes required", self.resource, self.state);
        }

        writeln!(
            f,
            "{} ({}): {} operation(s)",
            self.resource,
            self.state,
            self.operations.len()
        )?;
        for (i, op) in self.operations.iter().enumerate() {
            writeln!(f, "  {i}. {op}")?;
        }

        if !self.warnings.is_empty() {
            writeln!(f, "\nWarnings:")?;
            for warning in &self.warnings {
                writeln!(f, "  - {warning}")?;
            }
        }

        Ok(())
    }
}
