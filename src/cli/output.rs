//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde_json::Value;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::differ::{ChangeKind, DiffResult};
use crate::error::SchemaError;
use crate::reconciler::{Operation, OperationKind};
use crate::runner::ModuleResult;
use crate::schema::ResourceRegistry;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Resource row for table display.
#[derive(Tabled)]
struct ResourceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Shape")]
    shape: String,
    #[tabled(rename = "Keys")]
    keys: String,
    #[tabled(rename = "REST path")]
    path: String,
}

/// Operation row for table display.
#[derive(Tabled)]
struct OperationRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Op")]
    kind: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Change row for table display.
#[derive(Tabled)]
struct ChangeRow {
    #[tabled(rename = "Change")]
    kind: String,
    #[tabled(rename = "Path")]
    path: String,
    #[tabled(rename = "Have")]
    old: String,
    #[tabled(rename = "Want")]
    new: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the registry contents.
    #[must_use]
    pub fn format_resources(&self, registry: &ResourceRegistry) -> String {
        match self.format {
            OutputFormat::Json => {
                let resources: Vec<_> = registry.iter().collect();
                serde_json::to_string_pretty(&resources).unwrap_or_default()
            }
            OutputFormat::Text => {
                let rows: Vec<ResourceRow> = registry
                    .iter()
                    .map(|r| {
                        let keys = r.key_specs();
                        ResourceRow {
                            name: r.name.clone(),
                            shape: r.schema.shape().to_string(),
                            keys: keys
                                .iter()
                                .map(|(path, fields)| {
                                    let path = if path.is_empty() { "." } else { path };
                                    format!("{path}[{}]", fields.join(","))
                                })
                                .collect::<Vec<_>>()
                                .join(" "),
                            path: r
                                .rest
                                .as_ref()
                                .map_or_else(|| "-".dimmed().to_string(), |rest| rest.path.clone()),
                        }
                    })
                    .collect();

                let mut output = format!("\nResources ({})\n\n", registry.len());
                if !rows.is_empty() {
                    output.push_str(&Table::new(rows).to_string());
                    output.push('\n');
                }
                output
            }
        }
    }

    /// Formats schema violations found in a configuration tree.
    #[must_use]
    pub fn format_violations(&self, resource: &str, violations: &[SchemaError]) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "resource": resource,
                    "valid": violations.is_empty(),
                    "violations": violations.iter().map(ToString::to_string).collect::<Vec<_>>(),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                if violations.is_empty() {
                    return format!("{} {resource}: configuration matches the schema\n", "✓".green());
                }
                let mut output = format!(
                    "{} {resource}: {} schema violation(s)\n",
                    "✗".red(),
                    violations.len()
                );
                for violation in violations {
                    let _ = writeln!(output, "   - {violation}");
                }
                output
            }
        }
    }

    /// Formats a structural diff.
    #[must_use]
    pub fn format_diff(&self, resource: &str, diff: &DiffResult) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "resource": resource,
                    "changes": diff.changes,
                    "want_delta": diff.want_delta,
                    "have_delta": diff.have_delta,
                    "warnings": diff.diagnostics.iter().map(ToString::to_string).collect::<Vec<_>>(),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                if diff.is_empty() {
                    return format!("{} {resource}: want and have are equal\n", "✓".green());
                }

                let rows: Vec<ChangeRow> = diff
                    .changes
                    .iter()
                    .map(|c| ChangeRow {
                        kind: Self::format_change_kind(c.kind),
                        path: c.path.to_string(),
                        old: c.old.as_ref().map_or_else(String::new, |v| Self::truncate(&v.to_string(), 40)),
                        new: c.new.as_ref().map_or_else(String::new, |v| Self::truncate(&v.to_string(), 40)),
                    })
                    .collect();

                let mut output = format!("\n{resource}\n\n");
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');

                let _ = write!(
                    output,
                    "\nDiff: {} added, {} modified, {} removed\n",
                    diff.count(ChangeKind::Added).to_string().green(),
                    diff.count(ChangeKind::Modified).to_string().yellow(),
                    diff.count(ChangeKind::Removed).to_string().red()
                );
                Self::push_warnings(&mut output, diff.diagnostics.iter().map(ToString::to_string));
                output
            }
        }
    }

    /// Formats the outcome of one module run.
    #[must_use]
    pub fn format_result(&self, result: &ModuleResult) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(result).unwrap_or_default(),
            OutputFormat::Text => Self::format_result_text(result),
        }
    }

    /// Formats the outcomes of a task file run.
    #[must_use]
    pub fn format_results(&self, results: &[ModuleResult]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(results).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output: String = results.iter().map(Self::format_result_text).collect();
                let changed = results.iter().filter(|r| r.changed).count();
                let _ = write!(
                    output,
                    "\n{} task(s): {} changed, {} unchanged\n",
                    results.len(),
                    changed.to_string().yellow(),
                    (results.len() - changed).to_string().green()
                );
                output
            }
        }
    }

    fn format_result_text(result: &ModuleResult) -> String {
        let header = format!("{} ({})", result.resource, result.state);
        if !result.changed {
            return format!("{} {header}: no changes required\n", "✓".green());
        }

        let verb = if result.check_mode { "would change" } else { "changed" };
        let mut output = format!("\n{} {header}: {verb}\n\n", "~".yellow());

        let rows: Vec<OperationRow> = result
            .operations
            .iter()
            .enumerate()
            .map(|(i, op)| OperationRow {
                index: i + 1,
                kind: Self::format_operation_kind(op.kind),
                path: op.path.to_string(),
                value: Self::format_value(op),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let _ = write!(
            output,
            "\nOperations: {} to add, {} to replace, {} to remove\n",
            count(&result.operations, OperationKind::Add).to_string().green(),
            count(&result.operations, OperationKind::Replace).to_string().yellow(),
            count(&result.operations, OperationKind::Remove).to_string().red()
        );

        if !result.requests.is_empty() {
            output.push_str("\nRequests:\n");
            for request in &result.requests {
                let _ = writeln!(output, "   {} {}", request.method, request.path);
            }
        }

        Self::push_warnings(&mut output, result.warnings.iter().cloned());
        output
    }

    fn push_warnings(output: &mut String, warnings: impl Iterator<Item = String>) {
        let warnings: Vec<String> = warnings.collect();
        if warnings.is_empty() {
            return;
        }
        let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
        for warning in warnings {
            let _ = writeln!(output, "   - {warning}");
        }
    }

    /// Formats a configuration tree.
    #[must_use]
    pub fn format_tree(&self, tree: &Value) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(tree).unwrap_or_default(),
            OutputFormat::Text => serde_yaml::to_string(tree).unwrap_or_default(),
        }
    }

    /// Formats an operation kind with color.
    fn format_operation_kind(kind: OperationKind) -> String {
        match kind {
            OperationKind::Add => "+add".green().to_string(),
            OperationKind::Replace => "~replace".yellow().to_string(),
            OperationKind::Remove => "-remove".red().to_string(),
        }
    }

    /// Formats a change kind with color.
    fn format_change_kind(kind: ChangeKind) -> String {
        match kind {
            ChangeKind::Added => "+added".green().to_string(),
            ChangeKind::Modified => "~modified".yellow().to_string(),
            ChangeKind::Removed => "-removed".red().to_string(),
        }
    }

    fn format_value(op: &Operation) -> String {
        match (&op.kind, &op.value) {
            (OperationKind::Remove, _) | (_, None) => String::new(),
            (_, Some(value)) => Self::truncate(&value.to_string(), 40),
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{head}...")
        }
    }
}

fn count(operations: &[Operation], kind: OperationKind) -> usize {
    operations.iter().filter(|op| op.kind == kind).count()
}
