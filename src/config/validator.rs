//! Validation of the resource registry file.
//!
//! Descriptors are static data, so mistakes in them (a key field the element
//! does not declare, a default outside its choices) are rejected at load
//! time rather than surfacing as wrong diffs.

use crate::error::{ConfigError, Result};
use std::collections::HashSet;
use tracing::debug;

use super::spec::RegistryFile;
use crate::schema::{FieldSchema, ResourceDescriptor, ScalarSchema};
use crate::tree::join_schema_path;

/// Validator for registry files.
#[derive(Debug, Default)]
pub struct RegistryValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl RegistryValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a registry file.
    ///
    /// # Errors
    ///
    /// Returns the first error found.
    pub fn validate(&self, file: &RegistryFile) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();
        let mut seen = HashSet::new();

        for resource in &file.resources {
            if !seen.insert(resource.name.as_str()) {
                result.errors.push(ValidationError {
                    field: resource.name.clone(),
                    message: format!("Resource '{}' is declared more than once", resource.name),
                });
            }
            Self::validate_resource(resource, &mut result);
        }

        if result.errors.is_empty() {
            debug!(
                "Registry validation passed for {} resource(s)",
                file.resources.len()
            );
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(ConfigError::validation(first_error.message.clone(), first_error.field.clone()).into())
        }
    }

    fn validate_resource(resource: &ResourceDescriptor, result: &mut ValidationResult) {
        if !is_valid_name(&resource.name) {
            result.errors.push(ValidationError {
                field: String::from("resources.name"),
                message: format!(
                    "Resource name '{}' is invalid. Must be lowercase alphanumeric with underscores or hyphens.",
                    resource.name
                ),
            });
        }

        match &resource.rest {
            Some(rest) if !rest.path.starts_with('/') => {
                result.errors.push(ValidationError {
                    field: format!("{}.rest.path", resource.name),
                    message: format!("REST path '{}' must start with '/'", rest.path),
                });
            }
            Some(_) => {}
            None => result.warnings.push(format!(
                "Resource '{}' has no REST binding and can only be planned offline",
                resource.name
            )),
        }

        Self::validate_node(&resource.name, &resource.schema, "", result);
    }

    fn validate_node(resource: &str, node: &FieldSchema, path: &str, result: &mut ValidationResult) {
        let field = if path.is_empty() {
            resource.to_string()
        } else {
            format!("{resource}.{path}")
        };

        match node {
            FieldSchema::Scalar(scalar) => Self::validate_scalar(&field, scalar, result),
            FieldSchema::Dict(dict) => {
                for (name, child) in &dict.fields {
                    Self::validate_node(resource, child, &join_schema_path(path, name), result);
                }
            }
            FieldSchema::List(list) => {
                match (&*list.element, list.key.is_empty()) {
                    (FieldSchema::Dict(_), true) => result.warnings.push(format!(
                        "List '{field}' has no key and is compared as a whole"
                    )),
                    (FieldSchema::Dict(element), false) => {
                        for key in &list.key {
                            if !matches!(element.fields.get(key), Some(FieldSchema::Scalar(_))) {
                                result.errors.push(ValidationError {
                                    field: field.clone(),
                                    message: format!(
                                        "Key field '{key}' of '{field}' is not a declared scalar field"
                                    ),
                                });
                            }
                        }
                    }
                    (_, false) => result.errors.push(ValidationError {
                        field: field.clone(),
                        message: format!("List '{field}' declares a key but its elements are not dicts"),
                    }),
                    (_, true) => {}
                }
                Self::validate_node(resource, &list.element, path, result);
            }
        }
    }

    fn validate_scalar(field: &str, scalar: &ScalarSchema, result: &mut ValidationResult) {
        for choice in &scalar.choices {
            if !scalar.kind.accepts(choice) {
                result.errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("Choice {choice} of '{field}' is not a {}", scalar.kind),
                });
            }
        }

        if let Some(default) = &scalar.default {
            if !scalar.kind.accepts(default) {
                result.errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("Default {default} of '{field}' is not a {}", scalar.kind),
                });
            } else if !scalar.choices.is_empty() && !scalar.choices.contains(default) {
                result.errors.push(ValidationError {
                    field: field.to_string(),
                    message: format!("Default {default} of '{field}' is not one of its choices"),
                });
            }
        }
    }
}

/// Checks if a resource name is valid.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        && !name.starts_with(['-', '_'])
}
