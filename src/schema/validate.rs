//! Validation of configuration trees against a resource schema.
//!
//! Validation runs before any diffing. A tree whose shape does not match its
//! schema is rejected; values are never coerced.

use serde_json::Value;
use tracing::debug;

use super::descriptor::{FieldSchema, ResourceDescriptor};
use crate::error::{Result, SchemaError};
use crate::tree::{ElementKey, TreePath};

/// Validator for configuration trees.
#[derive(Debug)]
pub struct SchemaValidator<'a> {
    /// Resource being validated.
    resource: &'a ResourceDescriptor,
}

impl<'a> SchemaValidator<'a> {
    /// Creates a validator for a resource.
    #[must_use]
    pub const fn new(resource: &'a ResourceDescriptor) -> Self {
        Self { resource }
    }

    /// Validates a tree, failing on the first violation.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] describing the first violation found.
    pub fn validate(&self, tree: &Value) -> Result<()> {
        let mut violations = self.violations(tree);
        if violations.is_empty() {
            debug!("Tree for {} matches its schema", self.resource.name);
            return Ok(());
        }
        debug!(
            "Tree for {} has {} schema violation(s)",
            self.resource.name,
            violations.len()
        );
        Err(violations.swap_remove(0).into())
    }

    /// Collects every violation in the tree.
    #[must_use]
    pub fn violations(&self, tree: &Value) -> Vec<SchemaError> {
        let mut violations = Vec::new();
        Self::check(&self.resource.schema, tree, &TreePath::root(), &mut violations);
        violations
    }

    fn check(schema: &FieldSchema, value: &Value, path: &TreePath, out: &mut Vec<SchemaError>) {
        // Null is "absent" and matches any schema node.
        if value.is_null() {
            return;
        }

        match (schema, value) {
            (FieldSchema::Scalar(scalar), value) => {
                if !scalar.kind.accepts(value) {
                    out.push(mismatch(path, &scalar.kind.to_string(), value));
                } else if !scalar.choices.is_empty() && !scalar.choices.contains(value) {
                    out.push(SchemaError::InvalidChoice {
                        path: path.to_string(),
                        value: value.to_string(),
                        choices: scalar
                            .choices
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }
            }
            (FieldSchema::Dict(dict), Value::Object(object)) => {
                for (name, child) in object {
                    match dict.fields.get(name) {
                        Some(field) => Self::check(field, child, &path.field(name), out),
                        None => out.push(SchemaError::UnknownField {
                            path: path.to_string(),
                            field: name.clone(),
                        }),
                    }
                }
            }
            (FieldSchema::List(list), Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    let item_path = ElementKey::extract(item, &list.key)
                        .filter(|_| !list.key.is_empty())
                        .map_or_else(|| path.index(index), |key| path.key(key));
                    Self::check(&list.element, item, &item_path, out);
                }
            }
            (schema, value) => out.push(mismatch(path, schema.shape(), value)),
        }
    }
}

fn mismatch(path: &TreePath, expected: &str, value: &Value) -> SchemaError {
    SchemaError::TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        found: shape_of(value).to_string(),
    }
}

const fn shape_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resource() -> ResourceDescriptor {
        serde_yaml::from_str(
            r"
name: vlans
schema:
  type: list
  key: [vlan_id]
  element:
    type: dict
    fields:
      vlan_id: { type: scalar, kind: int }
      name: { type: scalar, kind: string }
      autostate: { type: scalar, kind: string, choices: [enable, disable] }
      members:
        type: list
        element: { type: scalar, kind: string }
",
        )
        .expect("descriptor should parse")
    }

    #[test]
    fn test_valid_tree() {
        let resource = resource();
        let validator = SchemaValidator::new(&resource);
        let tree = json!([{ "vlan_id": 10, "name": "ten", "autostate": "enable", "members": ["Ethernet0"] }]);
        assert!(validator.validate(&tree).is_ok());
        assert!(validator.validate(&Value::Null).is_ok());
    }

    #[test]
    fn test_scalar_where_list_expected() {
        let resource = resource();
        let validator = SchemaValidator::new(&resource);
        let err = validator
            .validate(&json!([{ "vlan_id": 10, "members": "Ethernet0" }]))
            .expect_err("should fail");
        assert_eq!(err.to_string(), "Schema error: [vlan_id=10].members: expected list, found string");
    }

    #[test]
    fn test_no_coercion() {
        let resource = resource();
        let validator = SchemaValidator::new(&resource);
        let violations = validator.violations(&json!([{ "vlan_id": "10" }]));
        assert_eq!(violations.len(), 1);
        assert!(matches!(violations[0], SchemaError::TypeMismatch { .. }));
    }

    #[test]
    fn test_unknown_field_and_choice() {
        let resource = resource();
        let validator = SchemaValidator::new(&resource);
        let violations =
            validator.violations(&json!([{ "vlan_id": 10, "bogus": 1, "autostate": "maybe" }]));
        assert_eq!(violations.len(), 2);
        assert!(violations.iter().any(|v| matches!(v, SchemaError::UnknownField { field, .. } if field == "bogus")));
        assert!(violations.iter().any(|v| matches!(v, SchemaError::InvalidChoice { .. })));
    }
}
