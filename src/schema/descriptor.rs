//! Resource descriptors: the declared schema of each resource.
//!
//! A descriptor is static data. It names the resource, declares the shape of
//! its configuration tree and, optionally, where the resource lives on the
//! device REST interface.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::keyspec::KeySpecTable;
use crate::tree::join_schema_path;

/// Declared shape of one node of a configuration tree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldSchema {
    /// A leaf value.
    Scalar(ScalarSchema),
    /// A mapping with named fields.
    Dict(DictSchema),
    /// An ordered sequence, optionally keyed.
    List(ListSchema),
}

/// Schema of a leaf value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScalarSchema {
    /// Allowed value type.
    #[serde(default)]
    pub kind: ScalarKind,
    /// Allowed values; empty means unrestricted.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Value>,
    /// Value the device reports when the field is not configured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

/// Schema of a mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DictSchema {
    /// Declared fields.
    #[serde(default)]
    pub fields: BTreeMap<String, FieldSchema>,
}

/// Schema of a sequence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListSchema {
    /// Schema of every element.
    pub element: Box<FieldSchema>,
    /// Ordered key fields; empty for whole-list comparison.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key: Vec<String>,
}

/// Scalar value types.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScalarKind {
    /// Any scalar.
    #[default]
    Any,
    /// UTF-8 string.
    String,
    /// Integer.
    Int,
    /// Boolean.
    Bool,
    /// Integer or floating point number.
    Float,
}

/// Where a resource lives on the device REST interface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RestBinding {
    /// Resource URL path, relative to the device base URL.
    pub path: String,
    /// List node name used when the resource root is a keyed list.
    #[serde(default)]
    pub list_name: Option<String>,
}

/// A resource: name, schema and REST binding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResourceDescriptor {
    /// Unique resource name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Schema of the resource's configuration tree.
    pub schema: FieldSchema,
    /// REST binding; resources without one can only be planned offline.
    #[serde(default)]
    pub rest: Option<RestBinding>,
}

impl ScalarKind {
    /// Returns true if `value` has this kind.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => !value.is_object() && !value.is_array(),
            Self::String => value.is_string(),
            Self::Int => value.is_i64() || value.is_u64(),
            Self::Bool => value.is_boolean(),
            Self::Float => value.is_number(),
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Any => "scalar",
            Self::String => "string",
            Self::Int => "int",
            Self::Bool => "bool",
            Self::Float => "float",
        };
        write!(f, "{s}")
    }
}

impl FieldSchema {
    /// Short shape name for messages.
    #[must_use]
    pub const fn shape(&self) -> &'static str {
        match self {
            Self::Scalar(_) => "scalar",
            Self::Dict(_) => "dict",
            Self::List(_) => "list",
        }
    }

    /// Collects the key specification of every keyed list under this node.
    #[must_use]
    pub fn key_specs(&self) -> KeySpecTable {
        let mut table = KeySpecTable::new();
        self.collect_keys("", &mut table);
        table
    }

    fn collect_keys(&self, path: &str, table: &mut KeySpecTable) {
        match self {
            Self::Scalar(_) => {}
            Self::Dict(dict) => {
                for (name, field) in &dict.fields {
                    field.collect_keys(&join_schema_path(path, name), table);
                }
            }
            Self::List(list) => {
                if !list.key.is_empty() {
                    table.insert(path, list.key.clone());
                }
                list.element.collect_keys(path, table);
            }
        }
    }

    /// Resolves a schema path to its node. List elements are transparent.
    #[must_use]
    pub fn node_at(&self, path: &str) -> Option<&Self> {
        let mut node = self.unwrap_lists();
        if path.is_empty() {
            return Some(node);
        }
        for segment in path.split('.') {
            match node {
                Self::Dict(dict) => node = dict.fields.get(segment)?.unwrap_lists(),
                _ => return None,
            }
        }
        Some(node)
    }

    fn unwrap_lists(&self) -> &Self {
        let mut node = self;
        while let Self::List(list) = node {
            node = &list.element;
        }
        node
    }

    /// Declared default of the scalar at `path`, if any.
    #[must_use]
    pub fn default_at(&self, path: &str) -> Option<&Value> {
        match self.node_at(path)? {
            Self::Scalar(scalar) => scalar.default.as_ref(),
            _ => None,
        }
    }
}

impl ResourceDescriptor {
    /// Key specifications derived from the schema.
    #[must_use]
    pub fn key_specs(&self) -> KeySpecTable {
        self.schema.key_specs()
    }

    /// Returns true if `value` at the given schema path equals the declared
    /// default, meaning the device reports it without it being configured.
    #[must_use]
    pub fn is_default(&self, schema_path: &str, value: &Value) -> bool {
        self.schema.default_at(schema_path) == Some(value)
    }
}
