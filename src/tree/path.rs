//! Paths locating a node inside a configuration tree.
//!
//! A path is a sequence of field names, keyed-list element identifiers and
//! positional indices. Positional indices only appear for list elements that
//! cannot be identified by key.

use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// Identifies an element of a keyed list by the values of its key fields.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementKey {
    fields: Vec<(String, Value)>,
}

impl ElementKey {
    /// Extracts the key of `element` for the given key fields.
    ///
    /// Returns `None` if the element is not a mapping or lacks any key field.
    #[must_use]
    pub fn extract(element: &Value, keys: &[String]) -> Option<Self> {
        let object = element.as_object()?;
        let mut fields = Vec::with_capacity(keys.len());
        for key in keys {
            match object.get(key) {
                None | Some(Value::Null) => return None,
                Some(value) => fields.push((key.clone(), value.clone())),
            }
        }
        Some(Self { fields })
    }

    /// Key field names and values, in key-spec order.
    #[must_use]
    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    /// Returns true if `element` carries exactly these key values.
    #[must_use]
    pub fn matches(&self, element: &Value) -> bool {
        element.as_object().is_some_and(|object| {
            self.fields
                .iter()
                .all(|(name, value)| object.get(name) == Some(value))
        })
    }

    /// Canonical string used as a hash-map key for lookups.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.fields
            .iter()
            .map(|(_, value)| value.to_string())
            .collect::<Vec<_>>()
            .join("\u{1f}")
    }

    /// Builds a mapping holding only the key fields.
    #[must_use]
    pub fn to_object(&self) -> Value {
        Value::Object(self.fields.iter().cloned().collect())
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            match value {
                Value::String(s) => write!(f, "{name}={s}")?,
                other => write!(f, "{name}={other}")?,
            }
        }
        Ok(())
    }
}

/// One step of a [`TreePath`].
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    /// A mapping field.
    Field(String),
    /// A keyed list element.
    Key(ElementKey),
    /// An unkeyed list element, by position.
    Index(usize),
}

impl PathSegment {
    /// Returns true for list-element segments.
    #[must_use]
    pub const fn is_element(&self) -> bool {
        matches!(self, Self::Key(_) | Self::Index(_))
    }
}

/// A location inside a configuration tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreePath {
    segments: Vec<PathSegment>,
}

impl TreePath {
    /// The root path.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Segments from the root.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last segment, if any.
    #[must_use]
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Returns a new path extended by a field.
    #[must_use]
    pub fn field(&self, name: &str) -> Self {
        self.with(PathSegment::Field(name.to_string()))
    }

    /// Returns a new path extended by a keyed element.
    #[must_use]
    pub fn key(&self, key: ElementKey) -> Self {
        self.with(PathSegment::Key(key))
    }

    /// Returns a new path extended by a positional element.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.with(PathSegment::Index(index))
    }

    fn with(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// Path without its last segment.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self {
            segments: rest.to_vec(),
        })
    }

    /// Returns true if `self` is a strict ancestor of `other`.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments.starts_with(&self.segments)
    }

    /// Returns true if the path descends below a list element, i.e. it points
    /// at a field of an element that exists on both sides of a diff.
    #[must_use]
    pub fn is_within_element(&self) -> bool {
        self.segments
            .iter()
            .position(PathSegment::is_element)
            .is_some_and(|pos| pos + 1 < self.segments.len())
    }

    /// Schema path: field names joined by `.`, list elements elided.
    #[must_use]
    pub fn schema_path(&self) -> String {
        self.segments
            .iter()
            .filter_map(|segment| match segment {
                PathSegment::Field(name) => Some(name.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, ".");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => write!(f, "{name}")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Key(key) => write!(f, "[{key}]")?,
                PathSegment::Index(index) => write!(f, "[#{index}]")?,
            }
        }
        Ok(())
    }
}

impl Serialize for TreePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Joins a schema path and a field name.
#[must_use]
pub fn join_schema_path(parent: &str, field: &str) -> String {
    if parent.is_empty() {
        field.to_string()
    } else {
        format!("{parent}.{field}")
    }
}
