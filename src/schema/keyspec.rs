//! Key specifications for keyed lists.

use std::collections::BTreeMap;

/// Maps the schema path of each keyed list to its ordered key fields.
///
/// Schema paths join field names with `.` and elide list elements; a list at
/// the root of a resource has the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeySpecTable {
    specs: BTreeMap<String, Vec<String>>,
}

impl KeySpecTable {
    /// Creates an empty table.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            specs: BTreeMap::new(),
        }
    }

    /// Adds a key specification, builder style.
    #[must_use]
    pub fn with(mut self, path: &str, keys: &[&str]) -> Self {
        self.insert(path, keys.iter().map(|k| (*k).to_string()).collect());
        self
    }

    /// Adds or replaces the key specification of a list.
    pub fn insert(&mut self, path: &str, keys: Vec<String>) {
        self.specs.insert(path.to_string(), keys);
    }

    /// Key fields of the list at `path`, if it is keyed.
    #[must_use]
    pub fn keys_for(&self, path: &str) -> Option<&[String]> {
        self.specs
            .get(path)
            .map(Vec::as_slice)
            .filter(|keys| !keys.is_empty())
    }

    /// Number of keyed lists.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if no list is keyed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Iterates over `(path, keys)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.specs.iter().map(|(p, k)| (p.as_str(), k.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let table = KeySpecTable::new()
            .with("", &["name"])
            .with("afis", &["afi", "safi"])
            .with("unkeyed", &[]);
        assert_eq!(table.keys_for(""), Some(&[String::from("name")][..]));
        assert_eq!(table.keys_for("afis").map(<[String]>::len), Some(2));
        assert!(table.keys_for("unkeyed").is_none());
        assert!(table.keys_for("missing").is_none());
        assert_eq!(table.len(), 3);
    }
}
