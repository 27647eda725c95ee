//! Fingerprints of configuration trees for change detection.
//!
//! A fingerprint identifies a facts snapshot. The runner compares the
//! fingerprint of the facts a plan was computed against with a fresh read
//! taken just before writing, so a concurrent change on the device aborts the
//! run instead of applying a stale plan.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Hasher for configuration trees.
#[derive(Debug, Default)]
pub struct TreeHasher;

impl TreeHasher {
    /// Creates a new tree hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes the SHA-256 fingerprint of a tree.
    ///
    /// Mapping fields are hashed in sorted order, so two trees that are deeply
    /// equal always share a fingerprint.
    #[must_use]
    pub fn fingerprint(&self, tree: &Value) -> String {
        let mut hasher = Sha256::new();
        Self::feed(&mut hasher, tree);
        hex::encode(hasher.finalize())
    }

    fn feed(hasher: &mut Sha256, value: &Value) {
        match value {
            Value::Null => hasher.update([0u8]),
            Value::Bool(b) => hasher.update([1u8, u8::from(*b)]),
            Value::Number(n) => {
                hasher.update([2u8]);
                hasher.update(n.to_string().as_bytes());
            }
            Value::String(s) => {
                hasher.update([3u8]);
                hasher.update((s.len() as u64).to_be_bytes());
                hasher.update(s.as_bytes());
            }
            Value::Array(items) => {
                hasher.update([4u8]);
                hasher.update((items.len() as u64).to_be_bytes());
                for item in items {
                    Self::feed(hasher, item);
                }
            }
            Value::Object(object) => {
                hasher.update([5u8]);
                hasher.update((object.len() as u64).to_be_bytes());
                let mut fields: Vec<_> = object.iter().collect();
                fields.sort_by(|a, b| a.0.cmp(b.0));
                for (name, child) in fields {
                    hasher.update((name.len() as u64).to_be_bytes());
                    hasher.update(name.as_bytes());
                    Self::feed(hasher, child);
                }
            }
        }
    }

    /// Computes a short fingerprint (first 8 characters) for display purposes.
    #[must_use]
    pub fn short(&self, fingerprint: &str) -> String {
        fingerprint.chars().take(8).collect()
    }

    /// Compares two fingerprints.
    #[must_use]
    pub fn fingerprints_match(a: &str, b: &str) -> bool {
        a.len() == b.len() && a.bytes().zip(b.bytes()).all(|(x, y)| x == y)
    }
}
