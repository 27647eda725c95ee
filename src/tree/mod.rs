//! Canonical configuration trees.
//!
//! Both the device facts ("have") and the user intent ("want") are
//! represented as [`ConfigTree`] values of the same shape:
//! - paths addressing nodes inside a tree
//! - normalization stripping nulls and empty containers
//! - in-place edits used to predict the configuration after a run
//! - fingerprints for snapshot comparison

mod path;
mod normalize;
mod edit;
mod fingerprint;

pub use path::{ElementKey, PathSegment, TreePath, join_schema_path};
pub use normalize::{is_empty_tree, normalize};
pub use edit::{deep_merge, get_at, get_at_mut, remove_at, set_at};
pub use fingerprint::TreeHasher;

/// A configuration tree: scalar, ordered sequence or mapping.
pub type ConfigTree = serde_json::Value;
