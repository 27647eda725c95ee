//! Desired state modes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a want tree is reconciled against the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    /// Merge want into have; nothing is removed.
    #[default]
    Merged,
    /// Fully replace every element named in want.
    Replaced,
    /// Replace named elements and remove everything else.
    Overridden,
    /// Remove what want names, or everything if want is empty.
    Deleted,
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Merged => "merged",
            Self::Replaced => "replaced",
            Self::Overridden => "overridden",
            Self::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}
