//! Structural differ.
//!
//! This module compares two configuration trees of the same schema and
//! reports the minimal set of additions, removals and modifications.

mod change;
mod engine;

pub use change::{Change, ChangeKind, DiffResult};
pub use engine::DiffEngine;
