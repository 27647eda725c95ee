//! CLI module for the sonic-reconcile tool.
//!
//! This module provides the command-line interface for planning and
//! applying resource configuration on a SONiC switch.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
