//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sonic-reconcile - Declarative configuration of SONiC switch resources.
#[derive(Parser, Debug)]
#[command(name = "sonic-reconcile")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the resource registry file.
    #[arg(short, long, global = true, env = "SONIC_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// Path to the device connection file.
    #[arg(short, long, global = true, env = "SONIC_DEVICE_CONFIG")]
    pub device: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the resources declared in the registry.
    Resources,

    /// Validate the registry, and optionally a configuration tree.
    Validate {
        /// Resource the tree belongs to.
        #[arg(long, requires = "file")]
        resource: Option<String>,

        /// Configuration tree to check against the resource schema.
        #[arg(long, requires = "resource")]
        file: Option<PathBuf>,
    },

    /// Show the structural diff between a desired tree and the device.
    Diff {
        /// Resource name.
        resource: String,

        /// Desired configuration tree.
        #[arg(long)]
        want: PathBuf,

        /// Read current configuration from a facts file instead of the device.
        #[arg(long)]
        facts: Option<PathBuf>,
    },

    /// Compute the operations for a task file without touching the device.
    Plan {
        /// Task file.
        tasks: PathBuf,

        /// Read current configuration from a facts file instead of the device.
        #[arg(long)]
        facts: Option<PathBuf>,
    },

    /// Show the current configuration of a resource on the device.
    Facts {
        /// Resource name.
        resource: String,
    },

    /// Apply a task file to the device.
    Apply {
        /// Task file.
        tasks: PathBuf,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from(["sonic-reconcile", "--output", "json", "apply", "tasks.yaml", "-y"])
            .expect("parse");
        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Apply { yes: true, .. }));
    }

    #[test]
    fn test_validate_requires_both_tree_arguments() {
        let result = Cli::try_parse_from(["sonic-reconcile", "validate", "--resource", "vlans"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_diff_with_facts() {
        let cli = Cli::try_parse_from([
            "sonic-reconcile",
            "diff",
            "vlans",
            "--want",
            "want.yaml",
            "--facts",
            "facts.yaml",
        ])
        .expect("parse");
        match cli.command {
            Commands::Diff { resource, facts, .. } => {
                assert_eq!(resource, "vlans");
                assert_eq!(facts, Some(PathBuf::from("facts.yaml")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
