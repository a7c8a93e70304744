//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Top-level CLI parser for `tracksync`.
#[derive(Debug, Parser)]
#[command(name = "tracksync", version, about = "Keep issues consistent across two trackers")]
pub struct Cli {
    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the synchronization over all configured project pairs.
    Sync {
        /// Path to the YAML configuration file.
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
        /// Restrict the run to the pair with this source project key.
        #[arg(long, value_name = "KEY")]
        project: Option<String>,
    },
    /// Load and validate the configuration without contacting any tracker.
    CheckConfig {
        /// Path to the YAML configuration file.
        #[arg(long, value_name = "FILE")]
        config: PathBuf,
    },
}
