//! Command-line interface over repository snapshots.
//!
//! Every command reads a JSON [`RepositorySnapshot`](crate::repository::RepositorySnapshot),
//! runs the engine with the stock function implementations and, for commands
//! that change the repository, writes the snapshot back (or to `--output`).
//!
//! # Commands
//!
//! - `validate` - recompute every derived node
//! - `save` - recompute derived data for nodes marked as changed
//! - `remove` - delete a node and clean the `hippo:related` indices
//! - `graph` - inspect the recorded dependencies
//! - `functions` - list configured derivation functions
//!
//! # Global options
//!
//! - `--verbose` / `--quiet` select the log level (`RUST_LOG` otherwise)
//! - `--config <FILE>` (or `DERIVED_DATA_CONFIG`) names the engine
//!   configuration, defaulting to `derived-data.toml` in the working directory

pub mod common;
mod functions;
mod graph;
mod remove;
mod save;
mod validate;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use crate::config::EngineConfig;

/// Settings derived from the global flags.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Log filter directive; `None` defers to `RUST_LOG`, then `info`
    pub log_level: Option<String>,

    /// Engine configuration file
    pub config_path: Option<PathBuf>,
}

impl CliConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the global tracing subscriber, logging to stderr.
    ///
    /// Later calls are no-ops.
    pub fn init_logging(&self) {
        let filter = match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        };
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }
}

#[derive(Parser)]
#[command(
    name = "derived-data",
    about = "Compute derived properties over content repository snapshots",
    version,
    long_about = "Keeps derived properties of documents in sync with the properties they are computed from, \
                  tracking reverse dependencies in hippo:related and resolving reads across branches."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Engine configuration file
    #[arg(short, long, global = true, env = "DERIVED_DATA_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute every derived node in a snapshot
    Validate(validate::ValidateCommand),

    /// Recompute derived data for changed nodes
    Save(save::SaveCommand),

    /// Remove a node and drop it from all dependency indices
    Remove(remove::RemoveCommand),

    /// Show recorded derivation dependencies
    Graph(graph::GraphCommand),

    /// List configured derivation functions
    Functions(functions::FunctionsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = self.build_config();
        self.execute_with_config(config).await
    }

    #[must_use]
    pub fn build_config(&self) -> CliConfig {
        let log_level = if self.verbose {
            Some("debug".to_string())
        } else if self.quiet {
            Some("error".to_string())
        } else {
            None
        };

        CliConfig {
            log_level,
            config_path: self.config.clone(),
        }
    }

    pub async fn execute_with_config(self, config: CliConfig) -> Result<()> {
        config.init_logging();
        let engine_config = EngineConfig::load_with_optional(config.config_path).await?;

        match self.command {
            Commands::Validate(cmd) => cmd.execute(&engine_config).await,
            Commands::Save(cmd) => cmd.execute(&engine_config).await,
            Commands::Remove(cmd) => cmd.execute(&engine_config).await,
            Commands::Graph(cmd) => cmd.execute().await,
            Commands::Functions(cmd) => cmd.execute(&engine_config).await,
        }
    }
}
