//! Command-line arguments.

use clap::{Parser, Subcommand};
use settle::{LoopConfig, Result};
use std::path::PathBuf;

/// Settle - run deferred-value scenarios on a virtual-time event loop
#[derive(Parser, Debug)]
#[command(name = "settle")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Loop configuration file (TOML)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the per-run task budget
    #[arg(long, env = "SETTLE_MAX_TASKS")]
    pub max_tasks: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands.
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// List available scenarios
    List,

    /// Run a scenario and print its report
    Run {
        /// Scenario name (see `settle list`)
        name: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Args {
    /// Resolves the loop configuration: file (or defaults), then overrides.
    pub fn loop_config(&self) -> Result<LoopConfig> {
        let mut config = match &self.config {
            Some(path) => LoopConfig::load(path)?,
            None => LoopConfig::default(),
        };
        if let Some(max_tasks) = self.max_tasks {
            config = config.with_max_tasks(max_tasks);
        }
        config.validate()?;
        Ok(config)
    }

    /// Default tracing filter when `RUST_LOG` is unset.
    pub fn default_filter(&self) -> &'static str {
        if self.verbose {
            "info,settle=debug"
        } else {
            "warn"
        }
    }
}
