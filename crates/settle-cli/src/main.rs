//! Settle CLI
//!
//! Runs deferred-value scenarios on a virtual-time event loop.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use settle_cli::cli::{Args, Command};
use settle_cli::{SCENARIOS, run_scenario};

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.default_filter().into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = args
        .loop_config()
        .context("failed to resolve loop configuration")?;
    tracing::debug!(
        max_tasks = config.max_tasks_per_run,
        policy = ?config.unhandled_rejections,
        "Loop configuration"
    );

    match args.command {
        Command::List => {
            for scenario in SCENARIOS {
                println!("{:<10} {}", scenario.name, scenario.description);
            }
        }
        Command::Run { name, json } => {
            let report = run_scenario(&name, config)
                .with_context(|| format!("scenario '{name}' failed"))?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                println!("{report}");
            }
        }
    }

    Ok(())
}
