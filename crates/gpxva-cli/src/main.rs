//! gpxva CLI - GP surrogate CVA for swap netting sets.
//!
//! # Usage
//!
//! ```bash
//! # Write the demo configuration
//! gpxva config init --output run.toml
//!
//! # Simulate scenario paths
//! gpxva simulate --config run.toml --output paths.csv
//!
//! # Run analytical and surrogate CVA on those paths
//! gpxva run --config run.toml --scenarios paths.csv --output report.json
//!
//! # Price the netting set at t = 0
//! gpxva price --config run.toml
//! ```

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod error;
mod output;

use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| cli.log_filter().into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let format = cli.format;

    match cli.command {
        Commands::Run(args) => commands::run::execute(args, format)?,
        Commands::Simulate(args) => commands::simulate::execute(args, format)?,
        Commands::Price(args) => commands::price::execute(args, format)?,
        Commands::Config(args) => commands::config::execute(args, format)?,
    }

    Ok(())
}
