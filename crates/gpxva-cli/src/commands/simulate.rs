//! Simulate command implementation.
//!
//! Writes scenario paths to CSV so later runs can reuse them.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use gpxva_exposure::pipeline::simulate;

use crate::cli::OutputFormat;
use crate::commands::{check_overwrite, load_config};
use crate::output::{print_header, print_output, print_success, KeyValue};

/// Arguments for the simulate command.
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Run configuration (TOML). Defaults to the built-in demo.
    #[arg(short, long, env = "GPXVA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Scenario CSV to write
    #[arg(short, long)]
    pub output: PathBuf,

    /// Override the number of paths
    #[arg(long)]
    pub paths: Option<usize>,

    /// Override the simulation seed
    #[arg(long)]
    pub seed: Option<u64>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,
}

/// Execute the simulate command.
pub fn execute(args: SimulateArgs, format: OutputFormat) -> Result<()> {
    check_overwrite(&args.output, args.force)?;
    let mut config = load_config(args.config.as_deref())?;
    if let Some(paths) = args.paths {
        config.simulation.paths = paths;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = seed;
    }

    let scenarios = simulate(&config)?;
    scenarios.write_csv(&args.output)?;

    let results = vec![
        KeyValue::new("Paths", scenarios.n_paths().to_string()),
        KeyValue::new("Dates", scenarios.n_steps().to_string()),
        KeyValue::new("Factors", scenarios.factor_names().join(" ")),
        KeyValue::new("Horizon", format!("{}y", scenarios.grid().horizon())),
        KeyValue::new("File", args.output.display().to_string()),
    ];

    match format {
        OutputFormat::Table => {
            print_header("Scenario Simulation");
            print_output(&results, format)?;
            print_success(&format!("Wrote {}", args.output.display()));
        }
        OutputFormat::Minimal => println!("{}", args.output.display()),
        _ => print_output(&results, format)?,
    }
    Ok(())
}
