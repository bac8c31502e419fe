//! Run command implementation.
//!
//! Prices the netting set analytically and through GP surrogates on the
//! same scenarios, then compares EPE profiles and CVA.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use gpxva_exposure::pipeline::{run, CvaReport};
use gpxva_models::scenario::ScenarioSet;
use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use crate::cli::OutputFormat;
use crate::commands::{check_overwrite, load_config};
use crate::output::{
    format_amount, print_header, print_output, print_success, print_warning, KeyValue,
};

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Run configuration (TOML). Defaults to the built-in demo.
    #[arg(short, long, env = "GPXVA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Scenario CSV from `gpxva simulate`; simulated when omitted
    #[arg(short, long)]
    pub scenarios: Option<PathBuf>,

    /// Write the full report as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Override the number of paths
    #[arg(long)]
    pub paths: Option<usize>,

    /// Override the GP training points per instrument and date
    #[arg(long)]
    pub training_points: Option<usize>,

    /// Train and price on a single thread
    #[arg(long)]
    pub sequential: bool,

    /// Overwrite an existing report file
    #[arg(long)]
    pub force: bool,
}

/// EPE of both pricers at one date.
#[derive(Debug, Serialize, Tabled)]
pub struct EpeRow {
    #[tabled(rename = "t")]
    pub time: f64,
    #[tabled(rename = "EPE analytical", display_with = "format_amount")]
    pub analytical: f64,
    #[tabled(rename = "EPE surrogate", display_with = "format_amount")]
    pub surrogate: f64,
    #[tabled(rename = "Diff", display_with = "format_amount")]
    pub diff: f64,
    #[tabled(rename = "Std (MC+GP)", display_with = "format_amount")]
    pub total_std: f64,
    #[tabled(rename = "In band")]
    pub within_band: bool,
    #[tabled(rename = "Std (GP)", display_with = "format_amount")]
    pub gp_std: f64,
    #[tabled(rename = "In GP band")]
    pub within_gp_band: bool,
}

fn epe_rows(report: &CvaReport) -> Vec<EpeRow> {
    let c = &report.comparison;
    let a = &report.analytical.profile;
    let s = &report.surrogate.profile;
    (0..c.times.len())
        .map(|k| EpeRow {
            time: c.times[k],
            analytical: a.epe[k],
            surrogate: s.epe[k],
            diff: c.epe_diff[k],
            total_std: s.total_std[k],
            within_band: c.within_band[k],
            gp_std: s.gp_std[k],
            within_gp_band: c.within_gp_band[k],
        })
        .collect()
}

fn summary(report: &CvaReport) -> Vec<KeyValue> {
    let a = &report.analytical;
    let s = &report.surrogate;
    let c = &report.comparison;
    let band = |lower: f64, upper: f64| {
        format!("[{}, {}]", format_amount(&lower), format_amount(&upper))
    };
    vec![
        KeyValue::new("Counterparty", report.counterparty.clone()),
        KeyValue::new("Currency", report.domestic.clone()),
        KeyValue::new(
            "Paths x dates x swaps",
            format!("{} x {} x {}", report.n_paths, report.n_steps, report.n_instruments),
        ),
        KeyValue::new("GP surrogates", report.n_gps.to_string()),
        KeyValue::new("CVA analytical", format_amount(&a.cva.value)),
        KeyValue::new(
            format!("  {:.0}% band", 100.0 * a.cva.confidence),
            band(a.cva.lower, a.cva.upper),
        ),
        KeyValue::new("CVA surrogate", format_amount(&s.cva.value)),
        KeyValue::new(
            format!("  {:.0}% band", 100.0 * s.cva.confidence),
            band(s.cva.lower, s.cva.upper),
        ),
        KeyValue::new(
            "CVA difference",
            format!("{} ({:.2}%)", format_amount(&c.cva_diff), 100.0 * c.cva_rel_error),
        ),
        KeyValue::new("EPE band coverage", format!("{:.0}%", 100.0 * c.band_coverage)),
        KeyValue::new("  GP-only band", format!("{:.0}%", 100.0 * c.gp_band_coverage)),
        KeyValue::new("Max |EPE diff|", format_amount(&c.max_abs_epe_error)),
        KeyValue::new("Clipped inputs", format!("{:.2}%", 100.0 * c.clipping_ratio)),
        KeyValue::new("Analytical pricing", format!("{:.3}s", c.analytical_seconds)),
        KeyValue::new("Surrogate training", format!("{:.3}s", c.training_seconds)),
        KeyValue::new("Surrogate pricing", format!("{:.3}s", c.surrogate_seconds)),
    ]
}

/// Execute the run command.
pub fn execute(args: RunArgs, format: OutputFormat) -> Result<()> {
    if let Some(path) = &args.output {
        check_overwrite(path, args.force)?;
    }
    let mut config = load_config(args.config.as_deref())?;
    if let Some(paths) = args.paths {
        config.simulation.paths = paths;
    }
    if let Some(points) = args.training_points {
        config.surrogate.training_points = points;
    }
    if args.sequential {
        config.surrogate.parallel = false;
    }

    let scenarios = match &args.scenarios {
        Some(path) => {
            info!("Reading scenarios from {}", path.display());
            Some(ScenarioSet::read_csv(path)?)
        }
        None => None,
    };
    let report = run(&config, scenarios)?;

    if let Some(path) = &args.output {
        std::fs::write(path, report.to_json()?)?;
    }

    match format {
        OutputFormat::Table => {
            print_header("CVA: analytical vs GP surrogate");
            print_output(&summary(&report), format)?;
            print_header("Expected positive exposure");
            print_output(&epe_rows(&report), format)?;
            if !report.comparison.cva_within_band {
                print_warning("Analytical CVA lies outside the surrogate CVA band");
            }
            if let Some(path) = &args.output {
                print_success(&format!("Report written to {}", path.display()));
            }
        }
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Csv => print_output(&epe_rows(&report), format)?,
        OutputFormat::Minimal => {
            println!(
                "{:.6} {:.6}",
                report.analytical.cva.value, report.surrogate.cva.value
            );
        }
    }
    Ok(())
}
