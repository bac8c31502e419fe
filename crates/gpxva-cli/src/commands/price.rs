//! Price command implementation.
//!
//! Values every swap of the netting set at the valuation date.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use gpxva_exposure::config::Validate;
use serde::Serialize;
use tabled::Tabled;

use crate::cli::OutputFormat;
use crate::commands::load_config;
use crate::output::{format_amount, format_rate, print_header, print_output};

/// Arguments for the price command.
#[derive(Args, Debug)]
pub struct PriceArgs {
    /// Run configuration (TOML). Defaults to the built-in demo.
    #[arg(short, long, env = "GPXVA_CONFIG")]
    pub config: Option<PathBuf>,
}

/// One swap at t = 0.
#[derive(Debug, Serialize, Tabled)]
pub struct SwapRow {
    #[tabled(rename = "Swap")]
    pub id: String,
    #[tabled(rename = "Ccy")]
    pub currency: String,
    #[tabled(rename = "Side")]
    pub direction: String,
    #[tabled(rename = "Notional", display_with = "format_amount")]
    pub notional: f64,
    #[tabled(rename = "Maturity")]
    pub maturity: f64,
    #[tabled(rename = "Fixed", display_with = "format_rate")]
    pub fixed_rate: f64,
    #[tabled(rename = "Par", display_with = "format_rate")]
    pub par_rate: f64,
    #[tabled(rename = "MtM (local)", display_with = "format_amount")]
    pub mtm_local: f64,
    #[tabled(rename = "MtM (domestic)", display_with = "format_amount")]
    pub mtm_domestic: f64,
}

/// Execute the price command.
pub fn execute(args: PriceArgs, format: OutputFormat) -> Result<()> {
    let config = load_config(args.config.as_deref())?;
    config.validate_or_error()?;
    let market = config.build_market()?;
    config.portfolio.validate(&market)?;
    let state = market.initial_state();

    let mut rows = Vec::with_capacity(config.portfolio.len());
    for swap in &config.portfolio.swaps {
        let hw = &market.rate_factor(swap.currency())?.hull_white;
        rows.push(SwapRow {
            id: swap.id().to_string(),
            currency: swap.currency().to_string(),
            direction: swap.direction().to_string(),
            notional: swap.notional(),
            maturity: swap.maturity(),
            fixed_rate: swap.fixed_rate(),
            par_rate: swap.par_rate(hw),
            mtm_local: swap.mtm(0.0, hw.short_rate(0.0, 0.0), hw),
            mtm_domestic: market.value_in_domestic(swap, 0.0, &state)?,
        });
    }
    let total: f64 = rows.iter().map(|r| r.mtm_domestic).sum();

    match format {
        OutputFormat::Table => {
            print_header(&format!(
                "{} netting set at t = 0 ({})",
                config.portfolio.counterparty,
                market.domestic()
            ));
            print_output(&rows, format)?;
            println!("Net MtM: {} {}", format_amount(&total), market.domestic());
        }
        OutputFormat::Minimal => println!("{total:.2}"),
        _ => print_output(&rows, format)?,
    }
    Ok(())
}
