//! End-to-end CVA run: scenarios, both pricers, profiles, CVA, comparison.

use gpxva_math::statistics::normal_quantile;
use gpxva_models::scenario::{ScenarioGenerator, ScenarioSet};
use log::info;
use serde::{Deserialize, Serialize};

use crate::comparison::{Comparison, RunResult};
use crate::config::{RunConfig, Validate};
use crate::cva::CvaCalculator;
use crate::error::ExposureResult;
use crate::pricer::{AnalyticalPricer, PriceCube, Pricer, SurrogatePricer};
use crate::profile::{ExposureProfile, ProfileConfig};
use crate::surrogate::{SurrogateDiagnostics, SurrogateSet};

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvaReport {
    /// Counterparty of the netting set.
    pub counterparty: String,
    /// Reporting currency.
    pub domestic: String,
    /// Monte Carlo paths.
    pub n_paths: usize,
    /// Exposure dates, `t = 0` included.
    pub n_steps: usize,
    /// Swaps in the netting set.
    pub n_instruments: usize,
    /// Trained GPs (the rest are constants).
    pub n_gps: usize,
    /// Closed-form run.
    pub analytical: RunResult,
    /// Surrogate run.
    pub surrogate: RunResult,
    /// Surrogate against analytical.
    pub comparison: Comparison,
    /// One entry per (instrument, date).
    pub diagnostics: Vec<SurrogateDiagnostics>,
}

impl CvaReport {
    /// Pretty JSON.
    pub fn to_json(&self) -> ExposureResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Simulates the configured scenario set.
pub fn simulate(config: &RunConfig) -> ExposureResult<ScenarioSet> {
    config.validate_or_error()?;
    let market = config.build_market()?;
    let grid = config.time_grid()?;
    let scenarios = ScenarioGenerator::new(&market, config.simulation_config()).generate(&grid)?;
    Ok(scenarios)
}

/// Runs both pricers on the same scenarios.
///
/// Supplied `scenarios` must carry the configured market's factor layout;
/// otherwise paths are simulated from the configuration.
pub fn run(config: &RunConfig, scenarios: Option<ScenarioSet>) -> ExposureResult<CvaReport> {
    config.validate_or_error()?;
    let market = config.build_market()?;
    let portfolio = &config.portfolio;
    portfolio.validate(&market)?;

    let scenarios = match scenarios {
        Some(s) => {
            s.check_layout(market.layout())?;
            info!(
                "Using supplied scenarios: {} paths x {} dates",
                s.n_paths(),
                s.n_steps()
            );
            s
        }
        None => {
            let grid = config.time_grid()?;
            ScenarioGenerator::new(&market, config.simulation_config()).generate(&grid)?
        }
    };

    let profile_config = config.profile_config();
    let calculator = config.cva_calculator()?;
    let parallel = config.surrogate.parallel;

    let analytical_pricer = AnalyticalPricer::new(&market).with_parallel(parallel);
    let analytical_cube = analytical_pricer.price_cube(portfolio, &scenarios)?;
    let analytical = evaluate(
        analytical_pricer.name(),
        &analytical_cube,
        &scenarios,
        &profile_config,
        &calculator,
        None,
    )?;
    info!(
        "Analytical CVA {:.2} +/- {:.2}",
        analytical.cva.value, analytical.cva.std_dev
    );

    let surrogates = SurrogateSet::train(&market, portfolio, &scenarios, &config.surrogate)?;
    let surrogate_pricer = SurrogatePricer::new(&surrogates).with_parallel(parallel);
    let surrogate_cube = surrogate_pricer.price_cube(portfolio, &scenarios)?;
    let surrogate = evaluate(
        surrogate_pricer.name(),
        &surrogate_cube,
        &scenarios,
        &profile_config,
        &calculator,
        Some(surrogates.training_seconds()),
    )?;
    info!(
        "Surrogate CVA {:.2} +/- {:.2}",
        surrogate.cva.value, surrogate.cva.std_dev
    );

    let z = normal_quantile(0.5 + 0.5 * surrogate.cva.confidence)?;
    let comparison = Comparison::new(&analytical, &surrogate, z)?;
    info!(
        "CVA difference {:.2} ({:.2}%), EPE band coverage {:.0}% (GP only {:.0}%)",
        comparison.cva_diff,
        100.0 * comparison.cva_rel_error,
        100.0 * comparison.band_coverage,
        100.0 * comparison.gp_band_coverage
    );

    Ok(CvaReport {
        counterparty: portfolio.counterparty.clone(),
        domestic: market.domestic().to_string(),
        n_paths: scenarios.n_paths(),
        n_steps: scenarios.n_steps(),
        n_instruments: portfolio.len(),
        n_gps: surrogates.gp_count(),
        analytical,
        surrogate,
        comparison,
        diagnostics: surrogates.diagnostics().to_vec(),
    })
}

fn evaluate(
    name: &str,
    cube: &PriceCube,
    scenarios: &ScenarioSet,
    profile_config: &ProfileConfig,
    calculator: &CvaCalculator,
    training_seconds: Option<f64>,
) -> ExposureResult<RunResult> {
    let profile = ExposureProfile::from_cube(cube, scenarios, profile_config)?;
    let cva = calculator.compute(&profile)?;
    Ok(RunResult {
        pricer: name.to_string(),
        profile,
        cva,
        pricing_seconds: cube.seconds,
        training_seconds,
        clipping: cube.clipping.clone(),
    })
}
