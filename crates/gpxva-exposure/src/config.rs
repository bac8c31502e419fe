//! Run configuration.
//!
//! A run is described by one TOML document. Every section is optional and
//! falls back to the built-in demo: a USD netting set with EUR, GBP and JPY
//! swaps over a 10-year quarterly grid.
//!
//! ```toml
//! [market]
//! domestic = "USD"
//!
//! [[market.currencies]]
//! currency = "USD"
//! tenors = [1.0, 5.0, 10.0]
//! zero_rates = [0.040, 0.036, 0.037]
//! mean_reversion = 0.03
//! volatility = 0.009
//!
//! [simulation]
//! paths = 2000
//! steps = 40
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use gpxva_core::{Currency, Frequency, TimeGrid};
use gpxva_models::credit::CreditCurve;
use gpxva_models::curve::ZeroCurve;
use gpxva_models::fx::FxModel;
use gpxva_models::hull_white::HullWhite;
use gpxva_models::market::{FxFactor, MarketModel, RateFactor};
use gpxva_models::scenario::SimulationConfig;
use gpxva_models::swap::{InterestRateSwap, SwapDirection};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::cva::CvaCalculator;
use crate::error::{ExposureError, ExposureResult};
use crate::portfolio::Portfolio;
use crate::profile::ProfileConfig;
use crate::surrogate::SurrogateConfig;

/// A single validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Field that failed validation.
    pub field: String,
    /// Validation error message.
    pub message: String,
}

impl ValidationError {
    /// Creates a new validation error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Trait for validatable configurations.
pub trait Validate {
    /// Returns every problem found, or an empty vector if valid.
    fn validate(&self) -> Vec<ValidationError>;

    /// Returns true if the configuration is valid.
    fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Validates and returns an error if invalid.
    fn validate_or_error(&self) -> ExposureResult<()> {
        let mut errors = self.validate();
        match errors.len() {
            0 => Ok(()),
            1 => {
                let err = errors.remove(0);
                Err(ExposureError::Validation {
                    field: err.field,
                    message: err.message,
                })
            }
            _ => Err(ExposureError::MultipleValidationErrors(errors)),
        }
    }
}

/// Rate model (and FX for foreign currencies) of one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Currency.
    pub currency: Currency,
    /// Zero curve pillars in years.
    pub tenors: Vec<f64>,
    /// Continuously compounded zero rates at the pillars.
    pub zero_rates: Vec<f64>,
    /// Hull-White mean reversion.
    pub mean_reversion: f64,
    /// Hull-White volatility.
    pub volatility: f64,
    /// Spot in domestic units; foreign currencies only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx_spot: Option<f64>,
    /// FX lognormal volatility; foreign currencies only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fx_volatility: Option<f64>,
}

/// Correlation structure of the Brownian drivers.
///
/// Unless a full `matrix` is given (state order: rates with the domestic
/// first, then FX spots), correlations are built from four parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Between any two short rates.
    pub rate_rate: f64,
    /// Between any two FX spots.
    pub fx_fx: f64,
    /// Between the domestic rate and each FX spot.
    pub domestic_rate_fx: f64,
    /// Between a foreign rate and its own FX spot.
    pub foreign_rate_fx: f64,
    /// Full matrix, overriding the parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matrix: Option<Vec<Vec<f64>>>,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            rate_rate: 0.4,
            fx_fx: 0.3,
            domestic_rate_fx: 0.1,
            foreign_rate_fx: -0.15,
            matrix: None,
        }
    }
}

/// Market section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Reporting currency.
    pub domestic: Currency,
    /// One entry per currency traded, domestic included.
    pub currencies: Vec<CurrencyConfig>,
    /// Driver correlations.
    #[serde(default)]
    pub correlation: CorrelationConfig,
}

/// Simulation section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Last exposure date in years.
    pub horizon: f64,
    /// Equal intervals over the horizon.
    pub steps: usize,
    /// Monte Carlo paths.
    pub paths: usize,
    /// RNG seed.
    pub seed: u64,
    /// Antithetic path pairs.
    pub antithetic: bool,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        let sim = SimulationConfig::default();
        Self {
            horizon: 10.0,
            steps: 40,
            paths: sim.paths,
            seed: sim.seed,
            antithetic: sim.antithetic,
        }
    }
}

/// Counterparty credit section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreditConfig {
    /// Recovery rate.
    pub recovery: f64,
    /// CDS spread implying a flat hazard rate, used when no hazard term
    /// structure is given.
    pub cds_spread: f64,
    /// End times of piecewise-flat hazard rates.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hazard_times: Vec<f64>,
    /// Piecewise-flat hazard rates.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hazard_rates: Vec<f64>,
}

impl Default for CreditConfig {
    fn default() -> Self {
        Self {
            recovery: 0.4,
            cds_spread: 0.012,
            hazard_times: Vec::new(),
            hazard_rates: Vec::new(),
        }
    }
}

/// Reporting section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// PFE quantile level.
    pub pfe_level: f64,
    /// Discount exposures with the path deflator.
    pub discounted: bool,
    /// Include surrogate variance in the error bars.
    pub propagate_variance: bool,
    /// Two-sided confidence of EPE and CVA bands.
    pub confidence: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        let profile = ProfileConfig::default();
        Self {
            pfe_level: profile.pfe_level,
            discounted: profile.discounted,
            propagate_variance: profile.propagate_variance,
            confidence: 0.95,
        }
    }
}

/// Complete description of a CVA run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Market models.
    pub market: MarketConfig,
    /// Netting set.
    pub portfolio: Portfolio,
    /// Path simulation.
    pub simulation: SimulationSettings,
    /// Surrogate training.
    pub surrogate: SurrogateConfig,
    /// Counterparty credit.
    pub credit: CreditConfig,
    /// Reporting.
    pub report: ReportConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            market: demo_market(),
            portfolio: demo_portfolio(),
            simulation: SimulationSettings::default(),
            surrogate: SurrogateConfig::default(),
            credit: CreditConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl RunConfig {
    /// Parses a TOML document and validates it.
    pub fn from_toml_str(s: &str) -> ExposureResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate_or_error()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> ExposureResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> ExposureResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Builds the market model. The domestic currency goes first and the
    /// remaining currencies keep their configured order.
    pub fn build_market(&self) -> ExposureResult<MarketModel> {
        let ordered = self.ordered_currencies();
        let mut rates = Vec::with_capacity(ordered.len());
        let mut fxs = Vec::new();
        for ccy in &ordered {
            let curve = ZeroCurve::new(ccy.tenors.clone(), ccy.zero_rates.clone())?;
            let hw = HullWhite::new(ccy.mean_reversion, ccy.volatility, curve)?;
            rates.push(RateFactor::new(ccy.currency, hw));
            if ccy.currency != self.market.domestic {
                let spot = ccy.fx_spot.ok_or_else(|| {
                    ExposureError::Validation {
                        field: format!("market.currencies.{}.fx_spot", ccy.currency),
                        message: "required for foreign currencies".into(),
                    }
                })?;
                let vol = ccy.fx_volatility.unwrap_or(0.0);
                fxs.push(FxFactor::new(ccy.currency, FxModel::new(spot, vol)?));
            }
        }
        let correlation = self.correlation_matrix(rates.len(), fxs.len())?;
        Ok(MarketModel::new(
            self.market.domestic,
            rates,
            fxs,
            correlation,
        )?)
    }

    fn ordered_currencies(&self) -> Vec<&CurrencyConfig> {
        let domestic = self.market.domestic;
        self.market
            .currencies
            .iter()
            .filter(|c| c.currency == domestic)
            .chain(self.market.currencies.iter().filter(|c| c.currency != domestic))
            .collect()
    }

    fn correlation_matrix(&self, n_rates: usize, n_fx: usize) -> ExposureResult<DMatrix<f64>> {
        let n = n_rates + n_fx;
        let corr = &self.market.correlation;
        if let Some(rows) = &corr.matrix {
            if rows.len() != n || rows.iter().any(|r| r.len() != n) {
                return Err(ExposureError::Validation {
                    field: "market.correlation.matrix".into(),
                    message: format!("must be {n}x{n}"),
                });
            }
            return Ok(DMatrix::from_fn(n, n, |i, j| rows[i][j]));
        }
        // Foreign rate k (position k + 1) pairs with FX spot k
        Ok(DMatrix::from_fn(n, n, |i, j| {
            if i == j {
                return 1.0;
            }
            let (lo, hi) = (i.min(j), i.max(j));
            match (lo < n_rates, hi < n_rates) {
                (true, true) => corr.rate_rate,
                (false, false) => corr.fx_fx,
                _ if lo == 0 => corr.domestic_rate_fx,
                _ if hi - n_rates + 1 == lo => corr.foreign_rate_fx,
                _ => 0.0,
            }
        }))
    }

    /// Exposure dates.
    pub fn time_grid(&self) -> ExposureResult<TimeGrid> {
        Ok(TimeGrid::uniform(
            self.simulation.horizon,
            self.simulation.steps,
        )?)
    }

    /// Path simulation settings.
    pub fn simulation_config(&self) -> SimulationConfig {
        SimulationConfig {
            paths: self.simulation.paths,
            seed: self.simulation.seed,
            antithetic: self.simulation.antithetic,
        }
    }

    /// Counterparty credit curve.
    pub fn credit_curve(&self) -> ExposureResult<CreditCurve> {
        let credit = &self.credit;
        let curve = if credit.hazard_rates.is_empty() {
            CreditCurve::from_cds_spread(credit.cds_spread, credit.recovery)?
        } else {
            CreditCurve::piecewise(credit.hazard_times.clone(), credit.hazard_rates.clone())?
        };
        Ok(curve)
    }

    /// CVA calculator for the configured credit and confidence.
    pub fn cva_calculator(&self) -> ExposureResult<CvaCalculator> {
        Ok(CvaCalculator::new(self.credit.recovery, self.credit_curve()?)?
            .with_confidence(self.report.confidence))
    }

    /// Profile aggregation settings.
    pub fn profile_config(&self) -> ProfileConfig {
        ProfileConfig {
            pfe_level: self.report.pfe_level,
            discounted: self.report.discounted,
            propagate_variance: self.report.propagate_variance,
        }
    }
}

fn check_probability(errors: &mut Vec<ValidationError>, field: &str, value: f64, open: bool) {
    let ok = if open {
        value > 0.0 && value < 1.0
    } else {
        (0.0..=1.0).contains(&value)
    };
    if !ok {
        let range = if open { "(0, 1)" } else { "[0, 1]" };
        errors.push(ValidationError::new(field, format!("must be in {range}, got {value}")));
    }
}

impl Validate for CurrencyConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let field = |name: &str| format!("market.currencies.{}.{name}", self.currency);
        let mut errors = Vec::new();
        if self.tenors.is_empty() || self.tenors.len() != self.zero_rates.len() {
            errors.push(ValidationError::new(
                field("tenors"),
                format!(
                    "need matching non-empty tenors and zero_rates, got {} and {}",
                    self.tenors.len(),
                    self.zero_rates.len()
                ),
            ));
        }
        if self.tenors.iter().any(|t| *t <= 0.0) || self.tenors.windows(2).any(|w| w[1] <= w[0]) {
            errors.push(ValidationError::new(
                field("tenors"),
                "must be positive and strictly increasing",
            ));
        }
        if !(self.mean_reversion >= 0.0) {
            errors.push(ValidationError::new(field("mean_reversion"), "must be non-negative"));
        }
        if !(self.volatility >= 0.0) {
            errors.push(ValidationError::new(field("volatility"), "must be non-negative"));
        }
        if let Some(spot) = self.fx_spot {
            if !(spot > 0.0) {
                errors.push(ValidationError::new(field("fx_spot"), "must be positive"));
            }
        }
        if let Some(vol) = self.fx_volatility {
            if !(vol >= 0.0) {
                errors.push(ValidationError::new(field("fx_volatility"), "must be non-negative"));
            }
        }
        errors
    }
}

impl Validate for RunConfig {
    fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        let domestic = self.market.domestic;

        let mut seen = HashSet::new();
        for ccy in &self.market.currencies {
            if !seen.insert(ccy.currency) {
                errors.push(ValidationError::new(
                    "market.currencies",
                    format!("{} listed twice", ccy.currency),
                ));
            }
            errors.extend(ccy.validate());
            if ccy.currency != domestic && ccy.fx_spot.is_none() {
                errors.push(ValidationError::new(
                    format!("market.currencies.{}.fx_spot", ccy.currency),
                    "required for foreign currencies",
                ));
            }
        }
        if !seen.contains(&domestic) {
            errors.push(ValidationError::new(
                "market.domestic",
                format!("{domestic} has no entry in market.currencies"),
            ));
        }
        let corr = &self.market.correlation;
        for (name, rho) in [
            ("rate_rate", corr.rate_rate),
            ("fx_fx", corr.fx_fx),
            ("domestic_rate_fx", corr.domestic_rate_fx),
            ("foreign_rate_fx", corr.foreign_rate_fx),
        ] {
            if !(-1.0..=1.0).contains(&rho) {
                errors.push(ValidationError::new(
                    format!("market.correlation.{name}"),
                    format!("must be in [-1, 1], got {rho}"),
                ));
            }
        }

        if self.portfolio.swaps.is_empty() {
            errors.push(ValidationError::new("portfolio.swaps", "no swaps"));
        }
        let mut ids = HashSet::new();
        for swap in &self.portfolio.swaps {
            if let Err(e) = swap.validate() {
                errors.push(ValidationError::new("portfolio.swaps", e.to_string()));
            }
            if !ids.insert(swap.id()) {
                errors.push(ValidationError::new(
                    "portfolio.swaps",
                    format!("duplicate id '{}'", swap.id()),
                ));
            }
            if !seen.contains(&swap.currency()) {
                errors.push(ValidationError::new(
                    "portfolio.swaps",
                    format!("swap '{}' trades {} with no market entry", swap.id(), swap.currency()),
                ));
            }
        }

        let sim = &self.simulation;
        if !(sim.horizon > 0.0) {
            errors.push(ValidationError::new("simulation.horizon", "must be positive"));
        }
        if sim.steps == 0 {
            errors.push(ValidationError::new("simulation.steps", "must be positive"));
        }
        if sim.paths == 0 {
            errors.push(ValidationError::new("simulation.paths", "must be positive"));
        }

        let sur = &self.surrogate;
        if sur.training_points < 2 {
            errors.push(ValidationError::new("surrogate.training_points", "need at least 2"));
        }
        if !(0.0..0.5).contains(&sur.domain_trim) {
            errors.push(ValidationError::new("surrogate.domain_trim", "must be in [0, 0.5)"));
        }
        if !(sur.noise_variance > 0.0) {
            errors.push(ValidationError::new("surrogate.noise_variance", "must be positive"));
        }

        let credit = &self.credit;
        if !(0.0..1.0).contains(&credit.recovery) {
            errors.push(ValidationError::new("credit.recovery", "must be in [0, 1)"));
        }
        if !(credit.cds_spread >= 0.0) {
            errors.push(ValidationError::new("credit.cds_spread", "must be non-negative"));
        }
        if credit.hazard_times.len() != credit.hazard_rates.len() {
            errors.push(ValidationError::new(
                "credit.hazard_rates",
                "hazard_times and hazard_rates must have the same length",
            ));
        }

        check_probability(&mut errors, "report.pfe_level", self.report.pfe_level, false);
        check_probability(&mut errors, "report.confidence", self.report.confidence, true);
        errors
    }
}

fn currency(
    currency: Currency,
    zero_rates: [f64; 5],
    mean_reversion: f64,
    volatility: f64,
    fx: Option<(f64, f64)>,
) -> CurrencyConfig {
    CurrencyConfig {
        currency,
        tenors: vec![1.0, 2.0, 5.0, 10.0, 30.0],
        zero_rates: zero_rates.to_vec(),
        mean_reversion,
        volatility,
        fx_spot: fx.map(|(spot, _)| spot),
        fx_volatility: fx.map(|(_, vol)| vol),
    }
}

fn demo_market() -> MarketConfig {
    MarketConfig {
        domestic: Currency::USD,
        currencies: vec![
            currency(Currency::USD, [0.040, 0.038, 0.036, 0.037, 0.039], 0.03, 0.009, None),
            currency(
                Currency::EUR,
                [0.025, 0.024, 0.024, 0.026, 0.028],
                0.03,
                0.008,
                Some((1.08, 0.08)),
            ),
            currency(
                Currency::GBP,
                [0.042, 0.040, 0.038, 0.039, 0.041],
                0.03,
                0.0085,
                Some((1.27, 0.09)),
            ),
            currency(
                Currency::JPY,
                [0.002, 0.004, 0.007, 0.011, 0.018],
                0.02,
                0.005,
                Some((0.0067, 0.10)),
            ),
        ],
        correlation: CorrelationConfig::default(),
    }
}

fn demo_swap(
    id: &str,
    ccy: Currency,
    notional: f64,
    maturity: f64,
    rate: f64,
    direction: SwapDirection,
) -> Option<InterestRateSwap> {
    InterestRateSwap::builder()
        .id(id)
        .currency(ccy)
        .notional(notional)
        .maturity(maturity)
        .fixed_rate(rate)
        .frequency(Frequency::SemiAnnual)
        .direction(direction)
        .build()
        .ok()
}

fn demo_portfolio() -> Portfolio {
    use SwapDirection::{Payer, Receiver};
    let swaps = [
        demo_swap("USD-5Y", Currency::USD, 10e6, 5.0, 0.0365, Payer),
        demo_swap("USD-10Y", Currency::USD, 5e6, 10.0, 0.0370, Receiver),
        demo_swap("EUR-7Y", Currency::EUR, 8e6, 7.0, 0.0245, Payer),
        demo_swap("EUR-3Y", Currency::EUR, 6e6, 3.0, 0.0240, Receiver),
        demo_swap("GBP-5Y", Currency::GBP, 4e6, 5.0, 0.0385, Payer),
        demo_swap("GBP-10Y", Currency::GBP, 3e6, 10.0, 0.0390, Receiver),
        demo_swap("JPY-5Y", Currency::JPY, 1e9, 5.0, 0.0065, Payer),
        demo_swap("JPY-8Y", Currency::JPY, 8e8, 8.0, 0.0090, Receiver),
    ];
    Portfolio::new("ACME Bank", swaps.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_is_valid_demo() {
        let config = RunConfig::default();
        assert!(config.is_valid(), "{:?}", config.validate());
        assert_eq!(config.portfolio.len(), 8);
        let market = config.build_market().unwrap();
        assert_eq!(
            market.layout().names(),
            &["r_USD", "r_EUR", "r_GBP", "r_JPY", "fx_EUR", "fx_GBP", "fx_JPY"]
        );
        config.portfolio.validate(&market).unwrap();
        assert_eq!(config.time_grid().unwrap().len(), 41);
    }

    #[test]
    fn test_correlation_structure() {
        let market = RunConfig::default().build_market().unwrap();
        let c = market.correlation();
        assert_relative_eq!(c[(0, 3)], 0.4);
        assert_relative_eq!(c[(4, 6)], 0.3);
        assert_relative_eq!(c[(0, 5)], 0.1);
        // r_GBP with fx_GBP
        assert_relative_eq!(c[(2, 5)], -0.15);
        assert_relative_eq!(c[(5, 2)], -0.15);
        // r_GBP with fx_EUR
        assert_relative_eq!(c[(2, 4)], 0.0);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RunConfig::default();
        let text = config.to_toml_string().unwrap();
        let back = RunConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let text = r#"
[simulation]
paths = 64
steps = 8
horizon = 2.0

[credit]
recovery = 0.35
hazard_times = [1.0, 5.0]
hazard_rates = [0.01, 0.02]
"#;
        let config = RunConfig::from_toml_str(text).unwrap();
        assert_eq!(config.simulation.paths, 64);
        assert!(config.simulation.antithetic);
        assert_eq!(config.portfolio.len(), 8);
        assert_relative_eq!(config.credit.recovery, 0.35);
        let curve = config.credit_curve().unwrap();
        assert_relative_eq!(curve.hazard_rate(3.0), 0.02);
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = RunConfig::default();
        config.simulation.paths = 0;
        config.credit.recovery = 1.5;
        config.market.currencies[1].fx_spot = None;
        let errors = config.validate();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"simulation.paths"));
        assert!(fields.contains(&"credit.recovery"));
        assert!(fields.contains(&"market.currencies.EUR.fx_spot"));
        assert!(matches!(
            config.validate_or_error(),
            Err(ExposureError::MultipleValidationErrors(_))
        ));
    }

    #[test]
    fn test_single_error() {
        let mut config = RunConfig::default();
        config.report.confidence = 1.0;
        match config.validate_or_error() {
            Err(ExposureError::Validation { field, .. }) => assert_eq!(field, "report.confidence"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_explicit_matrix_shape() {
        let mut config = RunConfig::default();
        config.market.correlation.matrix = Some(vec![vec![1.0]]);
        assert!(config.build_market().is_err());
    }

    #[test]
    fn test_bad_toml() {
        assert!(matches!(
            RunConfig::from_toml_str("[simulation]\npaths = \"many\""),
            Err(ExposureError::TomlParse(_))
        ));
    }
}
