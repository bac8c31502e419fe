//! Pricing instruments over a scenario set.

use std::time::Instant;

use gpxva_models::market::MarketModel;
use gpxva_models::scenario::ScenarioSet;
use gpxva_models::swap::InterestRateSwap;
use log::{info, warn};
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{ExposureError, ExposureResult};
use crate::parallel::maybe_parallel_map;
use crate::portfolio::Portfolio;
use crate::surrogate::SurrogateSet;

/// Values and optional variances of one instrument, `[path, step]`.
type Slice = (Array2<f64>, Option<Array2<f64>>);

/// Share of clipped paths at a date above which a warning is logged.
const CLIP_WARN_RATIO: f64 = 0.05;

/// How often surrogate inputs left the training domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClippingStats {
    /// Clipped evaluations per step.
    pub clipped: Vec<usize>,
    /// Evaluations per step.
    pub total: Vec<usize>,
}

impl ClippingStats {
    fn new(n_steps: usize) -> Self {
        Self {
            clipped: vec![0; n_steps],
            total: vec![0; n_steps],
        }
    }

    /// Clipped share at step `s`.
    pub fn step_ratio(&self, s: usize) -> f64 {
        match self.total.get(s) {
            Some(&n) if n > 0 => self.clipped[s] as f64 / n as f64,
            _ => 0.0,
        }
    }

    /// Clipped share over all steps.
    pub fn ratio(&self) -> f64 {
        let total: usize = self.total.iter().sum();
        if total == 0 {
            0.0
        } else {
            self.clipped.iter().sum::<usize>() as f64 / total as f64
        }
    }
}

/// Instrument values in domestic currency, indexed `[instrument, path, step]`.
#[derive(Debug, Clone)]
pub struct PriceCube {
    /// Point values.
    pub mean: Array3<f64>,
    /// Predictive variances, for pricers that have them.
    pub variance: Option<Array3<f64>>,
    /// Domain clipping counts, for surrogate pricers.
    pub clipping: Option<ClippingStats>,
    /// Wall-clock pricing time.
    pub seconds: f64,
}

impl PriceCube {
    /// Number of instruments.
    pub fn n_instruments(&self) -> usize {
        self.mean.len_of(Axis(0))
    }

    /// Number of paths.
    pub fn n_paths(&self) -> usize {
        self.mean.len_of(Axis(1))
    }

    /// Number of steps.
    pub fn n_steps(&self) -> usize {
        self.mean.len_of(Axis(2))
    }

    /// Netting-set value per `[path, step]`.
    pub fn portfolio_values(&self) -> Array2<f64> {
        self.mean.sum_axis(Axis(0))
    }

    /// Variance of the netting-set value per `[path, step]`, treating
    /// instrument errors as independent.
    pub fn portfolio_variance(&self) -> Option<Array2<f64>> {
        self.variance.as_ref().map(|v| v.sum_axis(Axis(0)))
    }

    fn from_slices(
        slices: Vec<Slice>,
        n_paths: usize,
        n_steps: usize,
    ) -> Self {
        let n = slices.len();
        let mut mean = Array3::zeros((n, n_paths, n_steps));
        let with_variance = slices.iter().all(|(_, v)| v.is_some()) && n > 0;
        let mut variance = with_variance.then(|| Array3::zeros((n, n_paths, n_steps)));
        for (i, (m, v)) in slices.into_iter().enumerate() {
            mean.index_axis_mut(Axis(0), i).assign(&m);
            if let (Some(all), Some(v)) = (variance.as_mut(), v) {
                all.index_axis_mut(Axis(0), i).assign(&v);
            }
        }
        Self {
            mean,
            variance,
            clipping: None,
            seconds: 0.0,
        }
    }
}

/// Values a netting set along every path of a scenario set.
pub trait Pricer {
    /// Short label used in reports.
    fn name(&self) -> &str;

    /// Prices every instrument on every path and date.
    fn price_cube(&self, portfolio: &Portfolio, scenarios: &ScenarioSet)
        -> ExposureResult<PriceCube>;
}

/// Closed-form pricing through the market model.
#[derive(Debug, Clone, Copy)]
pub struct AnalyticalPricer<'a> {
    market: &'a MarketModel,
    parallel: bool,
}

impl<'a> AnalyticalPricer<'a> {
    /// Creates an analytical pricer.
    pub fn new(market: &'a MarketModel) -> Self {
        Self {
            market,
            parallel: true,
        }
    }

    /// Enables or disables the thread pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl Pricer for AnalyticalPricer<'_> {
    fn name(&self) -> &str {
        "analytical"
    }

    fn price_cube(
        &self,
        portfolio: &Portfolio,
        scenarios: &ScenarioSet,
    ) -> ExposureResult<PriceCube> {
        scenarios.check_layout(self.market.layout())?;
        let start = Instant::now();
        let (n_paths, n_steps) = (scenarios.n_paths(), scenarios.n_steps());
        let grid = scenarios.grid();

        let price_swap = |swap: &InterestRateSwap| -> ExposureResult<Slice> {
            let indices = self.market.instrument_factors(swap.currency())?;
            let mut values = Array2::zeros((n_paths, n_steps));
            for s in 0..n_steps {
                let t = grid.time(s);
                if !swap.is_alive(t) {
                    continue;
                }
                for (p, factors) in scenarios.factor_rows(s, &indices).iter().enumerate() {
                    values[[p, s]] = self.market.value_from_factors(swap, t, factors)?;
                }
            }
            Ok((values, None))
        };
        let slices = maybe_parallel_map(&portfolio.swaps, self.parallel, price_swap)
            .into_iter()
            .collect::<ExposureResult<Vec<_>>>()?;

        let mut cube = PriceCube::from_slices(slices, n_paths, n_steps);
        cube.seconds = start.elapsed().as_secs_f64();
        info!(
            "Analytical pricing: {} instruments x {} paths x {} dates in {:.3}s",
            portfolio.len(),
            n_paths,
            n_steps,
            cube.seconds
        );
        Ok(cube)
    }
}

/// Pricing through trained surrogates, with paths clipped to each
/// surrogate's training domain.
#[derive(Debug, Clone, Copy)]
pub struct SurrogatePricer<'a> {
    surrogates: &'a SurrogateSet,
    parallel: bool,
}

impl<'a> SurrogatePricer<'a> {
    /// Creates a surrogate pricer.
    pub fn new(surrogates: &'a SurrogateSet) -> Self {
        Self {
            surrogates,
            parallel: true,
        }
    }

    /// Enables or disables the thread pool.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

impl Pricer for SurrogatePricer<'_> {
    fn name(&self) -> &str {
        "surrogate"
    }

    fn price_cube(
        &self,
        portfolio: &Portfolio,
        scenarios: &ScenarioSet,
    ) -> ExposureResult<PriceCube> {
        let set = self.surrogates;
        if set.n_instruments() != portfolio.len() || set.n_steps() != scenarios.n_steps() {
            return Err(ExposureError::shape(format!(
                "surrogates cover {} instruments x {} dates, scenarios need {} x {}",
                set.n_instruments(),
                set.n_steps(),
                portfolio.len(),
                scenarios.n_steps()
            )));
        }
        let start = Instant::now();
        let (n_paths, n_steps) = (scenarios.n_paths(), scenarios.n_steps());
        let instruments: Vec<usize> = (0..portfolio.len()).collect();

        let price_instrument = |&i: &usize| -> ExposureResult<(Slice, Vec<usize>)> {
            let mut mean = Array2::zeros((n_paths, n_steps));
            let mut variance = Array2::zeros((n_paths, n_steps));
            let mut clipped = vec![0usize; n_steps];
            for s in 0..n_steps {
                let surrogate = set
                    .get(i, s)
                    .ok_or_else(|| ExposureError::shape(format!("missing surrogate {i}/{s}")))?;
                let rows = scenarios.factor_rows(s, set.factor_indices(i));
                for (p, out) in surrogate.predict_batch(&rows)?.into_iter().enumerate() {
                    mean[[p, s]] = out.mean;
                    variance[[p, s]] = out.variance;
                    clipped[s] += usize::from(out.clipped);
                }
            }
            Ok(((mean, Some(variance)), clipped))
        };
        let results = maybe_parallel_map(&instruments, self.parallel, price_instrument)
            .into_iter()
            .collect::<ExposureResult<Vec<_>>>()?;

        let mut stats = ClippingStats::new(n_steps);
        let mut slices = Vec::with_capacity(results.len());
        for (slice, clipped) in results {
            for (s, c) in clipped.into_iter().enumerate() {
                stats.clipped[s] += c;
                stats.total[s] += n_paths;
            }
            slices.push(slice);
        }
        for s in 0..n_steps {
            let ratio = stats.step_ratio(s);
            if ratio > CLIP_WARN_RATIO {
                warn!(
                    "{:.1}% of surrogate inputs clipped at t = {:.3}",
                    100.0 * ratio,
                    scenarios.grid().time(s)
                );
            }
        }

        let mut cube = PriceCube::from_slices(slices, n_paths, n_steps);
        cube.clipping = Some(stats);
        cube.seconds = start.elapsed().as_secs_f64();
        info!(
            "Surrogate pricing: {} instruments x {} paths x {} dates in {:.3}s",
            portfolio.len(),
            n_paths,
            n_steps,
            cube.seconds
        );
        Ok(cube)
    }
}
