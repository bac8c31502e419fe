//! Correlated Monte Carlo simulation of the market model.

use gpxva_core::TimeGrid;
use log::{debug, info};
use nalgebra::DVector;
use ndarray::{Array2, Array3};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use super::ScenarioSet;
use crate::error::{ModelError, ModelResult};
use crate::market::MarketModel;

/// Path simulation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of paths.
    pub paths: usize,
    /// RNG seed.
    pub seed: u64,
    /// Pair every path with its mirror `−z`.
    pub antithetic: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            paths: 2000,
            seed: 42,
            antithetic: true,
        }
    }
}

/// Simulates [`ScenarioSet`]s from a [`MarketModel`].
///
/// Short rates use the exact OU transition of their Hull-White state, with
/// the quanto drift for foreign rates. FX spots take log-Euler steps with
/// the rates at the start of each interval. The deflator integrates the
/// domestic short rate with the trapezoid rule.
#[derive(Debug, Clone)]
pub struct ScenarioGenerator<'a> {
    market: &'a MarketModel,
    config: SimulationConfig,
}

impl<'a> ScenarioGenerator<'a> {
    /// Creates a generator.
    pub fn new(market: &'a MarketModel, config: SimulationConfig) -> Self {
        Self { market, config }
    }

    /// Simulation settings.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Simulates all paths over `grid`.
    pub fn generate(&self, grid: &TimeGrid) -> ModelResult<ScenarioSet> {
        let n_paths = self.config.paths;
        if n_paths == 0 {
            return Err(ModelError::invalid_parameter("paths", "must be positive"));
        }
        let layout = self.market.layout();
        let n_factors = layout.len();
        let n_steps = grid.len();
        info!(
            "Simulating {} paths x {} steps over {} factors (antithetic: {})",
            n_paths, n_steps, n_factors, self.config.antithetic
        );

        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let mut values = Array3::zeros((n_paths, n_steps, n_factors));
        let mut deflators = Array2::zeros((n_paths, n_steps));
        let mut shocks: Vec<DVector<f64>> = Vec::new();

        for p in 0..n_paths {
            let mirror = self.config.antithetic && p % 2 == 1;
            if !mirror {
                shocks = (1..n_steps)
                    .map(|_| DVector::from_fn(n_factors, |_, _| StandardNormal.sample(&mut rng)))
                    .collect();
            }
            let sign = if mirror { -1.0 } else { 1.0 };
            self.simulate_path(grid, &shocks, sign, p, &mut values, &mut deflators);
        }

        debug!("Simulation finished, seed {}", self.config.seed);
        ScenarioSet::new(grid.clone(), layout.names().to_vec(), values, deflators)
    }

    fn simulate_path(
        &self,
        grid: &TimeGrid,
        shocks: &[DVector<f64>],
        sign: f64,
        p: usize,
        values: &mut Array3<f64>,
        deflators: &mut Array2<f64>,
    ) {
        let market = self.market;
        let rates = market.rate_factors();
        let fxs = market.fx_factors();
        let n_rates = rates.len();
        let fx_rate_pos: Vec<usize> = fxs
            .iter()
            .map(|f| {
                rates
                    .iter()
                    .position(|r| r.currency == f.currency)
                    .unwrap_or(0)
            })
            .collect();
        let quanto: Vec<f64> = (0..n_rates).map(|k| market.quanto_drift(k)).collect();

        let mut x = vec![0.0; n_rates];
        let mut state = market.initial_state();
        let mut deflator = 1.0;
        for (f, v) in state.iter().enumerate() {
            values[[p, 0, f]] = *v;
        }
        deflators[[p, 0]] = 1.0;

        for s in 1..grid.len() {
            let t = grid.time(s);
            let dt = grid.dt(s);
            let w = market.cholesky() * (&shocks[s - 1] * sign);

            let r_d_prev = state[0];
            let prev_rates: Vec<f64> = state[..n_rates].to_vec();

            for (k, rate) in rates.iter().enumerate() {
                let hw = &rate.hull_white;
                x[k] = hw.x_step(x[k], dt, w[k], quanto[k]);
                state[k] = hw.short_rate(x[k], t);
            }
            for (j, fx) in fxs.iter().enumerate() {
                let idx = n_rates + j;
                state[idx] = fx.model.step(
                    state[idx],
                    prev_rates[0],
                    prev_rates[fx_rate_pos[j]],
                    dt,
                    w[idx],
                );
            }

            deflator *= (-0.5 * (r_d_prev + state[0]) * dt).exp();
            for (f, v) in state.iter().enumerate() {
                values[[p, s, f]] = *v;
            }
            deflators[[p, s]] = deflator;
        }
    }
}
