//! Simulated market scenarios.
//!
//! A [`ScenarioSet`] stores market states on a [`TimeGrid`] for every path,
//! together with the domestic deflator `exp(−∫₀ᵗ r_d(u) du)`. Sets come from
//! the [`ScenarioGenerator`] or from CSV files written by another run.

mod generator;
mod io;

pub use generator::{ScenarioGenerator, SimulationConfig};

use gpxva_core::TimeGrid;
use ndarray::{s, Array2, Array3, Axis};

use crate::error::{ModelError, ModelResult};
use crate::market::FactorLayout;

/// Market states indexed by `[path, step, factor]`.
#[derive(Debug, Clone)]
pub struct ScenarioSet {
    grid: TimeGrid,
    factor_names: Vec<String>,
    values: Array3<f64>,
    deflators: Array2<f64>,
}

impl ScenarioSet {
    /// Creates a scenario set, checking that the arrays agree with the grid
    /// and factor names.
    pub fn new(
        grid: TimeGrid,
        factor_names: Vec<String>,
        values: Array3<f64>,
        deflators: Array2<f64>,
    ) -> ModelResult<Self> {
        let (paths, steps, factors) = values.dim();
        if paths == 0 {
            return Err(ModelError::scenario("no paths"));
        }
        if steps != grid.len() {
            return Err(ModelError::scenario(format!(
                "{steps} steps in values but {} grid times",
                grid.len()
            )));
        }
        if factors != factor_names.len() {
            return Err(ModelError::scenario(format!(
                "{factors} factors in values but {} names",
                factor_names.len()
            )));
        }
        if deflators.dim() != (paths, steps) {
            return Err(ModelError::scenario(format!(
                "deflators have shape {:?}, expected ({paths}, {steps})",
                deflators.dim()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::scenario("non-finite factor value"));
        }
        if deflators.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return Err(ModelError::scenario("deflators must be positive and finite"));
        }
        Ok(Self {
            grid,
            factor_names,
            values,
            deflators,
        })
    }

    /// Exposure time grid.
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Factor names in state order.
    pub fn factor_names(&self) -> &[String] {
        &self.factor_names
    }

    /// Raw `[path, step, factor]` array.
    pub fn values(&self) -> &Array3<f64> {
        &self.values
    }

    /// Raw `[path, step]` deflators.
    pub fn deflators(&self) -> &Array2<f64> {
        &self.deflators
    }

    /// Number of paths.
    pub fn n_paths(&self) -> usize {
        self.values.len_of(Axis(0))
    }

    /// Number of time steps, including `t = 0`.
    pub fn n_steps(&self) -> usize {
        self.values.len_of(Axis(1))
    }

    /// Number of state coordinates.
    pub fn n_factors(&self) -> usize {
        self.values.len_of(Axis(2))
    }

    /// Full state of path `p` at step `s`.
    pub fn path_state(&self, p: usize, s: usize) -> Vec<f64> {
        self.values.slice(s![p, s, ..]).to_vec()
    }

    /// Full states of all paths at step `s`.
    pub fn step_rows(&self, s: usize) -> Vec<Vec<f64>> {
        self.values
            .index_axis(Axis(1), s)
            .outer_iter()
            .map(|row| row.to_vec())
            .collect()
    }

    /// Selected coordinates of all paths at step `s`.
    pub fn factor_rows(&self, s: usize, indices: &[usize]) -> Vec<Vec<f64>> {
        self.values
            .index_axis(Axis(1), s)
            .outer_iter()
            .map(|row| indices.iter().map(|&i| row[i]).collect())
            .collect()
    }

    /// Deflator of path `p` at step `s`.
    pub fn deflator(&self, p: usize, s: usize) -> f64 {
        self.deflators[[p, s]]
    }

    /// The first `n` paths.
    pub fn subset_paths(&self, n: usize) -> ModelResult<Self> {
        if n == 0 || n > self.n_paths() {
            return Err(ModelError::scenario(format!(
                "cannot take {n} of {} paths",
                self.n_paths()
            )));
        }
        Ok(Self {
            grid: self.grid.clone(),
            factor_names: self.factor_names.clone(),
            values: self.values.slice(s![..n, .., ..]).to_owned(),
            deflators: self.deflators.slice(s![..n, ..]).to_owned(),
        })
    }

    /// Checks that the factor names match a market layout.
    pub fn check_layout(&self, layout: &FactorLayout) -> ModelResult<()> {
        if self.factor_names.as_slice() != layout.names() {
            return Err(ModelError::scenario(format!(
                "factors {:?} do not match the market layout {:?}",
                self.factor_names,
                layout.names()
            )));
        }
        Ok(())
    }
}
