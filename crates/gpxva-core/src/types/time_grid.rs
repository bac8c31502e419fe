//! Exposure time grid.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Strictly increasing exposure dates in year fractions.
///
/// The first date is always the valuation date `t = 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct TimeGrid {
    times: Vec<f64>,
}

impl TimeGrid {
    /// Creates a grid of `steps` equal intervals over `[0, horizon]`.
    ///
    /// The grid has `steps + 1` points.
    pub fn uniform(horizon: f64, steps: usize) -> CoreResult<Self> {
        if steps == 0 {
            return Err(CoreError::invalid_grid("need at least one step"));
        }
        if !horizon.is_finite() || horizon <= 0.0 {
            return Err(CoreError::invalid_grid(format!(
                "horizon must be positive, got {horizon}"
            )));
        }
        let dt = horizon / steps as f64;
        let mut times: Vec<f64> = (0..steps).map(|i| i as f64 * dt).collect();
        times.push(horizon);
        Ok(Self { times })
    }

    /// Creates a grid from explicit times.
    pub fn from_times(times: Vec<f64>) -> CoreResult<Self> {
        let Some(&first) = times.first() else {
            return Err(CoreError::invalid_grid("no times"));
        };
        if first != 0.0 {
            return Err(CoreError::invalid_grid(format!(
                "grid must start at 0, got {first}"
            )));
        }
        if let Some(bad) = times.iter().find(|t| !t.is_finite()) {
            return Err(CoreError::invalid_grid(format!("non-finite time {bad}")));
        }
        for w in times.windows(2) {
            if w[1] <= w[0] {
                return Err(CoreError::invalid_grid(format!(
                    "times must be strictly increasing: {} then {}",
                    w[0], w[1]
                )));
            }
        }
        Ok(Self { times })
    }

    /// Number of grid points (including `t = 0`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always false for a constructed grid.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// All grid times.
    #[must_use]
    pub fn times(&self) -> &[f64] {
        &self.times
    }

    /// Time at index `i`.
    #[must_use]
    pub fn time(&self, i: usize) -> f64 {
        self.times[i]
    }

    /// Interval length `t_i - t_{i-1}`; zero at `i = 0`.
    #[must_use]
    pub fn dt(&self, i: usize) -> f64 {
        if i == 0 {
            0.0
        } else {
            self.times[i] - self.times[i - 1]
        }
    }

    /// Last grid time.
    #[must_use]
    pub fn horizon(&self) -> f64 {
        self.times.last().copied().unwrap_or(0.0)
    }

    /// Iterates over the grid times.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.times.iter().copied()
    }

    /// Returns true if `other` has the same times within `tolerance`.
    #[must_use]
    pub fn approx_eq(&self, other: &TimeGrid, tolerance: f64) -> bool {
        self.len() == other.len()
            && self
                .times
                .iter()
                .zip(&other.times)
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }
}

impl TryFrom<Vec<f64>> for TimeGrid {
    type Error = CoreError;

    fn try_from(times: Vec<f64>) -> Result<Self, Self::Error> {
        Self::from_times(times)
    }
}

impl From<TimeGrid> for Vec<f64> {
    fn from(grid: TimeGrid) -> Self {
        grid.times
    }
}
