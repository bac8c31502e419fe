//! Sample statistics for Monte Carlo aggregation.
//!
//! Exposure profiles need means, standard errors and tail quantiles of
//! simulated portfolio values; GP error bars need normal quantiles.

use statrs::distribution::{ContinuousCDF, Normal};

use crate::error::{MathError, MathResult};

/// Arithmetic mean. Returns 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Unbiased sample variance (n − 1 denominator). Returns 0 below two values.
pub fn variance(values: &[f64]) -> f64 {
    let mut moments = Moments::new();
    for &v in values {
        moments.push(v);
    }
    moments.variance()
}

/// Standard error of the sample mean, `sd / sqrt(n)`.
pub fn std_error(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    (variance(values) / values.len() as f64).sqrt()
}

/// Empirical quantile with linear interpolation between order statistics.
///
/// For `n` sorted values the quantile at `p` sits at position `p (n − 1)`,
/// which is the default definition in most statistics packages.
pub fn quantile(values: &[f64], p: f64) -> MathResult<f64> {
    if values.is_empty() {
        return Err(MathError::insufficient_data(1, 0));
    }
    if !(0.0..=1.0).contains(&p) {
        return Err(MathError::invalid_input(format!(
            "quantile level {p} outside [0, 1]"
        )));
    }
    if values.iter().any(|v| v.is_nan()) {
        return Err(MathError::non_finite("quantile input"));
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(quantile_sorted(&sorted, p))
}

/// Quantile of an already sorted, NaN-free slice.
pub(crate) fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let position = p * (n - 1) as f64;
    let lower = position.floor() as usize;
    let upper = (lower + 1).min(n - 1);
    let frac = position - lower as f64;
    sorted[lower] + frac * (sorted[upper] - sorted[lower])
}

/// Standard normal quantile `Φ⁻¹(p)`.
pub fn normal_quantile(p: f64) -> MathResult<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(MathError::invalid_input(format!(
            "normal quantile level {p} outside (0, 1)"
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| MathError::invalid_input(e.to_string()))?;
    Ok(normal.inverse_cdf(p))
}

/// Streaming mean and variance (Welford's algorithm).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Moments {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one observation.
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Number of observations.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Running mean.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Unbiased variance; 0 below two observations.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).max(0.0)
        }
    }

    /// Standard error of the mean.
    pub fn std_error(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.variance() / self.count as f64).sqrt()
        }
    }

    /// Combines two accumulators (Chan et al. parallel update).
    #[must_use]
    pub fn merge(&self, other: &Moments) -> Moments {
        if self.count == 0 {
            return *other;
        }
        if other.count == 0 {
            return *self;
        }
        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        let mean = self.mean + delta * other.count as f64 / count as f64;
        let m2 = self.m2
            + other.m2
            + delta * delta * self.count as f64 * other.count as f64 / count as f64;
        Moments { count, mean, m2 }
    }
}
