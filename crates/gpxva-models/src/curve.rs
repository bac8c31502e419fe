//! Zero-rate curves.

use gpxva_math::interpolation::{Extrapolation, Interpolator, LinearInterpolator};

use crate::error::{ModelError, ModelResult};

/// Continuously compounded zero curve.
///
/// Zero rates are linear between pillars and flat beyond the first and
/// last pillar.
#[derive(Debug, Clone)]
pub struct ZeroCurve {
    interp: LinearInterpolator,
}

impl ZeroCurve {
    /// A flat curve at `rate`.
    pub fn flat(rate: f64) -> ModelResult<Self> {
        Self::new(vec![1.0], vec![rate])
    }

    /// A curve through `(tenor, zero rate)` pillars.
    pub fn new(tenors: Vec<f64>, rates: Vec<f64>) -> ModelResult<Self> {
        if let Some(t) = tenors.iter().find(|t| **t <= 0.0) {
            return Err(ModelError::invalid_parameter(
                "tenors",
                format!("pillar tenors must be positive, got {t}"),
            ));
        }
        let interp =
            LinearInterpolator::new(tenors, rates)?.with_extrapolation(Extrapolation::Flat);
        Ok(Self { interp })
    }

    /// Pillar tenors.
    pub fn tenors(&self) -> &[f64] {
        self.interp.xs()
    }

    /// Pillar zero rates.
    pub fn rates(&self) -> &[f64] {
        self.interp.ys()
    }

    /// Zero rate `z(t)`.
    pub fn zero_rate(&self, t: f64) -> f64 {
        self.interp
            .interpolate(t)
            .unwrap_or_else(|_| self.rates()[self.rates().len() - 1])
    }

    /// Discount factor `exp(−z(t) t)`.
    pub fn discount_factor(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 1.0;
        }
        (-self.zero_rate(t) * t).exp()
    }

    /// Instantaneous forward `f(0, t) = z(t) + t z'(t)`.
    pub fn instantaneous_forward(&self, t: f64) -> f64 {
        let slope = self.interp.derivative(t).unwrap_or(0.0);
        self.zero_rate(t) + t.max(0.0) * slope
    }
}
