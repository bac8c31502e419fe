//! Counterparty credit curves.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Piecewise-flat hazard rate curve.
///
/// `hazards[i]` applies on `(times[i-1], times[i]]`; the last hazard
/// extends beyond the final knot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditCurve {
    times: Vec<f64>,
    hazards: Vec<f64>,
}

impl CreditCurve {
    /// Constant hazard rate.
    pub fn flat(hazard: f64) -> ModelResult<Self> {
        Self::piecewise(vec![1.0], vec![hazard])
    }

    /// Flat hazard implied by a CDS spread: `λ = s / (1 − R)`.
    pub fn from_cds_spread(spread: f64, recovery: f64) -> ModelResult<Self> {
        if !(0.0..1.0).contains(&recovery) {
            return Err(ModelError::invalid_parameter(
                "recovery",
                format!("must be in [0, 1), got {recovery}"),
            ));
        }
        Self::flat(spread / (1.0 - recovery))
    }

    /// Piecewise-flat hazards ending at `times`.
    pub fn piecewise(times: Vec<f64>, hazards: Vec<f64>) -> ModelResult<Self> {
        if times.is_empty() || times.len() != hazards.len() {
            return Err(ModelError::invalid_parameter(
                "hazards",
                format!(
                    "need matching non-empty times and hazards, got {} and {}",
                    times.len(),
                    hazards.len()
                ),
            ));
        }
        if times[0] <= 0.0 || times.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ModelError::invalid_parameter(
                "times",
                "must be positive and strictly increasing",
            ));
        }
        if let Some(h) = hazards.iter().find(|h| !h.is_finite() || **h < 0.0) {
            return Err(ModelError::invalid_parameter(
                "hazards",
                format!("must be finite and non-negative, got {h}"),
            ));
        }
        Ok(Self { times, hazards })
    }

    /// Hazard rate in force at `t`.
    pub fn hazard_rate(&self, t: f64) -> f64 {
        let i = self.times.partition_point(|&k| k < t);
        self.hazards[i.min(self.hazards.len() - 1)]
    }

    /// Integrated hazard `∫₀ᵗ λ(s) ds`.
    fn cumulative_hazard(&self, t: f64) -> f64 {
        if t <= 0.0 {
            return 0.0;
        }
        let mut total = 0.0;
        let mut prev = 0.0;
        for (&knot, &h) in self.times.iter().zip(&self.hazards) {
            if t <= knot {
                return total + h * (t - prev);
            }
            total += h * (knot - prev);
            prev = knot;
        }
        total + self.hazards[self.hazards.len() - 1] * (t - prev)
    }

    /// Survival probability `S(t)`.
    pub fn survival(&self, t: f64) -> f64 {
        (-self.cumulative_hazard(t)).exp()
    }

    /// Probability of default in `(t1, t2]`: `S(t1) − S(t2)`.
    pub fn default_probability(&self, t1: f64, t2: f64) -> f64 {
        if t2 <= t1 {
            return 0.0;
        }
        (self.survival(t1) - self.survival(t2)).max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_hazard() {
        let c = CreditCurve::flat(0.02).unwrap();
        assert_relative_eq!(c.survival(5.0), (-0.1f64).exp(), epsilon = 1e-14);
        assert_relative_eq!(
            c.default_probability(1.0, 2.0),
            (-0.02f64).exp() - (-0.04f64).exp(),
            epsilon = 1e-14
        );
        assert_relative_eq!(c.default_probability(2.0, 1.0), 0.0);
    }

    #[test]
    fn test_from_cds_spread() {
        let c = CreditCurve::from_cds_spread(0.012, 0.4).unwrap();
        assert_relative_eq!(c.hazard_rate(3.0), 0.02, epsilon = 1e-14);
        assert!(CreditCurve::from_cds_spread(0.01, 1.0).is_err());
    }

    #[test]
    fn test_piecewise() {
        let c = CreditCurve::piecewise(vec![1.0, 3.0], vec![0.01, 0.03]).unwrap();
        assert_relative_eq!(c.hazard_rate(0.5), 0.01);
        assert_relative_eq!(c.hazard_rate(2.0), 0.03);
        assert_relative_eq!(c.hazard_rate(10.0), 0.03);
        assert_relative_eq!(c.survival(3.0), (-(0.01 + 0.06f64)).exp(), epsilon = 1e-14);
        assert_relative_eq!(c.survival(4.0), (-(0.01 + 0.06 + 0.03f64)).exp(), epsilon = 1e-14);
    }

    #[test]
    fn test_invalid() {
        assert!(CreditCurve::piecewise(vec![], vec![]).is_err());
        assert!(CreditCurve::piecewise(vec![2.0, 1.0], vec![0.01, 0.01]).is_err());
        assert!(CreditCurve::flat(-0.01).is_err());
    }
}
