//! Unilateral CVA from an exposure profile.
//!
//! ```text
//! CVA = (1 − R) Σ_{k=1}^{n} ½ (EPE_{k−1} + EPE_k) · PD(t_{k−1}, t_k)
//! ```
//!
//! with EPE already discounted. The CVA error bar treats the per-date EPE
//! errors as independent: `σ_CVA = sqrt(Σ_j w_j² σ_j²)` where `w_j` is the
//! total trapezoid weight on `EPE_j`.

use gpxva_math::statistics::normal_quantile;
use gpxva_models::credit::CreditCurve;
use serde::{Deserialize, Serialize};

use crate::error::{ExposureError, ExposureResult};
use crate::profile::ExposureProfile;

/// CVA value with a symmetric confidence band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CvaEstimate {
    /// Point estimate.
    pub value: f64,
    /// Standard deviation from the EPE error bars.
    pub std_dev: f64,
    /// Lower band edge.
    pub lower: f64,
    /// Upper band edge.
    pub upper: f64,
    /// Two-sided confidence of the band.
    pub confidence: f64,
}

impl CvaEstimate {
    /// Whether `value` lies inside the band.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Integrates exposure against counterparty default probabilities.
#[derive(Debug, Clone)]
pub struct CvaCalculator {
    recovery: f64,
    credit: CreditCurve,
    confidence: f64,
}

impl CvaCalculator {
    /// Creates a calculator with a 95% band.
    pub fn new(recovery: f64, credit: CreditCurve) -> ExposureResult<Self> {
        if !(0.0..1.0).contains(&recovery) {
            return Err(ExposureError::Validation {
                field: "credit.recovery".into(),
                message: format!("must be in [0, 1), got {recovery}"),
            });
        }
        Ok(Self {
            recovery,
            credit,
            confidence: 0.95,
        })
    }

    /// Sets the two-sided confidence of the band.
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// Recovery rate.
    pub fn recovery(&self) -> f64 {
        self.recovery
    }

    /// Counterparty credit curve.
    pub fn credit(&self) -> &CreditCurve {
        &self.credit
    }

    /// Trapezoid weight on each EPE point, loss given default included.
    pub fn weights(&self, times: &[f64]) -> Vec<f64> {
        let lgd = 1.0 - self.recovery;
        let mut w = vec![0.0; times.len()];
        for k in 1..times.len() {
            let half = 0.5 * lgd * self.credit.default_probability(times[k - 1], times[k]);
            w[k - 1] += half;
            w[k] += half;
        }
        w
    }

    /// CVA and its band from a profile's EPE and total error bars.
    pub fn compute(&self, profile: &ExposureProfile) -> ExposureResult<CvaEstimate> {
        let weights = self.weights(&profile.times);
        let value: f64 = weights.iter().zip(&profile.epe).map(|(w, e)| w * e).sum();
        let variance: f64 = weights
            .iter()
            .zip(&profile.total_std)
            .map(|(w, s)| (w * s).powi(2))
            .sum();
        let std_dev = variance.sqrt();
        let z = normal_quantile(0.5 + 0.5 * self.confidence)?;
        Ok(CvaEstimate {
            value,
            std_dev,
            lower: value - z * std_dev,
            upper: value + z * std_dev,
            confidence: self.confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn profile(epe: Vec<f64>, std: Vec<f64>) -> ExposureProfile {
        let n = epe.len();
        ExposureProfile {
            times: (0..n).map(|k| k as f64 * 0.5).collect(),
            epe,
            ene: vec![0.0; n],
            pfe: vec![0.0; n],
            mc_std_error: std.clone(),
            gp_std: vec![0.0; n],
            total_std: std,
        }
    }

    #[test]
    fn test_flat_exposure() {
        // Constant EPE: CVA = LGD · EPE · PD(0, T)
        let credit = CreditCurve::flat(0.02).unwrap();
        let calc = CvaCalculator::new(0.4, credit.clone()).unwrap();
        let est = calc.compute(&profile(vec![100.0; 5], vec![0.0; 5])).unwrap();
        let expected = 0.6 * 100.0 * credit.default_probability(0.0, 2.0);
        assert_relative_eq!(est.value, expected, epsilon = 1e-10);
        assert_relative_eq!(est.std_dev, 0.0);
        assert!(est.contains(expected));
    }

    #[test]
    fn test_trapezoid_weights() {
        let credit = CreditCurve::flat(0.05).unwrap();
        let calc = CvaCalculator::new(0.0, credit.clone()).unwrap();
        let w = calc.weights(&[0.0, 1.0, 3.0]);
        assert_relative_eq!(w[0], 0.5 * credit.default_probability(0.0, 1.0));
        assert_relative_eq!(
            w[1],
            0.5 * (credit.default_probability(0.0, 1.0) + credit.default_probability(1.0, 3.0)),
            epsilon = 1e-15
        );
        assert_relative_eq!(w[2], 0.5 * credit.default_probability(1.0, 3.0));
    }

    #[test]
    fn test_band() {
        let calc = CvaCalculator::new(0.4, CreditCurve::flat(0.02).unwrap())
            .unwrap()
            .with_confidence(0.95);
        let p = profile(vec![0.0, 50.0, 80.0], vec![0.0, 2.0, 3.0]);
        let est = calc.compute(&p).unwrap();
        let w = calc.weights(&p.times);
        let sd = ((w[1] * 2.0).powi(2) + (w[2] * 3.0).powi(2)).sqrt();
        assert_relative_eq!(est.std_dev, sd, epsilon = 1e-12);
        assert_relative_eq!(est.upper - est.value, 1.959_963_984_540_054 * sd, epsilon = 1e-9);
        assert!(est.lower < est.value && est.value < est.upper);
    }

    #[test]
    fn test_zero_exposure() {
        let calc = CvaCalculator::new(0.4, CreditCurve::flat(0.02).unwrap()).unwrap();
        let est = calc.compute(&profile(vec![0.0; 4], vec![0.0; 4])).unwrap();
        assert_relative_eq!(est.value, 0.0);
    }

    #[test]
    fn test_invalid_recovery() {
        assert!(CvaCalculator::new(1.0, CreditCurve::flat(0.02).unwrap()).is_err());
    }
}
