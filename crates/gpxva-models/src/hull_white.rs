//! One-factor Hull-White short-rate model.
//!
//! `r(t) = x(t) + α(t)` where `dx = −a x dt + σ dW`, `x(0) = 0`, and the
//! deterministic shift `α` reproduces the initial zero curve.

use crate::curve::ZeroCurve;
use crate::error::{ModelError, ModelResult};

/// Mean reversion below which the `a → 0` limits are used.
const SMALL_MEAN_REVERSION: f64 = 1e-8;

/// Hull-White model fitted to a zero curve.
#[derive(Debug, Clone)]
pub struct HullWhite {
    mean_reversion: f64,
    volatility: f64,
    curve: ZeroCurve,
}

impl HullWhite {
    /// Creates a model with mean reversion `a` and volatility `sigma`.
    pub fn new(mean_reversion: f64, volatility: f64, curve: ZeroCurve) -> ModelResult<Self> {
        if !mean_reversion.is_finite() || mean_reversion < 0.0 {
            return Err(ModelError::invalid_parameter(
                "mean_reversion",
                format!("must be finite and non-negative, got {mean_reversion}"),
            ));
        }
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(ModelError::invalid_parameter(
                "volatility",
                format!("must be finite and non-negative, got {volatility}"),
            ));
        }
        Ok(Self {
            mean_reversion,
            volatility,
            curve,
        })
    }

    /// Mean reversion speed `a`.
    pub fn mean_reversion(&self) -> f64 {
        self.mean_reversion
    }

    /// Short-rate volatility `σ`.
    pub fn volatility(&self) -> f64 {
        self.volatility
    }

    /// Initial zero curve.
    pub fn curve(&self) -> &ZeroCurve {
        &self.curve
    }

    /// `(1 − e^{−a τ}) / a`, with limit `τ` as `a → 0`.
    fn decay_integral(&self, tau: f64) -> f64 {
        let a = self.mean_reversion;
        if a < SMALL_MEAN_REVERSION {
            tau
        } else {
            (1.0 - (-a * tau).exp()) / a
        }
    }

    /// Bond sensitivity `B(t, T)`.
    pub fn b(&self, t: f64, maturity: f64) -> f64 {
        self.decay_integral(maturity - t)
    }

    /// Deterministic shift `α(t)`.
    pub fn alpha(&self, t: f64) -> f64 {
        let half_b = self.decay_integral(t);
        self.curve.instantaneous_forward(t) + 0.5 * self.volatility.powi(2) * half_b * half_b
    }

    /// Short rate for OU state `x` at time `t`.
    pub fn short_rate(&self, x: f64, t: f64) -> f64 {
        x + self.alpha(t)
    }

    /// Zero-coupon bond price `P(t, T)` given the short rate `r(t)`.
    pub fn zcb_price(&self, t: f64, maturity: f64, r: f64) -> f64 {
        if maturity <= t {
            return 1.0;
        }
        let b = self.b(t, maturity);
        let p_t = self.curve.discount_factor(t);
        let p_big_t = self.curve.discount_factor(maturity);
        let a = self.mean_reversion;
        let var_term = if a < SMALL_MEAN_REVERSION {
            0.5 * self.volatility.powi(2) * t * b * b
        } else {
            self.volatility.powi(2) / (4.0 * a) * (1.0 - (-2.0 * a * t).exp()) * b * b
        };
        let ln_a = (p_big_t / p_t).ln() + b * self.curve.instantaneous_forward(t) - var_term;
        (ln_a - b * r).exp()
    }

    /// Standard deviation of `x(t + dt)` given `x(t)`.
    pub fn x_std(&self, dt: f64) -> f64 {
        let a = self.mean_reversion;
        if a < SMALL_MEAN_REVERSION {
            self.volatility * dt.sqrt()
        } else {
            self.volatility * ((1.0 - (-2.0 * a * dt).exp()) / (2.0 * a)).sqrt()
        }
    }

    /// Exact OU transition of `x` over `dt` with standard normal `z`.
    ///
    /// `drift` is a constant extra drift on `dx` (the quanto adjustment for
    /// foreign rates simulated under the domestic measure).
    pub fn x_step(&self, x: f64, dt: f64, z: f64, drift: f64) -> f64 {
        let decay = (-self.mean_reversion * dt).exp();
        x * decay + drift * self.decay_integral(dt) + self.x_std(dt) * z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn model() -> HullWhite {
        let curve = ZeroCurve::new(vec![1.0, 5.0, 10.0], vec![0.02, 0.025, 0.03]).unwrap();
        HullWhite::new(0.05, 0.01, curve).unwrap()
    }

    #[test]
    fn test_zcb_reprices_initial_curve() {
        let hw = model();
        let r0 = hw.short_rate(0.0, 0.0);
        for &t in &[0.5, 2.0, 7.0, 10.0] {
            assert_relative_eq!(
                hw.zcb_price(0.0, t, r0),
                hw.curve().discount_factor(t),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_zcb_decreasing_in_rate() {
        let hw = model();
        let low = hw.zcb_price(2.0, 5.0, 0.01);
        let high = hw.zcb_price(2.0, 5.0, 0.05);
        assert!(low > high);
        assert_relative_eq!(hw.zcb_price(3.0, 3.0, 0.04), 1.0);
    }

    #[test]
    fn test_b_limits() {
        let curve = ZeroCurve::flat(0.03).unwrap();
        let hw0 = HullWhite::new(0.0, 0.01, curve).unwrap();
        assert_relative_eq!(hw0.b(1.0, 4.0), 3.0);
        let hw = model();
        assert_relative_eq!(hw.b(1.0, 4.0), (1.0 - (-0.15f64).exp()) / 0.05, epsilon = 1e-14);
    }

    #[test]
    fn test_price_at_zero_state_near_forward() {
        // Differs from the forward bond price only by convexity terms in σ²
        let hw = model();
        let t = 2.0;
        let big_t = 6.0;
        let fwd = hw.curve().discount_factor(big_t) / hw.curve().discount_factor(t);
        let p = hw.zcb_price(t, big_t, hw.short_rate(0.0, t));
        assert_relative_eq!(p, fwd, max_relative = 5e-3);
        assert!(p < fwd);
    }

    #[test]
    fn test_x_step_moments() {
        let hw = model();
        assert_relative_eq!(hw.x_step(0.01, 0.25, 0.0, 0.0), 0.01 * (-0.0125f64).exp());
        let expected = 0.01 * ((1.0 - (-2.0f64 * 0.05 * 0.25).exp()) / 0.1).sqrt();
        assert_relative_eq!(hw.x_std(0.25), expected, epsilon = 1e-15);
    }

    #[test]
    fn test_rejects_negative_params() {
        let curve = ZeroCurve::flat(0.03).unwrap();
        assert!(HullWhite::new(-0.1, 0.01, curve.clone()).is_err());
        assert!(HullWhite::new(0.1, -0.01, curve).is_err());
    }
}
