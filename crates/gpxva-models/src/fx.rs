//! Lognormal FX spot model.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// FX spot quoted in domestic units per unit of foreign currency.
///
/// Under the domestic risk-neutral measure the spot drifts at `r_d − r_f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FxModel {
    /// Spot at the valuation date.
    pub spot: f64,
    /// Lognormal volatility.
    pub volatility: f64,
}

impl FxModel {
    /// Creates an FX model.
    pub fn new(spot: f64, volatility: f64) -> ModelResult<Self> {
        if !spot.is_finite() || spot <= 0.0 {
            return Err(ModelError::invalid_parameter(
                "spot",
                format!("must be positive, got {spot}"),
            ));
        }
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(ModelError::invalid_parameter(
                "volatility",
                format!("must be non-negative, got {volatility}"),
            ));
        }
        Ok(Self { spot, volatility })
    }

    /// Log-Euler step over `dt` using rates fixed at the start of the interval.
    pub fn step(&self, fx: f64, r_domestic: f64, r_foreign: f64, dt: f64, z: f64) -> f64 {
        let drift = (r_domestic - r_foreign - 0.5 * self.volatility * self.volatility) * dt;
        fx * (drift + self.volatility * dt.sqrt() * z).exp()
    }
}
