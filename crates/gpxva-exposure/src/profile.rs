//! Exposure profiles with error bars.
//!
//! For path `p` and date `s` the netting-set value is `V = Σ_i v_i`. EPE is
//! the (optionally discounted) mean of `max(V, 0)` over paths. Two error
//! sources are tracked per date:
//!
//! - Monte Carlo: the standard error of the EPE sample mean.
//! - Surrogate: instrument predictive variances are summed (errors
//!   independent across instruments) and pushed through `max(V, 0)` by the
//!   delta method, giving `sqrt(Σ_p 1{V>0} D² Var_p) / N`.

use gpxva_math::statistics::{mean, quantile, std_error};
use gpxva_models::scenario::ScenarioSet;
use serde::{Deserialize, Serialize};

use crate::error::{ExposureError, ExposureResult};
use crate::pricer::PriceCube;

/// Profile settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    /// PFE confidence level.
    pub pfe_level: f64,
    /// Multiply exposures by the path deflator.
    pub discounted: bool,
    /// Include surrogate variance in the error bars.
    pub propagate_variance: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            pfe_level: 0.95,
            discounted: true,
            propagate_variance: true,
        }
    }
}

/// Exposure statistics per date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureProfile {
    /// Exposure dates.
    pub times: Vec<f64>,
    /// Expected positive exposure.
    pub epe: Vec<f64>,
    /// Expected negative exposure (non-positive).
    pub ene: Vec<f64>,
    /// Potential future exposure (undiscounted quantile of `max(V, 0)`).
    pub pfe: Vec<f64>,
    /// Monte Carlo standard error of EPE.
    pub mc_std_error: Vec<f64>,
    /// EPE standard deviation from surrogate variance.
    pub gp_std: Vec<f64>,
    /// `sqrt(mc² + gp²)`.
    pub total_std: Vec<f64>,
}

impl ExposureProfile {
    /// Aggregates a price cube into a profile.
    pub fn from_cube(
        cube: &PriceCube,
        scenarios: &ScenarioSet,
        config: &ProfileConfig,
    ) -> ExposureResult<Self> {
        if cube.n_paths() != scenarios.n_paths() || cube.n_steps() != scenarios.n_steps() {
            return Err(ExposureError::shape(format!(
                "cube has {} paths x {} steps, scenarios {} x {}",
                cube.n_paths(),
                cube.n_steps(),
                scenarios.n_paths(),
                scenarios.n_steps()
            )));
        }
        let values = cube.portfolio_values();
        let variances = if config.propagate_variance {
            cube.portfolio_variance()
        } else {
            None
        };
        let n_paths = cube.n_paths();
        let n_steps = cube.n_steps();

        let mut profile = Self {
            times: scenarios.grid().times().to_vec(),
            epe: Vec::with_capacity(n_steps),
            ene: Vec::with_capacity(n_steps),
            pfe: Vec::with_capacity(n_steps),
            mc_std_error: Vec::with_capacity(n_steps),
            gp_std: Vec::with_capacity(n_steps),
            total_std: Vec::with_capacity(n_steps),
        };

        let mut positive = vec![0.0; n_paths];
        let mut negative = vec![0.0; n_paths];
        let mut raw_positive = vec![0.0; n_paths];
        for s in 0..n_steps {
            let mut propagated = 0.0;
            for p in 0..n_paths {
                let v = values[[p, s]];
                let d = if config.discounted {
                    scenarios.deflator(p, s)
                } else {
                    1.0
                };
                positive[p] = d * v.max(0.0);
                negative[p] = d * v.min(0.0);
                raw_positive[p] = v.max(0.0);
                if let Some(var) = &variances {
                    if v > 0.0 {
                        propagated += d * d * var[[p, s]];
                    }
                }
            }
            let mc = std_error(&positive);
            let gp = propagated.sqrt() / n_paths as f64;
            profile.epe.push(mean(&positive));
            profile.ene.push(mean(&negative));
            profile.pfe.push(quantile(&raw_positive, config.pfe_level)?);
            profile.mc_std_error.push(mc);
            profile.gp_std.push(gp);
            profile.total_std.push(mc.hypot(gp));
        }
        Ok(profile)
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Whether the profile has no dates.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Largest EPE and its date.
    pub fn peak_epe(&self) -> (f64, f64) {
        self.epe
            .iter()
            .zip(&self.times)
            .fold((0.0, 0.0), |best, (&e, &t)| if e > best.0 { (e, t) } else { best })
    }

    /// Time-averaged EPE over the horizon (trapezoid rule).
    pub fn average_epe(&self) -> f64 {
        let horizon = self.times.last().copied().unwrap_or(0.0);
        if horizon <= 0.0 {
            return 0.0;
        }
        let area: f64 = self
            .times
            .windows(2)
            .zip(self.epe.windows(2))
            .map(|(t, e)| 0.5 * (e[0] + e[1]) * (t[1] - t[0]))
            .sum();
        area / horizon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use gpxva_core::TimeGrid;
    use ndarray::{Array2, Array3};

    fn scenarios(deflator: f64) -> ScenarioSet {
        let grid = TimeGrid::uniform(1.0, 1).unwrap();
        let values = Array3::zeros((4, 2, 1));
        let mut deflators = Array2::from_elem((4, 2), deflator);
        deflators.column_mut(0).fill(1.0);
        ScenarioSet::new(grid, vec!["r_USD".into()], values, deflators).unwrap()
    }

    fn cube(variance: Option<f64>) -> PriceCube {
        // Two instruments; portfolio values at step 1: 30, -10, 5, 0
        let mut mean = Array3::zeros((2, 4, 2));
        for (p, (a, b)) in [(20.0, 10.0), (-20.0, 10.0), (5.0, 0.0), (1.0, -1.0)]
            .into_iter()
            .enumerate()
        {
            mean[[0, p, 1]] = a;
            mean[[1, p, 1]] = b;
        }
        PriceCube {
            mean,
            variance: variance.map(|v| Array3::from_elem((2, 4, 2), v)),
            clipping: None,
            seconds: 0.0,
        }
    }

    #[test]
    fn test_epe_ene() {
        let config = ProfileConfig {
            discounted: false,
            ..ProfileConfig::default()
        };
        let profile = ExposureProfile::from_cube(&cube(None), &scenarios(0.9), &config).unwrap();
        assert_relative_eq!(profile.epe[0], 0.0);
        assert_relative_eq!(profile.epe[1], 35.0 / 4.0);
        assert_relative_eq!(profile.ene[1], -10.0 / 4.0);
        assert_relative_eq!(profile.gp_std[1], 0.0);
        assert_relative_eq!(profile.total_std[1], profile.mc_std_error[1]);
    }

    #[test]
    fn test_discounting() {
        let profile =
            ExposureProfile::from_cube(&cube(None), &scenarios(0.9), &ProfileConfig::default())
                .unwrap();
        assert_relative_eq!(profile.epe[1], 0.9 * 35.0 / 4.0, epsilon = 1e-12);
        // PFE stays undiscounted
        let expected_pfe = quantile(&[30.0, 0.0, 5.0, 0.0], 0.95).unwrap();
        assert_relative_eq!(profile.pfe[1], expected_pfe);
    }

    #[test]
    fn test_variance_propagation() {
        let config = ProfileConfig {
            discounted: false,
            ..ProfileConfig::default()
        };
        let profile =
            ExposureProfile::from_cube(&cube(Some(4.0)), &scenarios(1.0), &config).unwrap();
        // Paths with V > 0: 30 and 5, each with portfolio variance 2 * 4
        assert_relative_eq!(profile.gp_std[1], (16.0f64).sqrt() / 4.0, epsilon = 1e-12);
        assert_relative_eq!(
            profile.total_std[1],
            (profile.mc_std_error[1].powi(2) + 1.0).sqrt(),
            epsilon = 1e-12
        );

        let off = ProfileConfig {
            propagate_variance: false,
            ..config
        };
        let profile = ExposureProfile::from_cube(&cube(Some(4.0)), &scenarios(1.0), &off).unwrap();
        assert_relative_eq!(profile.gp_std[1], 0.0);
    }

    #[test]
    fn test_summary_measures() {
        let profile = ExposureProfile {
            times: vec![0.0, 1.0, 2.0],
            epe: vec![0.0, 4.0, 2.0],
            ene: vec![0.0; 3],
            pfe: vec![0.0; 3],
            mc_std_error: vec![0.0; 3],
            gp_std: vec![0.0; 3],
            total_std: vec![0.0; 3],
        };
        assert_eq!(profile.peak_epe(), (4.0, 1.0));
        assert_relative_eq!(profile.average_epe(), (2.0 + 3.0) / 2.0);
    }

    #[test]
    fn test_shape_mismatch() {
        let grid = TimeGrid::uniform(1.0, 2).unwrap();
        let sc = ScenarioSet::new(
            grid,
            vec!["r_USD".into()],
            Array3::zeros((4, 3, 1)),
            Array2::from_elem((4, 3), 1.0),
        )
        .unwrap();
        assert!(ExposureProfile::from_cube(&cube(None), &sc, &ProfileConfig::default()).is_err());
    }
}
