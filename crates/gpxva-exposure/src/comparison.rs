//! Surrogate run versus analytical run.

use serde::{Deserialize, Serialize};

use crate::cva::CvaEstimate;
use crate::error::{ExposureError, ExposureResult};
use crate::pricer::ClippingStats;
use crate::profile::ExposureProfile;

/// EPE below this is treated as zero when forming relative errors.
const EPE_FLOOR: f64 = 1e-12;

/// Output of one pricer on a scenario set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Pricer label.
    pub pricer: String,
    /// Exposure profile.
    pub profile: ExposureProfile,
    /// CVA with band.
    pub cva: CvaEstimate,
    /// Time spent pricing the cube.
    pub pricing_seconds: f64,
    /// Time spent training surrogates, if any.
    pub training_seconds: Option<f64>,
    /// Domain clipping, if any.
    pub clipping: Option<ClippingStats>,
}

/// Date-by-date and headline differences between two runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    /// Exposure dates.
    pub times: Vec<f64>,
    /// `EPE_surrogate − EPE_analytical`.
    pub epe_diff: Vec<f64>,
    /// `|diff| / EPE_analytical`, zero where the analytical EPE vanishes.
    pub epe_rel_error: Vec<f64>,
    /// Analytical EPE inside the surrogate's total confidence band.
    pub within_band: Vec<bool>,
    /// Share of dates inside the total band.
    pub band_coverage: f64,
    /// Analytical EPE inside the band from GP variance alone. Both runs share
    /// paths, so Monte Carlo noise largely cancels in `epe_diff`.
    pub within_gp_band: Vec<bool>,
    /// Share of dates inside the GP-only band.
    pub gp_band_coverage: f64,
    /// Largest `|diff|`.
    pub max_abs_epe_error: f64,
    /// `CVA_surrogate − CVA_analytical`.
    pub cva_diff: f64,
    /// `|cva_diff| / CVA_analytical`.
    pub cva_rel_error: f64,
    /// Analytical CVA inside the surrogate CVA band.
    pub cva_within_band: bool,
    /// Analytical pricing time.
    pub analytical_seconds: f64,
    /// Surrogate pricing time.
    pub surrogate_seconds: f64,
    /// Surrogate training time.
    pub training_seconds: f64,
    /// Share of surrogate evaluations clipped to the training domain.
    pub clipping_ratio: f64,
}

impl Comparison {
    /// Compares runs on the same dates. `z` scales the surrogate's per-date
    /// standard deviations into bands.
    pub fn new(analytical: &RunResult, surrogate: &RunResult, z: f64) -> ExposureResult<Self> {
        let a = &analytical.profile;
        let s = &surrogate.profile;
        if a.times != s.times {
            return Err(ExposureError::shape(format!(
                "runs have {} and {} dates",
                a.len(),
                s.len()
            )));
        }

        let epe_diff: Vec<f64> = s.epe.iter().zip(&a.epe).map(|(s, a)| s - a).collect();
        let epe_rel_error = epe_diff
            .iter()
            .zip(&a.epe)
            .map(|(d, a)| if a.abs() > EPE_FLOOR { d.abs() / a.abs() } else { 0.0 })
            .collect();
        let within = |std: &[f64]| -> Vec<bool> {
            epe_diff
                .iter()
                .zip(std)
                .map(|(d, sd)| d.abs() <= z * sd + EPE_FLOOR)
                .collect()
        };
        let within_band = within(&s.total_std);
        let within_gp_band = within(&s.gp_std);
        let band_coverage = coverage(&within_band);
        let gp_band_coverage = coverage(&within_gp_band);
        let max_abs_epe_error = epe_diff.iter().fold(0.0, |m: f64, d| m.max(d.abs()));

        let cva_diff = surrogate.cva.value - analytical.cva.value;
        let cva_rel_error = if analytical.cva.value.abs() > EPE_FLOOR {
            cva_diff.abs() / analytical.cva.value.abs()
        } else {
            0.0
        };

        Ok(Self {
            times: a.times.clone(),
            epe_diff,
            epe_rel_error,
            within_band,
            band_coverage,
            within_gp_band,
            gp_band_coverage,
            max_abs_epe_error,
            cva_diff,
            cva_rel_error,
            cva_within_band: surrogate.cva.contains(analytical.cva.value),
            analytical_seconds: analytical.pricing_seconds,
            surrogate_seconds: surrogate.pricing_seconds,
            training_seconds: surrogate.training_seconds.unwrap_or(0.0),
            clipping_ratio: surrogate.clipping.as_ref().map_or(0.0, ClippingStats::ratio),
        })
    }
}

fn coverage(flags: &[bool]) -> f64 {
    if flags.is_empty() {
        0.0
    } else {
        flags.iter().filter(|b| **b).count() as f64 / flags.len() as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn run(name: &str, epe: Vec<f64>, std: Vec<f64>, cva: f64, cva_sd: f64) -> RunResult {
        let n = epe.len();
        RunResult {
            pricer: name.into(),
            profile: ExposureProfile {
                times: (0..n).map(|k| k as f64).collect(),
                epe,
                ene: vec![0.0; n],
                pfe: vec![0.0; n],
                mc_std_error: std.clone(),
                gp_std: vec![0.0; n],
                total_std: std,
            },
            cva: CvaEstimate {
                value: cva,
                std_dev: cva_sd,
                lower: cva - 2.0 * cva_sd,
                upper: cva + 2.0 * cva_sd,
                confidence: 0.95,
            },
            pricing_seconds: 1.0,
            training_seconds: None,
            clipping: None,
        }
    }

    #[test]
    fn test_differences() {
        let a = run("analytical", vec![0.0, 10.0, 20.0], vec![0.0; 3], 5.0, 0.1);
        let mut s = run("surrogate", vec![0.0, 11.0, 19.0], vec![0.0, 0.2, 1.0], 5.2, 0.2);
        s.training_seconds = Some(3.0);
        s.clipping = Some(ClippingStats {
            clipped: vec![0, 1, 1],
            total: vec![10, 10, 10],
        });

        let c = Comparison::new(&a, &s, 2.0).unwrap();
        assert_eq!(c.epe_diff, vec![0.0, 1.0, -1.0]);
        assert_relative_eq!(c.epe_rel_error[1], 0.1);
        assert_relative_eq!(c.epe_rel_error[0], 0.0);
        assert_eq!(c.within_band, vec![true, false, true]);
        assert_relative_eq!(c.band_coverage, 2.0 / 3.0);
        // No GP variance, so only the exact date sits in the GP band
        assert_eq!(c.within_gp_band, vec![true, false, false]);
        assert_relative_eq!(c.gp_band_coverage, 1.0 / 3.0);
        assert_relative_eq!(c.max_abs_epe_error, 1.0);
        assert_relative_eq!(c.cva_diff, 0.2, epsilon = 1e-12);
        assert_relative_eq!(c.cva_rel_error, 0.04, epsilon = 1e-12);
        assert!(c.cva_within_band);
        assert_relative_eq!(c.training_seconds, 3.0);
        assert_relative_eq!(c.clipping_ratio, 2.0 / 30.0);
    }

    #[test]
    fn test_gp_band_excludes_monte_carlo_noise() {
        let a = run("analytical", vec![10.0, 20.0], vec![5.0; 2], 5.0, 0.1);
        let mut s = run("surrogate", vec![12.0, 20.5], vec![5.0; 2], 5.0, 0.1);
        s.profile.gp_std = vec![0.5, 0.5];

        let c = Comparison::new(&a, &s, 2.0).unwrap();
        assert_eq!(c.within_band, vec![true, true]);
        assert_eq!(c.within_gp_band, vec![false, true]);
        assert_relative_eq!(c.band_coverage, 1.0);
        assert_relative_eq!(c.gp_band_coverage, 0.5);
        assert_relative_eq!(Comparison::new(&a, &a, 2.0).unwrap().gp_band_coverage, 1.0);
    }

    #[test]
    fn test_mismatched_dates() {
        let a = run("analytical", vec![0.0, 1.0], vec![0.0; 2], 1.0, 0.0);
        let s = run("surrogate", vec![0.0, 1.0, 2.0], vec![0.0; 3], 1.0, 0.0);
        assert!(Comparison::new(&a, &s, 2.0).is_err());
    }
}
