//! Stationary covariance kernels.

use serde::{Deserialize, Serialize};

use crate::error::{MathError, MathResult};

/// Covariance function family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Kernel {
    /// `σ² exp(−r²/2)`
    #[default]
    SquaredExponential,
    /// Matérn ν = 5/2: `σ² (1 + √5 r + 5r²/3) exp(−√5 r)`
    Matern52,
}

/// Kernel hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KernelParams {
    /// Signal variance σ².
    pub signal_variance: f64,
    /// One length scale per input dimension (ARD).
    pub length_scales: Vec<f64>,
    /// Observation noise variance added to the diagonal.
    pub noise_variance: f64,
}

impl KernelParams {
    /// Same length scale in every dimension.
    pub fn isotropic(dims: usize, signal_variance: f64, length_scale: f64, noise: f64) -> Self {
        Self {
            signal_variance,
            length_scales: vec![length_scale; dims],
            noise_variance: noise,
        }
    }

    /// Number of input dimensions.
    pub fn dims(&self) -> usize {
        self.length_scales.len()
    }

    /// Checks all parameters are positive and finite.
    pub fn validate(&self) -> MathResult<()> {
        let positive = |v: f64| v.is_finite() && v > 0.0;
        if !positive(self.signal_variance) {
            return Err(MathError::invalid_input(format!(
                "signal variance must be positive, got {}",
                self.signal_variance
            )));
        }
        if self.length_scales.is_empty() || !self.length_scales.iter().all(|&l| positive(l)) {
            return Err(MathError::invalid_input("length scales must be positive"));
        }
        if !(self.noise_variance.is_finite() && self.noise_variance >= 0.0) {
            return Err(MathError::invalid_input("noise variance must be non-negative"));
        }
        Ok(())
    }

    /// Log-space optimisation vector `[ln σ², ln ℓ_1..ln ℓ_d, (ln noise)]`.
    pub(crate) fn to_log(&self, with_noise: bool) -> Vec<f64> {
        let mut theta = Vec::with_capacity(self.dims() + 2);
        theta.push(self.signal_variance.ln());
        theta.extend(self.length_scales.iter().map(|l| l.ln()));
        if with_noise {
            theta.push(self.noise_variance.max(f64::MIN_POSITIVE).ln());
        }
        theta
    }

    /// Inverse of [`KernelParams::to_log`]; `noise` is used when the vector
    /// does not carry a noise entry.
    pub(crate) fn from_log(theta: &[f64], dims: usize, noise: f64) -> Self {
        let noise_variance = if theta.len() > dims + 1 {
            theta[dims + 1].exp()
        } else {
            noise
        };
        Self {
            signal_variance: theta[0].exp(),
            length_scales: theta[1..=dims].iter().map(|v| v.exp()).collect(),
            noise_variance,
        }
    }
}

impl Kernel {
    /// Evaluates `k(x, y)` without the noise term.
    pub fn eval(&self, x: &[f64], y: &[f64], params: &KernelParams) -> f64 {
        let r2: f64 = x
            .iter()
            .zip(y)
            .zip(&params.length_scales)
            .map(|((a, b), l)| {
                let d = (a - b) / l;
                d * d
            })
            .sum();

        match self {
            Kernel::SquaredExponential => params.signal_variance * (-0.5 * r2).exp(),
            Kernel::Matern52 => {
                let r = (5.0 * r2).sqrt();
                params.signal_variance * (1.0 + r + r * r / 3.0) * (-r).exp()
            }
        }
    }
}
