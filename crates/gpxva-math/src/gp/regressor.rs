//! Exact Gaussian-process regressor.

use std::f64::consts::PI;

use log::debug;
use nalgebra::{DMatrix, DVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::kernel::{Kernel, KernelParams};
use crate::error::{MathError, MathResult};
use crate::linear_algebra::{
    cholesky_solve, cholesky_with_jitter, solve_lower, solve_lower_columns,
};
use crate::optimization::{nelder_mead, OptimizationConfig};

/// Fitting configuration.
///
/// Bounds are `(lower, upper)` in natural units and apply to inputs on the
/// unit cube and standardised targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpConfig {
    /// Covariance family.
    pub kernel: Kernel,
    /// Starting length scale (all dimensions).
    pub length_scale: f64,
    /// Starting signal variance.
    pub signal_variance: f64,
    /// Observation noise variance (starting value if optimised).
    pub noise_variance: f64,
    /// Fit hyperparameters by maximising the log marginal likelihood.
    pub optimize: bool,
    /// Also fit the noise variance.
    pub optimize_noise: bool,
    /// Extra random starting points for the optimiser.
    pub restarts: usize,
    /// Seed for the restart draws.
    pub seed: u64,
    /// Length scale bounds.
    pub length_scale_bounds: (f64, f64),
    /// Signal variance bounds.
    pub signal_variance_bounds: (f64, f64),
    /// Noise variance bounds.
    pub noise_bounds: (f64, f64),
    /// Standardise targets before fitting.
    pub normalize_y: bool,
    /// Optimiser iteration cap per start.
    pub max_iterations: u32,
}

impl Default for GpConfig {
    fn default() -> Self {
        Self {
            kernel: Kernel::SquaredExponential,
            length_scale: 0.5,
            signal_variance: 1.0,
            noise_variance: 1e-8,
            optimize: true,
            optimize_noise: false,
            restarts: 2,
            seed: 0,
            length_scale_bounds: (1e-2, 1e2),
            signal_variance_bounds: (1e-3, 1e3),
            noise_bounds: (1e-10, 1e-1),
            normalize_y: true,
            max_iterations: 400,
        }
    }
}

impl GpConfig {
    fn log_bounds(&self, dims: usize) -> Vec<(f64, f64)> {
        let ln = |(lo, hi): (f64, f64)| (lo.ln(), hi.ln());
        let mut bounds = vec![ln(self.signal_variance_bounds)];
        bounds.extend(std::iter::repeat(ln(self.length_scale_bounds)).take(dims));
        if self.optimize_noise {
            bounds.push(ln(self.noise_bounds));
        }
        bounds
    }
}

/// Posterior mean and variance at one input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Posterior mean in target units.
    pub mean: f64,
    /// Posterior variance of the latent function (excludes noise).
    pub variance: f64,
}

impl Prediction {
    /// Posterior standard deviation.
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// A fitted GP.
#[derive(Debug, Clone)]
pub struct GaussianProcess {
    kernel: Kernel,
    params: KernelParams,
    x_train: Vec<Vec<f64>>,
    chol: DMatrix<f64>,
    alpha: DVector<f64>,
    y_mean: f64,
    y_scale: f64,
    log_marginal_likelihood: f64,
}

struct Factorised {
    chol: DMatrix<f64>,
    alpha: DVector<f64>,
    lml: f64,
}

fn factorise(
    kernel: Kernel,
    params: &KernelParams,
    x: &[Vec<f64>],
    y: &DVector<f64>,
) -> MathResult<Factorised> {
    let n = x.len();
    let mut k = DMatrix::zeros(n, n);
    for i in 0..n {
        for j in 0..=i {
            let v = kernel.eval(&x[i], &x[j], params);
            k[(i, j)] = v;
            k[(j, i)] = v;
        }
        k[(i, i)] += params.noise_variance;
    }

    let (chol, _jitter) = cholesky_with_jitter(&k)?;
    let alpha = cholesky_solve(&chol, y)?;
    let log_det_half: f64 = chol.diagonal().iter().map(|d| d.ln()).sum();
    let lml = -0.5 * y.dot(&alpha) - log_det_half - 0.5 * n as f64 * (2.0 * PI).ln();
    Ok(Factorised { chol, alpha, lml })
}

fn validate_training(x: &[Vec<f64>], y: &[f64]) -> MathResult<usize> {
    if x.is_empty() {
        return Err(MathError::insufficient_data(1, 0));
    }
    if x.len() != y.len() {
        return Err(MathError::invalid_input(format!(
            "{} inputs but {} targets",
            x.len(),
            y.len()
        )));
    }
    let dims = x[0].len();
    if dims == 0 {
        return Err(MathError::invalid_input("inputs have zero dimensions"));
    }
    if x.iter().any(|row| row.len() != dims) {
        return Err(MathError::invalid_input("ragged training inputs"));
    }
    if x.iter().flatten().chain(y).any(|v| !v.is_finite()) {
        return Err(MathError::non_finite("GP training data"));
    }
    Ok(dims)
}

impl GaussianProcess {
    /// Fits a GP to `(x, y)`.
    pub fn fit(x: &[Vec<f64>], y: &[f64], config: &GpConfig) -> MathResult<Self> {
        let dims = validate_training(x, y)?;
        let n = x.len();

        let (y_mean, y_scale) = if config.normalize_y {
            let mean = y.iter().sum::<f64>() / n as f64;
            let var = y.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
            let sd = var.sqrt();
            (mean, if sd > 1e-12 { sd } else { 1.0 })
        } else {
            (0.0, 1.0)
        };
        let y_norm = DVector::from_iterator(n, y.iter().map(|v| (v - y_mean) / y_scale));

        let initial = KernelParams::isotropic(
            dims,
            config.signal_variance,
            config.length_scale,
            config.noise_variance,
        );
        initial.validate()?;

        let params = if config.optimize {
            optimise_params(config, &initial, x, &y_norm)?
        } else {
            initial
        };

        let fitted = factorise(config.kernel, &params, x, &y_norm)?;
        debug!(
            "gp fit: n = {}, dims = {}, lml = {:.4}, length scales = {:?}",
            n, dims, fitted.lml, params.length_scales
        );

        Ok(Self {
            kernel: config.kernel,
            params,
            x_train: x.to_vec(),
            chol: fitted.chol,
            alpha: fitted.alpha,
            y_mean,
            y_scale,
            log_marginal_likelihood: fitted.lml,
        })
    }

    /// Posterior mean and variance at `x`.
    pub fn predict(&self, x: &[f64]) -> MathResult<Prediction> {
        self.check_dims(x)?;
        let k_star = DVector::from_iterator(
            self.x_train.len(),
            self.x_train.iter().map(|xi| self.kernel.eval(xi, x, &self.params)),
        );
        let mean = k_star.dot(&self.alpha);
        let v = solve_lower(&self.chol, &k_star)?;
        let prior = self.kernel.eval(x, x, &self.params);
        let latent_var = (prior - v.dot(&v)).max(0.0);
        Ok(Prediction {
            mean: self.y_mean + self.y_scale * mean,
            variance: latent_var * self.y_scale * self.y_scale,
        })
    }

    /// Predictions for many inputs, sharing one pass over the Cholesky factor.
    pub fn predict_batch(&self, xs: &[Vec<f64>]) -> MathResult<Vec<Prediction>> {
        if xs.is_empty() {
            return Ok(Vec::new());
        }
        for x in xs {
            self.check_dims(x)?;
        }
        let n = self.x_train.len();
        let m = xs.len();
        let k_star = DMatrix::from_fn(n, m, |i, j| {
            self.kernel.eval(&self.x_train[i], &xs[j], &self.params)
        });
        let means = k_star.tr_mul(&self.alpha);
        let v = solve_lower_columns(&self.chol, &k_star)?;

        Ok((0..m)
            .map(|j| {
                let prior = self.kernel.eval(&xs[j], &xs[j], &self.params);
                let explained = v.column(j).norm_squared();
                Prediction {
                    mean: self.y_mean + self.y_scale * means[j],
                    variance: (prior - explained).max(0.0) * self.y_scale * self.y_scale,
                }
            })
            .collect())
    }

    fn check_dims(&self, x: &[f64]) -> MathResult<()> {
        if x.len() != self.dims() {
            return Err(MathError::DimensionMismatch {
                rows1: 1,
                cols1: self.dims(),
                rows2: 1,
                cols2: x.len(),
            });
        }
        Ok(())
    }

    /// Log marginal likelihood of the standardised targets.
    pub fn log_marginal_likelihood(&self) -> f64 {
        self.log_marginal_likelihood
    }

    /// Fitted hyperparameters.
    pub fn params(&self) -> &KernelParams {
        &self.params
    }

    /// Kernel family.
    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    /// Number of training points.
    pub fn n_train(&self) -> usize {
        self.x_train.len()
    }

    /// Input dimension.
    pub fn dims(&self) -> usize {
        self.params.dims()
    }
}

fn clamp_to(theta: &[f64], bounds: &[(f64, f64)]) -> Vec<f64> {
    theta
        .iter()
        .zip(bounds)
        .map(|(t, (lo, hi))| t.clamp(*lo, *hi))
        .collect()
}

fn optimise_params(
    config: &GpConfig,
    initial: &KernelParams,
    x: &[Vec<f64>],
    y: &DVector<f64>,
) -> MathResult<KernelParams> {
    let dims = initial.dims();
    let bounds = config.log_bounds(dims);
    let noise = config.noise_variance;

    let objective = |theta: &[f64]| -> f64 {
        let clamped = clamp_to(theta, &bounds);
        let params = KernelParams::from_log(&clamped, dims, noise);
        match factorise(config.kernel, &params, x, y) {
            Ok(f) => -f.lml,
            Err(_) => f64::INFINITY,
        }
    };

    let mut starts = vec![clamp_to(&initial.to_log(config.optimize_noise), &bounds)];
    let mut rng = StdRng::seed_from_u64(config.seed);
    for _ in 0..config.restarts {
        starts.push(
            bounds
                .iter()
                .map(|(lo, hi)| lo + (hi - lo) * rng.random::<f64>())
                .collect(),
        );
    }

    let nm_config = OptimizationConfig {
        tolerance: 1e-7,
        max_iterations: config.max_iterations,
        step_size: 0.5,
    };

    let mut best: Option<(Vec<f64>, f64)> = None;
    for start in &starts {
        let result = nelder_mead(&objective, start, &nm_config)?;
        if best
            .as_ref()
            .map_or(true, |(_, value)| result.objective_value < *value)
        {
            best = Some((result.parameters, result.objective_value));
        }
    }

    match best {
        Some((theta, value)) if value.is_finite() => Ok(KernelParams::from_log(
            &clamp_to(&theta, &bounds),
            dims,
            noise,
        )),
        _ => Err(MathError::convergence_failed(config.max_iterations, f64::INFINITY)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine_data(n: usize) -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64 / (n - 1) as f64]).collect();
        let y = x.iter().map(|p| (2.0 * PI * p[0]).sin()).collect();
        (x, y)
    }

    #[test]
    fn test_interpolates_training_points() {
        let (x, y) = sine_data(10);
        let config = GpConfig {
            optimize: false,
            length_scale: 0.2,
            ..GpConfig::default()
        };
        let gp = GaussianProcess::fit(&x, &y, &config).unwrap();
        for (xi, yi) in x.iter().zip(&y) {
            let p = gp.predict(xi).unwrap();
            assert_relative_eq!(p.mean, *yi, epsilon = 1e-4);
            assert!(p.variance < 1e-4);
        }
    }

    #[test]
    fn test_optimised_fit_generalises() {
        let (x, y) = sine_data(15);
        let gp = GaussianProcess::fit(&x, &y, &GpConfig::default()).unwrap();
        for &t in &[0.13, 0.47, 0.81] {
            let p = gp.predict(&[t]).unwrap();
            assert_relative_eq!(p.mean, (2.0 * PI * t).sin(), epsilon = 1e-2);
        }
    }

    #[test]
    fn test_variance_grows_away_from_data() {
        let x = vec![vec![0.0], vec![0.1], vec![0.2]];
        let y = vec![1.0, 1.5, 1.2];
        let config = GpConfig {
            optimize: false,
            length_scale: 0.1,
            ..GpConfig::default()
        };
        let gp = GaussianProcess::fit(&x, &y, &config).unwrap();
        let near = gp.predict(&[0.1]).unwrap();
        let far = gp.predict(&[0.9]).unwrap();
        assert!(far.variance > near.variance);
    }

    #[test]
    fn test_batch_matches_single() {
        let x: Vec<Vec<f64>> = (0..20)
            .map(|i| {
                let t = i as f64 / 19.0;
                vec![t, (t * 7.0).fract()]
            })
            .collect();
        let y: Vec<f64> = x.iter().map(|p| p[0] * p[0] + 0.5 * p[1]).collect();
        let gp = GaussianProcess::fit(&x, &y, &GpConfig::default()).unwrap();
        let queries = vec![vec![0.3, 0.4], vec![0.9, 0.1], vec![0.55, 0.55]];
        let batch = gp.predict_batch(&queries).unwrap();
        for (q, b) in queries.iter().zip(&batch) {
            let s = gp.predict(q).unwrap();
            assert_relative_eq!(s.mean, b.mean, epsilon = 1e-9);
            assert_relative_eq!(s.variance, b.variance, epsilon = 1e-9);
        }
        assert!(gp.predict_batch(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_constant_targets() {
        let x = vec![vec![0.0], vec![0.5], vec![1.0]];
        let y = vec![4.2, 4.2, 4.2];
        let gp = GaussianProcess::fit(&x, &y, &GpConfig::default()).unwrap();
        assert_relative_eq!(gp.predict(&[0.25]).unwrap().mean, 4.2, epsilon = 1e-6);
    }

    #[test]
    fn test_matern_kernel_fit() {
        let (x, y) = sine_data(15);
        let config = GpConfig {
            kernel: Kernel::Matern52,
            ..GpConfig::default()
        };
        let gp = GaussianProcess::fit(&x, &y, &config).unwrap();
        assert_eq!(gp.kernel(), Kernel::Matern52);
        let p = gp.predict(&[0.3]).unwrap();
        assert_relative_eq!(p.mean, (2.0 * PI * 0.3).sin(), epsilon = 5e-2);
    }

    #[test]
    fn test_optimisation_improves_likelihood() {
        let (x, y) = sine_data(12);
        let fixed = GpConfig {
            optimize: false,
            length_scale: 5.0,
            ..GpConfig::default()
        };
        let fitted = GpConfig {
            length_scale: 5.0,
            ..GpConfig::default()
        };
        let a = GaussianProcess::fit(&x, &y, &fixed).unwrap();
        let b = GaussianProcess::fit(&x, &y, &fitted).unwrap();
        assert!(b.log_marginal_likelihood() >= a.log_marginal_likelihood());
    }

    #[test]
    fn test_input_validation() {
        let config = GpConfig::default();
        assert!(GaussianProcess::fit(&[], &[], &config).is_err());
        assert!(GaussianProcess::fit(&[vec![0.0]], &[1.0, 2.0], &config).is_err());
        assert!(GaussianProcess::fit(&[vec![0.0], vec![0.0, 1.0]], &[1.0, 2.0], &config).is_err());
        assert!(GaussianProcess::fit(&[vec![0.0]], &[f64::NAN], &config).is_err());

        let gp = GaussianProcess::fit(&[vec![0.0], vec![1.0]], &[0.0, 1.0], &config).unwrap();
        assert!(matches!(
            gp.predict(&[0.0, 1.0]),
            Err(MathError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            gp.predict_batch(&[vec![0.5], vec![0.0, 1.0]]),
            Err(MathError::DimensionMismatch { .. })
        ));
    }
}
