//! Optimization algorithms.
//!
//! Derivative-free minimisation used to fit GP hyperparameters on the
//! log marginal likelihood surface.

use crate::error::{MathError, MathResult};

/// Configuration for optimization algorithms.
#[derive(Debug, Clone, Copy)]
pub struct OptimizationConfig {
    /// Convergence tolerance on the spread of simplex values.
    pub tolerance: f64,
    /// Maximum number of iterations.
    pub max_iterations: u32,
    /// Initial simplex step per coordinate.
    pub step_size: f64,
}

impl Default for OptimizationConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-8,
            max_iterations: 500,
            step_size: 0.5,
        }
    }
}

/// Result of an optimization run.
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Optimal parameters found.
    pub parameters: Vec<f64>,
    /// Final objective function value.
    pub objective_value: f64,
    /// Number of iterations used.
    pub iterations: u32,
    /// Whether the optimization converged.
    pub converged: bool,
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Minimises `f` with the Nelder-Mead simplex method.
///
/// Non-finite objective values are treated as `+inf`, so the simplex
/// retreats from regions where `f` blows up.
pub fn nelder_mead<F>(
    f: F,
    initial: &[f64],
    config: &OptimizationConfig,
) -> MathResult<OptimizationResult>
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return Err(MathError::invalid_input("nelder_mead needs at least one parameter"));
    }
    if initial.iter().any(|x| !x.is_finite()) {
        return Err(MathError::non_finite("nelder_mead initial point"));
    }

    let eval = |x: &[f64]| {
        let v = f(x);
        if v.is_finite() {
            v
        } else {
            f64::INFINITY
        }
    };

    let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
    simplex.push(initial.to_vec());
    for i in 0..n {
        let mut vertex = initial.to_vec();
        vertex[i] += config.step_size;
        simplex.push(vertex);
    }
    let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

    for iteration in 0..config.max_iterations {
        // Order vertices best to worst
        let mut order: Vec<usize> = (0..=n).collect();
        order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
        simplex = order.iter().map(|&i| simplex[i].clone()).collect();
        values = order.iter().map(|&i| values[i]).collect();

        let spread = (values[n] - values[0]).abs();
        if values[0].is_finite() && spread < config.tolerance {
            return Ok(OptimizationResult {
                parameters: simplex[0].clone(),
                objective_value: values[0],
                iterations: iteration,
                converged: true,
            });
        }

        let mut centroid = vec![0.0; n];
        for vertex in &simplex[..n] {
            for (c, v) in centroid.iter_mut().zip(vertex) {
                *c += v / n as f64;
            }
        }
        let along = |coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(&simplex[n])
                .map(|(c, w)| c + coef * (c - w))
                .collect()
        };

        let reflected = along(REFLECTION);
        let f_reflected = eval(&reflected);

        if f_reflected < values[0] {
            let expanded = along(EXPANSION);
            let f_expanded = eval(&expanded);
            if f_expanded < f_reflected {
                simplex[n] = expanded;
                values[n] = f_expanded;
            } else {
                simplex[n] = reflected;
                values[n] = f_reflected;
            }
            continue;
        }

        if f_reflected < values[n - 1] {
            simplex[n] = reflected;
            values[n] = f_reflected;
            continue;
        }

        let (contracted, f_contracted) = if f_reflected < values[n] {
            let point = along(CONTRACTION);
            let value = eval(&point);
            (point, value)
        } else {
            let point = along(-CONTRACTION);
            let value = eval(&point);
            (point, value)
        };

        if f_contracted < values[n].min(f_reflected) {
            simplex[n] = contracted;
            values[n] = f_contracted;
            continue;
        }

        // Shrink towards the best vertex
        let best = simplex[0].clone();
        for i in 1..=n {
            for (x, b) in simplex[i].iter_mut().zip(&best) {
                *x = b + SHRINK * (*x - b);
            }
            values[i] = eval(&simplex[i]);
        }
    }

    let best = (0..=n)
        .min_by(|&a, &b| values[a].total_cmp(&values[b]))
        .unwrap_or(0);
    Ok(OptimizationResult {
        parameters: simplex[best].clone(),
        objective_value: values[best],
        iterations: config.max_iterations,
        converged: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_nelder_mead_quadratic() {
        // Minimize (x-2)^2 + (y-3)^2
        let f = |params: &[f64]| (params[0] - 2.0).powi(2) + (params[1] - 3.0).powi(2);

        let config = OptimizationConfig {
            tolerance: 1e-14,
            ..OptimizationConfig::default()
        };
        let result = nelder_mead(f, &[0.0, 0.0], &config).unwrap();

        assert!(result.converged);
        assert_relative_eq!(result.parameters[0], 2.0, epsilon = 1e-5);
        assert_relative_eq!(result.parameters[1], 3.0, epsilon = 1e-5);
    }

    #[test]
    fn test_nelder_mead_rosenbrock() {
        let f = |p: &[f64]| (1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2);
        let config = OptimizationConfig {
            tolerance: 1e-16,
            max_iterations: 5000,
            step_size: 0.5,
        };
        let result = nelder_mead(f, &[-1.2, 1.0], &config).unwrap();
        assert_relative_eq!(result.parameters[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(result.parameters[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_nelder_mead_avoids_nan_region() {
        // ln is undefined below zero
        let f = |p: &[f64]| p[0].ln().powi(2);
        let result = nelder_mead(f, &[3.0], &OptimizationConfig::default()).unwrap();
        assert!(result.objective_value.is_finite());
        assert_relative_eq!(result.parameters[0], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_nelder_mead_rejects_empty() {
        let f = |_: &[f64]| 0.0;
        assert!(nelder_mead(f, &[], &OptimizationConfig::default()).is_err());
    }
}
