//! Linear algebra utilities.
//!
//! Cholesky factorisation and the triangular solves built on it. Kernel
//! matrices and correlation matrices both go through here.

use log::warn;
use nalgebra::{Cholesky, DMatrix, DVector};

use crate::error::{MathError, MathResult};

/// Smallest relative jitter tried when a factorisation fails.
pub const MIN_JITTER: f64 = 1e-10;

/// Largest relative jitter before giving up.
pub const MAX_JITTER: f64 = 1e-4;

fn check_square(matrix: &DMatrix<f64>) -> MathResult<usize> {
    let n = matrix.nrows();
    if n != matrix.ncols() {
        return Err(MathError::DimensionMismatch {
            rows1: n,
            cols1: matrix.ncols(),
            rows2: matrix.ncols(),
            cols2: n,
        });
    }
    if n == 0 {
        return Err(MathError::insufficient_data(1, 0));
    }
    Ok(n)
}

/// Returns the lower Cholesky factor `L` with `A = L Lᵀ`.
///
/// If `A` is not numerically positive definite, a diagonal jitter of
/// `MIN_JITTER * mean(diag A)` is added and multiplied by ten until the
/// factorisation succeeds or `MAX_JITTER` is exceeded.
pub fn cholesky(matrix: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
    cholesky_with_jitter(matrix).map(|(l, _)| l)
}

/// Like [`cholesky`], also returning the absolute jitter that was added.
pub fn cholesky_with_jitter(matrix: &DMatrix<f64>) -> MathResult<(DMatrix<f64>, f64)> {
    let n = check_square(matrix)?;
    if matrix.iter().any(|v| !v.is_finite()) {
        return Err(MathError::non_finite("cholesky input"));
    }

    if let Some(l) = try_factor(matrix.clone()) {
        return Ok((l, 0.0));
    }

    let scale = (matrix.diagonal().sum() / n as f64).abs().max(f64::MIN_POSITIVE);
    let mut relative = MIN_JITTER;
    while relative <= MAX_JITTER {
        let jitter = relative * scale;
        let mut shifted = matrix.clone();
        for i in 0..n {
            shifted[(i, i)] += jitter;
        }
        if let Some(l) = try_factor(shifted) {
            warn!("cholesky needed diagonal jitter {:.2e} (n = {})", jitter, n);
            return Ok((l, jitter));
        }
        relative *= 10.0;
    }

    Err(MathError::NotPositiveDefinite {
        jitter: MAX_JITTER * scale,
    })
}

/// Factorises and rejects factors with a vanishing pivot.
fn try_factor(matrix: DMatrix<f64>) -> Option<DMatrix<f64>> {
    let l = Cholesky::new(matrix)?.l();
    if l.diagonal().iter().all(|d| *d > 1e-150 && d.is_finite()) {
        Some(l)
    } else {
        None
    }
}

/// Solves `L x = b` for lower-triangular `L` (forward substitution).
pub fn solve_lower(l: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    let n = l.nrows();
    if n != b.len() {
        return Err(MathError::DimensionMismatch {
            rows1: n,
            cols1: l.ncols(),
            rows2: b.len(),
            cols2: 1,
        });
    }

    let mut x = DVector::zeros(n);
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[(i, j)] * x[j];
        }
        if l[(i, i)].abs() < 1e-300 {
            return Err(MathError::NotPositiveDefinite { jitter: 0.0 });
        }
        x[i] = sum / l[(i, i)];
    }
    Ok(x)
}

/// Solves `L X = B` column by column for lower-triangular `L`.
pub fn solve_lower_columns(l: &DMatrix<f64>, b: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
    let n = l.nrows();
    if n != b.nrows() {
        return Err(MathError::DimensionMismatch {
            rows1: n,
            cols1: l.ncols(),
            rows2: b.nrows(),
            cols2: b.ncols(),
        });
    }

    let mut x = DMatrix::zeros(n, b.ncols());
    for c in 0..b.ncols() {
        for i in 0..n {
            let mut sum = b[(i, c)];
            for j in 0..i {
                sum -= l[(i, j)] * x[(j, c)];
            }
            if l[(i, i)].abs() < 1e-300 {
                return Err(MathError::NotPositiveDefinite { jitter: 0.0 });
            }
            x[(i, c)] = sum / l[(i, i)];
        }
    }
    Ok(x)
}

/// Solves `Lᵀ x = b` for lower-triangular `L` (back substitution).
pub fn solve_upper_transpose(l: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    let n = l.nrows();
    if n != b.len() {
        return Err(MathError::DimensionMismatch {
            rows1: l.ncols(),
            cols1: n,
            rows2: b.len(),
            cols2: 1,
        });
    }

    let mut x = DVector::zeros(n);
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in i + 1..n {
            sum -= l[(j, i)] * x[j];
        }
        if l[(i, i)].abs() < 1e-300 {
            return Err(MathError::NotPositiveDefinite { jitter: 0.0 });
        }
        x[i] = sum / l[(i, i)];
    }
    Ok(x)
}

/// Solves `A x = b` given the Cholesky factor `L` of `A`.
pub fn cholesky_solve(l: &DMatrix<f64>, b: &DVector<f64>) -> MathResult<DVector<f64>> {
    let y = solve_lower(l, b)?;
    solve_upper_transpose(l, &y)
}

/// `ln det A` from the Cholesky factor of `A`.
pub fn log_det_from_cholesky(l: &DMatrix<f64>) -> f64 {
    2.0 * l.diagonal().iter().map(|d| d.ln()).sum::<f64>()
}

/// Validates a correlation matrix and returns its Cholesky factor.
///
/// The matrix must be square, symmetric, have a unit diagonal and
/// off-diagonal entries in `[-1, 1]`.
pub fn correlation_cholesky(corr: &DMatrix<f64>) -> MathResult<DMatrix<f64>> {
    let n = check_square(corr)?;
    for i in 0..n {
        if (corr[(i, i)] - 1.0).abs() > 1e-12 {
            return Err(MathError::invalid_input(format!(
                "correlation diagonal [{i},{i}] = {} is not 1",
                corr[(i, i)]
            )));
        }
        for j in 0..i {
            let rho = corr[(i, j)];
            if (rho - corr[(j, i)]).abs() > 1e-12 {
                return Err(MathError::invalid_input(format!(
                    "correlation matrix not symmetric at [{i},{j}]"
                )));
            }
            if !(-1.0..=1.0).contains(&rho) {
                return Err(MathError::invalid_input(format!(
                    "correlation [{i},{j}] = {rho} outside [-1, 1]"
                )));
            }
        }
    }
    cholesky(corr)
}
