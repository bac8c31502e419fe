//! Stratified designs over a domain box.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Bounds;
use crate::error::{MathError, MathResult};
use crate::statistics::quantile_sorted;

/// How training inputs are placed inside the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SamplingScheme {
    /// Independent uniform draws in the box.
    Uniform,
    /// Latin hypercube, mapped linearly onto the box.
    LatinHypercube,
    /// Latin hypercube whose coordinates go through each dimension's
    /// empirical quantile function, so points follow the path density.
    #[default]
    Quantile,
}

/// Draws a Latin hypercube design of `n` points in `[0, 1]^d`.
///
/// Every dimension has exactly one point in each of the `n` strata
/// `[k/n, (k+1)/n)`; strata are paired across dimensions by independent
/// random permutations and jittered uniformly within the stratum.
pub fn latin_hypercube<R: Rng + ?Sized>(n: usize, d: usize, rng: &mut R) -> Vec<Vec<f64>> {
    let mut points = vec![vec![0.0; d]; n];
    let mut strata: Vec<usize> = (0..n).collect();
    for dim in 0..d {
        strata.shuffle(rng);
        for (point, &k) in points.iter_mut().zip(&strata) {
            let jitter: f64 = rng.random();
            point[dim] = (k as f64 + jitter) / n as f64;
        }
    }
    points
}

/// Sorted per-dimension samples, used as empirical marginal distributions.
///
/// With a tail trim `τ`, levels are rescaled onto `[τ, 1 − τ]` so the
/// quantile function covers exactly the trimmed quantile box.
#[derive(Debug, Clone, PartialEq)]
pub struct EmpiricalMarginals {
    columns: Vec<Vec<f64>>,
    trim: f64,
}

impl EmpiricalMarginals {
    /// Builds marginals from observed points (rows).
    pub fn from_rows(rows: &[Vec<f64>]) -> MathResult<Self> {
        let first = rows.first().ok_or(MathError::insufficient_data(1, 0))?;
        let dims = first.len();
        let mut columns = vec![Vec::with_capacity(rows.len()); dims];
        for row in rows {
            if row.len() != dims {
                return Err(MathError::invalid_input("ragged rows in marginals"));
            }
            for (col, &v) in columns.iter_mut().zip(row) {
                if v.is_nan() {
                    return Err(MathError::non_finite("marginal sample"));
                }
                col.push(v);
            }
        }
        for col in &mut columns {
            col.sort_by(f64::total_cmp);
        }
        Ok(Self { columns, trim: 0.0 })
    }

    /// Restricts the marginals to the inner `[trim, 1 − trim]` quantiles.
    pub fn with_trim(mut self, trim: f64) -> MathResult<Self> {
        if !(0.0..0.5).contains(&trim) {
            return Err(MathError::invalid_input(format!(
                "tail trim {trim} outside [0, 0.5)"
            )));
        }
        self.trim = trim;
        Ok(self)
    }

    /// Tail probability removed from each side.
    pub fn trim(&self) -> f64 {
        self.trim
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.columns.len()
    }

    /// Empirical quantile of dimension `d` at level `p`, where `p` runs
    /// over the trimmed range: `0` maps to the `trim` quantile and `1` to
    /// the `1 − trim` quantile.
    pub fn quantile(&self, d: usize, p: f64) -> f64 {
        let level = self.trim + p.clamp(0.0, 1.0) * (1.0 - 2.0 * self.trim);
        quantile_sorted(&self.columns[d], level.clamp(0.0, 1.0))
    }
}

/// Draws training designs of a fixed size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StratifiedSampler {
    /// Points per design.
    pub n: usize,
    /// Placement scheme.
    pub scheme: SamplingScheme,
}

impl StratifiedSampler {
    /// Creates a sampler.
    pub fn new(n: usize, scheme: SamplingScheme) -> Self {
        Self { n, scheme }
    }

    /// Draws `n` points inside `bounds`.
    ///
    /// The `Quantile` scheme needs the observed `marginals`; the other
    /// schemes ignore them.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        bounds: &Bounds,
        marginals: Option<&EmpiricalMarginals>,
        rng: &mut R,
    ) -> MathResult<Vec<Vec<f64>>> {
        if self.n == 0 {
            return Err(MathError::insufficient_data(1, 0));
        }
        let d = bounds.dims();
        let map_linear = |u: &[f64]| -> Vec<f64> {
            u.iter()
                .enumerate()
                .map(|(k, &v)| bounds.lower()[k] + v * bounds.width(k))
                .collect()
        };

        match self.scheme {
            SamplingScheme::Uniform => Ok((0..self.n)
                .map(|_| {
                    let u: Vec<f64> = (0..d).map(|_| rng.random::<f64>()).collect();
                    map_linear(&u)
                })
                .collect()),
            SamplingScheme::LatinHypercube => Ok(latin_hypercube(self.n, d, rng)
                .iter()
                .map(|u| map_linear(u))
                .collect()),
            SamplingScheme::Quantile => {
                let marginals = marginals.ok_or_else(|| {
                    MathError::invalid_input("quantile sampling needs empirical marginals")
                })?;
                if marginals.dims() != d {
                    return Err(MathError::DimensionMismatch {
                        rows1: d,
                        cols1: 1,
                        rows2: marginals.dims(),
                        cols2: 1,
                    });
                }
                Ok(latin_hypercube(self.n, d, rng)
                    .iter()
                    .map(|u| {
                        u.iter()
                            .enumerate()
                            .map(|(k, &p)| {
                                marginals
                                    .quantile(k, p)
                                    .clamp(bounds.lower()[k], bounds.upper()[k])
                            })
                            .collect()
                    })
                    .collect())
            }
        }
    }
}
