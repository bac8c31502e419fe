//! Axis-aligned domain boxes.

use serde::{Deserialize, Serialize};

use crate::error::{MathError, MathResult};

/// Per-dimension `[lower, upper]` box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl Bounds {
    /// Creates a box from explicit limits.
    pub fn new(lower: Vec<f64>, upper: Vec<f64>) -> MathResult<Self> {
        if lower.is_empty() {
            return Err(MathError::insufficient_data(1, 0));
        }
        if lower.len() != upper.len() {
            return Err(MathError::invalid_input(format!(
                "lower has {} dims, upper has {}",
                lower.len(),
                upper.len()
            )));
        }
        if lower.iter().chain(&upper).any(|v| !v.is_finite()) {
            return Err(MathError::non_finite("bounds"));
        }
        if let Some(d) = (0..lower.len()).find(|&d| lower[d] > upper[d]) {
            return Err(MathError::invalid_input(format!(
                "dimension {d}: lower {} > upper {}",
                lower[d], upper[d]
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Column-wise min/max of a set of points.
    pub fn from_columns(rows: &[Vec<f64>]) -> MathResult<Self> {
        let first = rows.first().ok_or(MathError::insufficient_data(1, 0))?;
        let dims = first.len();
        let mut lower = vec![f64::INFINITY; dims];
        let mut upper = vec![f64::NEG_INFINITY; dims];
        for row in rows {
            if row.len() != dims {
                return Err(MathError::invalid_input(format!(
                    "ragged rows: expected {dims} columns, got {}",
                    row.len()
                )));
            }
            for (d, &v) in row.iter().enumerate() {
                if !v.is_finite() {
                    return Err(MathError::non_finite(format!("column {d}")));
                }
                lower[d] = lower[d].min(v);
                upper[d] = upper[d].max(v);
            }
        }
        Self::new(lower, upper)
    }

    /// Number of dimensions.
    pub fn dims(&self) -> usize {
        self.lower.len()
    }

    /// Lower limits.
    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    /// Upper limits.
    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Width of dimension `d`.
    pub fn width(&self, d: usize) -> f64 {
        self.upper[d] - self.lower[d]
    }

    /// True if dimension `d` has zero width.
    pub fn is_degenerate(&self, d: usize) -> bool {
        self.width(d) <= 0.0
    }

    /// True if every dimension has zero width (a single point).
    pub fn all_degenerate(&self) -> bool {
        (0..self.dims()).all(|d| self.is_degenerate(d))
    }

    /// Returns true if `x` lies inside the box.
    pub fn contains(&self, x: &[f64]) -> bool {
        x.len() == self.dims()
            && x
                .iter()
                .zip(self.lower.iter().zip(&self.upper))
                .all(|(v, (lo, hi))| *v >= *lo && *v <= *hi)
    }

    /// Clamps `x` into the box in place. Returns true if anything moved.
    pub fn clip_in_place(&self, x: &mut [f64]) -> bool {
        let mut clipped = false;
        for (v, (lo, hi)) in x.iter_mut().zip(self.lower.iter().zip(&self.upper)) {
            let c = v.clamp(*lo, *hi);
            if c != *v {
                clipped = true;
                *v = c;
            }
        }
        clipped
    }

    /// Clamps a copy of `x` into the box.
    pub fn clip(&self, x: &[f64]) -> (Vec<f64>, bool) {
        let mut out = x.to_vec();
        let clipped = self.clip_in_place(&mut out);
        (out, clipped)
    }
}
