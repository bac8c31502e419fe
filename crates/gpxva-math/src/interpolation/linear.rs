//! Linear interpolation.

use serde::{Deserialize, Serialize};

use crate::error::{MathError, MathResult};
use crate::interpolation::Interpolator;

/// Behaviour outside the data range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Extrapolation {
    /// Queries outside the range are errors.
    #[default]
    None,
    /// Hold the end values constant.
    Flat,
    /// Extend the end segments.
    Linear,
}

/// Piecewise-linear interpolation between data points.
///
/// A single data point is allowed when extrapolation is flat, which gives
/// a constant function.
///
/// # Example
///
/// ```rust
/// use gpxva_math::interpolation::{Extrapolation, Interpolator, LinearInterpolator};
///
/// let interp = LinearInterpolator::new(vec![1.0, 2.0], vec![0.02, 0.03])
///     .unwrap()
///     .with_extrapolation(Extrapolation::Flat);
/// assert!((interp.interpolate(1.5).unwrap() - 0.025).abs() < 1e-12);
/// assert!((interp.interpolate(10.0).unwrap() - 0.03).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearInterpolator {
    xs: Vec<f64>,
    ys: Vec<f64>,
    extrapolation: Extrapolation,
}

impl LinearInterpolator {
    /// Creates a new linear interpolator.
    ///
    /// `xs` must be strictly increasing and the same length as `ys`.
    pub fn new(xs: Vec<f64>, ys: Vec<f64>) -> MathResult<Self> {
        if xs.is_empty() {
            return Err(MathError::insufficient_data(1, 0));
        }
        if xs.len() != ys.len() {
            return Err(MathError::invalid_input(format!(
                "xs and ys must have same length: {} vs {}",
                xs.len(),
                ys.len()
            )));
        }
        if xs.iter().chain(&ys).any(|v| !v.is_finite()) {
            return Err(MathError::non_finite("interpolation data"));
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MathError::invalid_input(
                "x values must be strictly increasing",
            ));
        }

        Ok(Self {
            xs,
            ys,
            extrapolation: Extrapolation::None,
        })
    }

    /// Sets the extrapolation behaviour.
    #[must_use]
    pub fn with_extrapolation(mut self, extrapolation: Extrapolation) -> Self {
        self.extrapolation = extrapolation;
        self
    }

    /// Knot x values.
    pub fn xs(&self) -> &[f64] {
        &self.xs
    }

    /// Knot y values.
    pub fn ys(&self) -> &[f64] {
        &self.ys
    }

    /// Finds the index i such that xs[i] <= x < xs[i+1].
    fn find_segment(&self, x: f64) -> usize {
        let last = self.xs.len() - 2;
        match self.xs.binary_search_by(|probe| probe.total_cmp(&x)) {
            Ok(i) => i.min(last),
            Err(i) => i.saturating_sub(1).min(last),
        }
    }

    fn check_range(&self, x: f64) -> MathResult<Option<f64>> {
        let (min, max) = (self.min_x(), self.max_x());
        if x >= min && x <= max {
            return Ok(None);
        }
        match self.extrapolation {
            Extrapolation::None => Err(MathError::ExtrapolationNotAllowed { x, min, max }),
            Extrapolation::Flat => Ok(Some(if x < min {
                self.ys[0]
            } else {
                self.ys[self.ys.len() - 1]
            })),
            Extrapolation::Linear => Ok(None),
        }
    }
}

impl Interpolator for LinearInterpolator {
    fn interpolate(&self, x: f64) -> MathResult<f64> {
        if let Some(flat) = self.check_range(x)? {
            return Ok(flat);
        }
        if self.xs.len() == 1 {
            return Ok(self.ys[0]);
        }

        let i = self.find_segment(x);
        let (x0, x1) = (self.xs[i], self.xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let t = (x - x0) / (x1 - x0);
        Ok(y0 + t * (y1 - y0))
    }

    fn derivative(&self, x: f64) -> MathResult<f64> {
        if self.check_range(x)?.is_some() || self.xs.len() == 1 {
            return Ok(0.0);
        }

        let i = self.find_segment(x);
        Ok((self.ys[i + 1] - self.ys[i]) / (self.xs[i + 1] - self.xs[i]))
    }

    fn min_x(&self) -> f64 {
        self.xs[0]
    }

    fn max_x(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_interpolation() {
        let interp = LinearInterpolator::new(vec![0.0, 1.0, 2.0], vec![0.0, 2.0, 4.0]).unwrap();

        assert_relative_eq!(interp.interpolate(0.0).unwrap(), 0.0, epsilon = 1e-10);
        assert_relative_eq!(interp.interpolate(2.0).unwrap(), 4.0, epsilon = 1e-10);
        assert_relative_eq!(interp.interpolate(1.5).unwrap(), 3.0, epsilon = 1e-10);
        assert_relative_eq!(interp.derivative(0.5).unwrap(), 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_extrapolation_modes() {
        let base = LinearInterpolator::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0, 3.0]).unwrap();
        assert!(base.interpolate(-0.5).is_err());
        assert!(base.interpolate(2.5).is_err());

        let flat = base.clone().with_extrapolation(Extrapolation::Flat);
        assert_relative_eq!(flat.interpolate(-1.0).unwrap(), 0.0);
        assert_relative_eq!(flat.interpolate(5.0).unwrap(), 3.0);
        assert_relative_eq!(flat.derivative(5.0).unwrap(), 0.0);

        let linear = base.with_extrapolation(Extrapolation::Linear);
        assert_relative_eq!(linear.interpolate(-1.0).unwrap(), -1.0, epsilon = 1e-10);
        assert_relative_eq!(linear.interpolate(3.0).unwrap(), 5.0, epsilon = 1e-10);
    }

    #[test]
    fn test_single_point_flat() {
        let interp = LinearInterpolator::new(vec![5.0], vec![0.03])
            .unwrap()
            .with_extrapolation(Extrapolation::Flat);
        assert_relative_eq!(interp.interpolate(0.0).unwrap(), 0.03);
        assert_relative_eq!(interp.interpolate(5.0).unwrap(), 0.03);
        assert_relative_eq!(interp.derivative(5.0).unwrap(), 0.0);
    }

    #[test]
    fn test_invalid_data() {
        assert!(LinearInterpolator::new(vec![], vec![]).is_err());
        assert!(LinearInterpolator::new(vec![1.0, 0.0], vec![1.0, 0.0]).is_err());
        assert!(LinearInterpolator::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(LinearInterpolator::new(vec![0.0, 1.0], vec![1.0, f64::NAN]).is_err());
    }
}
