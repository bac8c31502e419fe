//! Interpolation for term structures.
//!
//! Zero curves interpolate zero rates linearly between pillars and need the
//! slope as well, since instantaneous forwards are `d(t z(t))/dt`.

mod linear;

pub use linear::{Extrapolation, LinearInterpolator};

use crate::error::MathResult;

/// Trait for one-dimensional interpolators.
pub trait Interpolator: Send + Sync {
    /// Returns the interpolated value at x.
    fn interpolate(&self, x: f64) -> MathResult<f64>;

    /// Returns the first derivative at x.
    fn derivative(&self, x: f64) -> MathResult<f64>;

    /// Returns the minimum x value in the data.
    fn min_x(&self) -> f64;

    /// Returns the maximum x value in the data.
    fn max_x(&self) -> f64;

    /// Checks if x is within the interpolation range.
    fn in_range(&self, x: f64) -> bool {
        x >= self.min_x() && x <= self.max_x()
    }
}
