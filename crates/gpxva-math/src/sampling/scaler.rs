//! Min/max rescaling onto the unit cube.

use serde::{Deserialize, Serialize};

use super::Bounds;

/// Affine map from a [`Bounds`] box onto `[0, 1]^d`.
///
/// Degenerate dimensions map to `0.5` and invert to their constant value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    bounds: Bounds,
}

impl MinMaxScaler {
    /// Fits the scaler to a domain.
    pub fn fit(bounds: &Bounds) -> Self {
        Self {
            bounds: bounds.clone(),
        }
    }

    /// Domain the scaler was fitted on.
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Maps a point of the domain to the unit cube.
    pub fn transform(&self, x: &[f64]) -> Vec<f64> {
        x.iter()
            .enumerate()
            .map(|(d, &v)| {
                let width = self.bounds.width(d);
                if width > 0.0 {
                    (v - self.bounds.lower()[d]) / width
                } else {
                    0.5
                }
            })
            .collect()
    }

    /// Maps a unit-cube point back to the domain.
    pub fn inverse_transform(&self, u: &[f64]) -> Vec<f64> {
        u.iter()
            .enumerate()
            .map(|(d, &v)| {
                let width = self.bounds.width(d);
                if width > 0.0 {
                    self.bounds.lower()[d] + v * width
                } else {
                    self.bounds.lower()[d]
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_transform_endpoints() {
        let b = Bounds::new(vec![-0.01, 0.8], vec![0.05, 1.2]).unwrap();
        let s = MinMaxScaler::fit(&b);
        let u = s.transform(&[-0.01, 1.2]);
        assert_relative_eq!(u[0], 0.0);
        assert_relative_eq!(u[1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_dimension() {
        let b = Bounds::new(vec![0.03], vec![0.03]).unwrap();
        let s = MinMaxScaler::fit(&b);
        assert_relative_eq!(s.transform(&[0.03])[0], 0.5);
        assert_relative_eq!(s.inverse_transform(&[0.9])[0], 0.03);
    }

    proptest! {
        #[test]
        fn prop_round_trip_inside_box(
            lo in -10.0f64..10.0,
            width in 1e-6f64..10.0,
            t in 0.0f64..=1.0,
        ) {
            let b = Bounds::new(vec![lo], vec![lo + width]).unwrap();
            let s = MinMaxScaler::fit(&b);
            let x = lo + t * width;
            let u = s.transform(&[x]);
            prop_assert!(u[0] >= -1e-9 && u[0] <= 1.0 + 1e-9);
            let back = s.inverse_transform(&u);
            prop_assert!((back[0] - x).abs() <= 1e-9 * (1.0 + x.abs()));
        }
    }
}
