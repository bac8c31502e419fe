//! Gaussian-process regression.
//!
//! Exact GP regression with a stationary ARD kernel, standardised targets
//! and hyperparameters fitted by maximising the log marginal likelihood.
//! One GP is fitted per instrument and exposure date, on inputs that the
//! caller has already rescaled to the unit cube.
//!
//! # Example
//!
//! ```rust
//! use gpxva_math::gp::{GaussianProcess, GpConfig};
//!
//! let x: Vec<Vec<f64>> = (0..12).map(|i| vec![i as f64 / 11.0]).collect();
//! let y: Vec<f64> = x.iter().map(|p| (3.0 * p[0]).sin()).collect();
//!
//! let gp = GaussianProcess::fit(&x, &y, &GpConfig::default()).unwrap();
//! let pred = gp.predict(&[0.5]).unwrap();
//! assert!((pred.mean - 1.5f64.sin()).abs() < 1e-2);
//! ```

mod kernel;
mod regressor;

pub use kernel::{Kernel, KernelParams};
pub use regressor::{GaussianProcess, GpConfig, Prediction};
