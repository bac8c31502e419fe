//! # gpxva Math
//!
//! Numerical building blocks for the gpxva surrogate CVA workspace.
//!
//! This crate provides:
//!
//! - **Linear Algebra**: Cholesky factorisation with jitter, triangular solves
//! - **Optimization**: Nelder-Mead simplex minimisation
//! - **Interpolation**: Linear interpolation for zero curves
//! - **Statistics**: Moments, standard errors, empirical quantiles
//! - **Sampling**: Min/max scaling, domain clipping, stratified (Latin hypercube) designs
//! - **Gaussian Processes**: Exact GP regression with ARD kernels and
//!   marginal-likelihood hyperparameter fitting
//!
//! ## Design Philosophy
//!
//! - **Numerical Stability**: Cholesky with escalating jitter, log-space hyperparameters
//! - **Reproducible**: Every random draw comes from a caller-seeded RNG

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unreadable_literal)]
#![allow(clippy::needless_range_loop)]
#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod gp;
pub mod interpolation;
pub mod linear_algebra;
pub mod optimization;
pub mod sampling;
pub mod statistics;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{MathError, MathResult};
    pub use crate::gp::{GaussianProcess, GpConfig, Kernel, KernelParams, Prediction};
    pub use crate::interpolation::{Interpolator, LinearInterpolator};
    pub use crate::optimization::{nelder_mead, OptimizationConfig, OptimizationResult};
    pub use crate::sampling::{
        latin_hypercube, Bounds, EmpiricalMarginals, MinMaxScaler, SamplingScheme,
        StratifiedSampler,
    };
    pub use crate::statistics::{mean, normal_quantile, quantile, std_error, variance, Moments};
}

pub use error::{MathError, MathResult};
