//! # gpxva Exposure
//!
//! Exposure simulation and CVA for a netting set of interest rate swaps,
//! with Gaussian-process surrogates standing in for the analytical pricer.
//!
//! - **Portfolio**: The netting set and its checks against the market model
//! - **Pricers**: [`AnalyticalPricer`] and [`SurrogatePricer`] fill a
//!   [`PriceCube`] of values per instrument, path and date
//! - **Surrogates**: One GP per instrument and exposure date, trained on a
//!   stratified design over the simulated factor domain
//! - **Profiles**: EPE, ENE and PFE with Monte Carlo and GP error bars
//! - **CVA**: Trapezoid integration against counterparty default
//!   probabilities
//! - **Pipeline**: Runs both pricers on the same scenarios and compares them
//!
//! ## Example
//!
//! ```rust,no_run
//! use gpxva_exposure::prelude::*;
//!
//! let config = RunConfig::default();
//! let report = run(&config, None).unwrap();
//! println!(
//!     "CVA analytical {:.2}, surrogate {:.2}",
//!     report.analytical.cva.value, report.surrogate.cva.value
//! );
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::similar_names)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::too_many_lines)]

pub mod comparison;
pub mod config;
pub mod cva;
pub mod error;
pub mod parallel;
pub mod pipeline;
pub mod portfolio;
pub mod pricer;
pub mod profile;
pub mod surrogate;

pub use pricer::{AnalyticalPricer, PriceCube, Pricer, SurrogatePricer};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::comparison::{Comparison, RunResult};
    pub use crate::config::{RunConfig, Validate, ValidationError};
    pub use crate::cva::{CvaCalculator, CvaEstimate};
    pub use crate::error::{ExposureError, ExposureResult};
    pub use crate::pipeline::{run, simulate, CvaReport};
    pub use crate::portfolio::Portfolio;
    pub use crate::pricer::{AnalyticalPricer, ClippingStats, PriceCube, Pricer, SurrogatePricer};
    pub use crate::profile::{ExposureProfile, ProfileConfig};
    pub use crate::surrogate::{
        Surrogate, SurrogateConfig, SurrogateDiagnostics, SurrogateKind, SurrogateSet,
    };
}

pub use error::{ExposureError, ExposureResult};
