//! # gpxva Models
//!
//! Market and instrument models for the surrogate CVA pipeline.
//!
//! - **Curves**: Zero curves with linear zero-rate interpolation
//! - **Hull-White**: One-factor short rate fitted to the initial curve,
//!   with closed-form zero-coupon bond prices
//! - **FX**: Lognormal spot rates driven by the rate differential
//! - **Credit**: Piecewise-flat hazard rate curves
//! - **Swaps**: Fixed-for-floating swaps priced analytically on a short-rate state
//! - **Market**: The joint multi-currency factor model and its state layout
//! - **Scenarios**: Correlated path simulation and CSV import/export
//!
//! ## Example
//!
//! ```rust
//! use gpxva_core::prelude::*;
//! use gpxva_models::prelude::*;
//!
//! let curve = ZeroCurve::flat(0.03).unwrap();
//! let hw = HullWhite::new(0.05, 0.01, curve).unwrap();
//! let swap = InterestRateSwap::builder()
//!     .id("USD-5Y")
//!     .currency(Currency::USD)
//!     .notional(1_000_000.0)
//!     .maturity(5.0)
//!     .fixed_rate(0.03)
//!     .build()
//!     .unwrap();
//!
//! let par = swap.par_rate(&hw);
//! assert!((par - 0.03).abs() < 5e-3);
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
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::similar_names)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::return_self_not_must_use)]

pub mod credit;
pub mod curve;
pub mod error;
pub mod fx;
pub mod hull_white;
pub mod market;
pub mod scenario;
pub mod swap;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::credit::CreditCurve;
    pub use crate::curve::ZeroCurve;
    pub use crate::error::{ModelError, ModelResult};
    pub use crate::fx::FxModel;
    pub use crate::hull_white::HullWhite;
    pub use crate::market::{FactorLayout, FxFactor, MarketModel, RateFactor};
    pub use crate::scenario::{ScenarioGenerator, ScenarioSet, SimulationConfig};
    pub use crate::swap::{InterestRateSwap, SwapBuilder, SwapDirection};
}

pub use error::{ModelError, ModelResult};
