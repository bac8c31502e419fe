//! # gpxva Core
//!
//! Core types shared by the gpxva crates.
//!
//! - **Currency**: ISO 4217 codes for the currencies a netting set can trade in
//! - **Frequency**: Fixed-leg payment frequencies
//! - **TimeGrid**: Exposure dates in year fractions, starting at the valuation date
//!
//! ## Example
//!
//! ```rust
//! use gpxva_core::prelude::*;
//!
//! let grid = TimeGrid::uniform(10.0, 40).unwrap();
//! assert_eq!(grid.len(), 41);
//! assert_eq!(Currency::from_code("eur"), Some(Currency::EUR));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod types;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{CoreError, CoreResult};
    pub use crate::types::{Currency, Frequency, TimeGrid};
}

pub use error::{CoreError, CoreResult};
pub use types::{Currency, Frequency, TimeGrid};
