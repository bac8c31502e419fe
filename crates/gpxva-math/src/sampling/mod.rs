//! Sampling of the surrogate input space.
//!
//! Training inputs for a surrogate are drawn inside the box spanned by
//! the simulated factor values at one exposure date:
//!
//! - [`Bounds`]: the per-dimension min/max box, with clipping
//! - [`MinMaxScaler`]: maps the box onto the unit cube for the GP
//! - [`StratifiedSampler`]: uniform, Latin hypercube or quantile-mapped
//!   Latin hypercube designs

mod bounds;
mod scaler;
mod stratified;

pub use bounds::Bounds;
pub use scaler::MinMaxScaler;
pub use stratified::{latin_hypercube, EmpiricalMarginals, SamplingScheme, StratifiedSampler};
