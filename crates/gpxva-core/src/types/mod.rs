//! Domain types.

mod currency;
mod frequency;
mod time_grid;

pub use currency::Currency;
pub use frequency::Frequency;
pub use time_grid::TimeGrid;
