//! Error types for market models.

use gpxva_core::{CoreError, Currency};
use gpxva_math::MathError;
use thiserror::Error;

/// A specialized Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by curves, models, instruments and scenario handling.
#[derive(Error, Debug)]
pub enum ModelError {
    /// Numerical failure.
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// Core type error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Model parameter out of range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Instrument definition is inconsistent.
    #[error("Invalid instrument '{id}': {reason}")]
    InvalidInstrument {
        /// Instrument id.
        id: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No factor of the requested kind for a currency.
    #[error("No {kind} factor for {currency}")]
    MissingFactor {
        /// Currency looked up.
        currency: Currency,
        /// "rate" or "fx".
        kind: &'static str,
    },

    /// Scenario data has the wrong shape or content.
    #[error("Invalid scenario data: {0}")]
    Scenario(String),

    /// CSV parsing or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ModelError {
    /// Creates an invalid parameter error.
    #[must_use]
    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid instrument error.
    #[must_use]
    pub fn invalid_instrument(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInstrument {
            id: id.into(),
            reason: reason.into(),
        }
    }

    /// Creates a scenario shape error.
    #[must_use]
    pub fn scenario(reason: impl Into<String>) -> Self {
        Self::Scenario(reason.into())
    }
}
