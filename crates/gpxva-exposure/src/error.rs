//! Error types for exposure simulation and CVA.

use gpxva_core::CoreError;
use gpxva_math::MathError;
use gpxva_models::ModelError;
use thiserror::Error;

use crate::config::ValidationError;

/// A specialized Result type for exposure operations.
pub type ExposureResult<T> = Result<T, ExposureError>;

/// Errors raised while pricing, training surrogates or aggregating exposure.
#[derive(Error, Debug)]
pub enum ExposureError {
    /// Market or instrument model failure.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Numerical failure (GP fit, sampling, statistics).
    #[error(transparent)]
    Math(#[from] MathError),

    /// Core type error.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Netting set inconsistent with the market model.
    #[error("Invalid portfolio: {reason}")]
    InvalidPortfolio {
        /// Why it was rejected.
        reason: String,
    },

    /// Arrays that should line up do not.
    #[error("Shape mismatch: {reason}")]
    Shape {
        /// What disagreed.
        reason: String,
    },

    /// A single configuration field failed validation.
    #[error("Validation error: {message}")]
    Validation {
        /// Field that failed validation.
        field: String,
        /// Validation error message.
        message: String,
    },

    /// Several configuration fields failed validation.
    #[error("Multiple validation errors: {}", format_errors(.0))]
    MultipleValidationErrors(Vec<ValidationError>),

    /// TOML parse error.
    #[error("Config parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("Config serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ExposureError {
    /// Creates an invalid portfolio error.
    #[must_use]
    pub fn invalid_portfolio(reason: impl Into<String>) -> Self {
        Self::InvalidPortfolio {
            reason: reason.into(),
        }
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::Shape {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multiple_errors_display() {
        let err = ExposureError::MultipleValidationErrors(vec![
            ValidationError::new("simulation.paths", "must be positive"),
            ValidationError::new("credit.recovery", "must be below 1"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("simulation.paths: must be positive"));
        assert!(msg.contains("credit.recovery"));
    }
}
