//! Error types for core types.

use thiserror::Error;

/// A specialized Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised when constructing core types.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Unknown ISO currency code.
    #[error("Unknown currency code: '{0}'")]
    UnknownCurrency(String),

    /// Unknown payment frequency name.
    #[error("Unknown frequency: '{0}'")]
    UnknownFrequency(String),

    /// Time grid is malformed.
    #[error("Invalid time grid: {reason}")]
    InvalidTimeGrid {
        /// Why the grid was rejected.
        reason: String,
    },
}

impl CoreError {
    /// Creates an invalid time grid error.
    #[must_use]
    pub fn invalid_grid(reason: impl Into<String>) -> Self {
        Self::InvalidTimeGrid {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::UnknownCurrency("XXX".into());
        assert!(err.to_string().contains("XXX"));

        let err = CoreError::invalid_grid("empty");
        assert_eq!(err.to_string(), "Invalid time grid: empty");
    }
}
