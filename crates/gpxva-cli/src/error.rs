//! CLI error types.

use std::path::PathBuf;

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Refusing to replace an existing file.
    #[error("{0} already exists. Use --force to overwrite.")]
    FileExists(PathBuf),

    /// Configuration could not be loaded.
    #[error("Configuration error in {path}: {message}")]
    Config {
        /// File that failed.
        path: PathBuf,
        /// What went wrong.
        message: String,
    },

    /// Output format not available for a command.
    #[error("Format '{0}' is not supported here")]
    UnsupportedFormat(String),
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
