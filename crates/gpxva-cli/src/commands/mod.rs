//! CLI command implementations.

pub mod config;
pub mod price;
pub mod run;
pub mod simulate;

pub use config::ConfigArgs;
pub use price::PriceArgs;
pub use run::RunArgs;
pub use simulate::SimulateArgs;

use std::path::Path;

use gpxva_exposure::config::RunConfig;
use tracing::info;

use crate::error::{CliError, CliResult};

/// Loads a run configuration, falling back to the built-in demo.
pub fn load_config(path: Option<&Path>) -> CliResult<RunConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            RunConfig::from_file(path).map_err(|e| CliError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
        None => {
            info!("Using the built-in demo configuration");
            Ok(RunConfig::default())
        }
    }
}

/// Fails if `path` exists and overwriting was not requested.
pub fn check_overwrite(path: &Path, force: bool) -> CliResult<()> {
    if path.exists() && !force {
        return Err(CliError::FileExists(path.to_path_buf()));
    }
    Ok(())
}
