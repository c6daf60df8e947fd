//! Command implementations.

mod info;
mod run;
mod validate;

use std::path::Path;

use anyhow::{Context, Result};
use contracts::RoverBlueprint;
use lane_rover::CliError;
use tracing::info;

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

/// Load a configuration file, or the built-in defaults when none is given
fn load_blueprint(path: Option<&Path>) -> Result<RoverBlueprint> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(RoverBlueprint::default());
    };
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()).into());
    }
    info!(config = %path.display(), "Loading configuration");
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}
