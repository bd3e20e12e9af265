//! CLI command implementations.

mod info;
mod run;
mod validate;

pub use info::run_info;
pub use run::run_pipeline;
pub use validate::run_validate;

use std::path::Path;

use config_loader::ConfigLoader;
use contracts::ObservationBlueprint;

use crate::error::{CliError, Result};

/// Load and validate a blueprint from disk.
pub fn load_blueprint(path: &Path) -> Result<ObservationBlueprint> {
    if !path.exists() {
        return Err(CliError::config_not_found(path.display().to_string()));
    }
    ConfigLoader::load_from_path(path).map_err(|e| CliError::config_load(e.to_string()))
}
