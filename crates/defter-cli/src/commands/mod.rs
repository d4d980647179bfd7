//! CLI command implementations.

pub mod batch;
pub mod config;
pub mod ledger;
pub mod process;

use std::path::Path;

use defter_core::DefterConfig;

/// Load the configuration file, falling back to defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<DefterConfig> {
    match config_path {
        Some(path) => Ok(DefterConfig::from_file(Path::new(path))?),
        None => Ok(DefterConfig::default()),
    }
}
