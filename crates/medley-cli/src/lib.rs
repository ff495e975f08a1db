//! Shared pieces of the medley command-line tools

pub mod output;

use anyhow::{Context, Result};
use medley_core::MedleySettings;
use std::path::Path;

/// Install the logger: silent unless `verbose` or `RUST_LOG` asks otherwise
pub fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Info
    } else {
        log::LevelFilter::Off
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .parse_default_env()
        .init();
}

/// Settings from `path`, or the defaults when no file is given
pub fn load_settings(path: Option<&Path>) -> Result<MedleySettings> {
    match path {
        Some(path) => MedleySettings::load(path)
            .with_context(|| format!("Failed to load settings from {}", path.display())),
        None => Ok(MedleySettings::default()),
    }
}
