//! Settings file for the retrieval engines
//!
//! A single TOML document with optional `[image]` and `[audio]` sections;
//! every key falls back to the defaults in [`crate::config`].

use crate::config::{AudioConfig, ImageConfig};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MedleySettings {
    #[serde(default)]
    pub image: ImageConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

impl MedleySettings {
    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings = Self::from_toml(&content).map_err(|e| match e {
            Error::InvalidConfig(msg) => {
                Error::InvalidConfig(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        log::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let settings: MedleySettings = toml::from_str(content)
            .map_err(|e| Error::InvalidConfig(format!("failed to parse TOML: {}", e)))?;
        settings.image.validate()?;
        settings.audio.validate()?;
        Ok(settings)
    }
}
