//! Processor settings stored as TOML.
//!
//! ```toml
//! frame_size = 256
//! overlap_percent = 25.0
//! correlator = "auto"
//! geometry = "eigenmike32_to_64.cfg"
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Overlap choices offered to users, in percent of the frame.
pub const OVERLAP_PRESETS: [f32; 3] = [12.5, 25.0, 50.0];

/// Which cross-correlation backend the engine should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelatorMode {
    /// Time domain.
    Direct,
    /// Frequency domain.
    Fft,
    /// Chosen by frame length.
    #[default]
    Auto,
}

fn default_frame_size() -> usize {
    256
}

fn default_overlap_percent() -> f32 {
    25.0
}

/// Engine settings that persist between sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorSettings {
    /// Internal frame length in samples.
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,

    /// Frame overlap in percent, `[0, 50]`.
    #[serde(default = "default_overlap_percent")]
    pub overlap_percent: f32,

    /// Correlation backend.
    #[serde(default)]
    pub correlator: CorrelatorMode,

    /// Geometry file, by path or name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<PathBuf>,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            frame_size: default_frame_size(),
            overlap_percent: default_overlap_percent(),
            correlator: CorrelatorMode::default(),
            geometry: None,
        }
    }
}

impl ProcessorSettings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        let settings: ProcessorSettings = toml::from_str(&content)?;
        Ok(settings)
    }

    /// Load settings from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the settings to a TOML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Convert the settings to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Overlap clamped to the supported range.
    pub fn clamped_overlap(&self) -> f32 {
        if self.overlap_percent.is_finite() {
            self.overlap_percent.clamp(0.0, 50.0)
        } else {
            default_overlap_percent()
        }
    }
}
