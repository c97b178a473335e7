//! Error types for configuration operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading, saving or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write a file
    #[error("failed to write file '{path}': {source}")]
    WriteFile {
        /// Path of the file that could not be written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Geometry data ended before a section was complete
    #[error("geometry data truncated in {section}")]
    Truncated {
        /// Section being read when the data ran out.
        section: &'static str,
    },

    /// Dense grid larger than the supported maximum
    #[error("dense grid of {size} points exceeds the maximum of {max}")]
    GridTooLarge {
        /// Dense grid size from the header.
        size: usize,
        /// Supported maximum.
        max: usize,
    },

    /// Geometry file not found by name
    #[error("geometry not found: {0}")]
    GeometryNotFound(String),

    /// Failed to parse TOML
    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Failed to serialize TOML
    #[error("failed to serialize TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// Validation errors
    #[error("validation failed: {0}")]
    Validation(#[from] crate::validation::ValidationError),

    /// Failed to create directory
    #[error("failed to create directory '{path}': {source}")]
    CreateDir {
        /// Path of the directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a write file error.
    pub fn write_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::WriteFile {
            path: path.into(),
            source,
        }
    }

    /// Create a create directory error.
    pub fn create_dir(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Create a truncation error for `section`.
    pub fn truncated(section: &'static str) -> Self {
        ConfigError::Truncated { section }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;
    use std::error::Error;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "mock")
    }

    #[test]
    fn read_file_factory_produces_correct_variant() {
        let err = ConfigError::read_file("/some/array.cfg", mock_io_err());
        assert!(
            matches!(err, ConfigError::ReadFile { ref path, .. } if path == std::path::Path::new("/some/array.cfg"))
        );
        assert!(err.source().is_some(), "ReadFile must expose I/O source");
    }

    #[test]
    fn write_file_display() {
        let err = ConfigError::write_file("/a/b.toml", mock_io_err());
        let msg = err.to_string();
        assert!(msg.contains("failed to write file"), "got: {msg}");
        assert!(msg.contains("/a/b.toml"), "got: {msg}");
    }

    #[test]
    fn truncated_display() {
        let err = ConfigError::truncated("neighbor weights");
        assert_eq!(err.to_string(), "geometry data truncated in neighbor weights");
        assert!(err.source().is_none());
    }

    #[test]
    fn grid_too_large_display() {
        let err = ConfigError::GridTooLarge { size: 65, max: 64 };
        assert_eq!(
            err.to_string(),
            "dense grid of 65 points exceeds the maximum of 64"
        );
    }

    #[test]
    fn validation_from_conversion() {
        let err: ConfigError = ValidationError::EmptyGrid.into();
        assert!(matches!(err, ConfigError::Validation(ValidationError::EmptyGrid)));
        assert!(err.to_string().starts_with("validation failed"));
    }
}
