//! Geometry and settings for the SARITA upsampling engine.
//!
//! A geometry file tells the engine how a sparse microphone array maps onto
//! a dense virtual grid: the neighbours of every dense point, their weights,
//! how far each may be shifted, and which sensor-pair correlations to
//! compute per frame.
//!
//! # Features
//!
//! - **Geometry**: Binary geometry files, loaded and validated into an
//!   immutable [`Geometry`]
//! - **Builder**: Construct geometries in code with [`GeometryBuilder`]
//! - **Settings**: Frame size, overlap and correlator choice as TOML
//! - **Paths**: Platform-specific config and geometry directories
//!
//! # Example
//!
//! ```rust,no_run
//! use sarita_config::{Geometry, ProcessorSettings, validate_channels};
//!
//! let geometry = Geometry::load("em32_to_64.cfg").unwrap();
//! validate_channels(&geometry, 32).unwrap();
//! println!("{}", geometry.summary());
//!
//! let settings = ProcessorSettings::load("settings.toml").unwrap_or_default();
//! assert!(settings.frame_size > 0);
//! ```

mod error;
mod geometry;
mod layout;
mod settings;

/// Platform-specific paths for geometries and settings.
pub mod paths;

/// Geometry validation.
pub mod validation;

pub use error::ConfigError;
pub use geometry::{
    CombinationRef, DenseDirection, DensePoint, Geometry, GeometryBuilder, GeometryHeader,
    GeometrySummary, GeometryTables, MAX_SENSORS,
};
pub use layout::GEOMETRY_EXTENSION;
pub use paths::{
    default_settings_path, ensure_user_geometry_dir, find_geometry, list_user_geometries,
    load_geometry, user_config_dir, user_geometry_dir,
};
pub use settings::{CorrelatorMode, OVERLAP_PRESETS, ProcessorSettings};
pub use validation::{ValidationError, ValidationResult, validate_channels, validate_tables};
