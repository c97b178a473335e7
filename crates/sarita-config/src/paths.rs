//! Platform-specific paths for geometry files and settings.
//!
//! # Directory Structure
//!
//! - **User config**: `~/.config/sarita/` (Linux), `~/Library/Application Support/sarita/` (macOS), `%APPDATA%\sarita\` (Windows)
//! - **User geometries**: `<user config>/geometries/`
//! - **Settings file**: `<user config>/settings.toml`
//!
//! # Example
//!
//! ```rust,no_run
//! use sarita_config::paths;
//!
//! if let Some(path) = paths::find_geometry("em32_to_64") {
//!     println!("Found geometry at: {:?}", path);
//! }
//! ```

use crate::layout::GEOMETRY_EXTENSION;
use std::path::{Path, PathBuf};

/// Application name used for directory paths.
const APP_NAME: &str = "sarita";

/// Subdirectory name for geometry files.
const GEOMETRY_SUBDIR: &str = "geometries";

/// Settings file name.
const SETTINGS_FILE: &str = "settings.toml";

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Returns the user-specific geometry directory.
pub fn user_geometry_dir() -> PathBuf {
    user_config_dir().join(GEOMETRY_SUBDIR)
}

/// Returns the default settings file path.
pub fn default_settings_path() -> PathBuf {
    user_config_dir().join(SETTINGS_FILE)
}

/// Find a geometry file by name.
///
/// `name` may be a path to an existing file, or a name (with or without the
/// `.cfg` extension) looked up in [`user_geometry_dir`].
pub fn find_geometry(name: &str) -> Option<PathBuf> {
    find_geometry_in(name, &user_geometry_dir())
}

fn find_geometry_in(name: &str, dir: &Path) -> Option<PathBuf> {
    let path = PathBuf::from(name);
    if path.is_file() {
        return Some(path);
    }

    let filename = if path
        .extension()
        .is_some_and(|ext| ext == GEOMETRY_EXTENSION)
    {
        name.to_string()
    } else {
        format!("{name}.{GEOMETRY_EXTENSION}")
    };

    let candidate = dir.join(filename);
    candidate.is_file().then_some(candidate)
}

/// Finds and loads a geometry by path or name.
pub fn load_geometry(name: &str) -> Result<crate::Geometry, crate::ConfigError> {
    let path =
        find_geometry(name).ok_or_else(|| crate::ConfigError::GeometryNotFound(name.to_string()))?;
    crate::Geometry::load(path)
}

/// Ensure the user geometry directory exists.
pub fn ensure_user_geometry_dir() -> Result<PathBuf, crate::ConfigError> {
    let dir = user_geometry_dir();

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| crate::ConfigError::create_dir(&dir, e))?;
    }

    Ok(dir)
}

/// Lists geometry files in `dir`, sorted by name.
///
/// Returns an empty vector if the directory doesn't exist or can't be read.
pub fn list_geometries_in(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e == GEOMETRY_EXTENSION))
        .collect();
    files.sort();
    files
}

/// Lists geometry files in the user geometry directory.
pub fn list_user_geometries() -> Vec<PathBuf> {
    list_geometries_in(&user_geometry_dir())
}
