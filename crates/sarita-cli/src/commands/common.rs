//! Shared CLI helpers used across multiple commands.

use clap::ValueEnum;
use sarita_config::{CorrelatorMode, OVERLAP_PRESETS, find_geometry};
use std::path::{Path, PathBuf};

/// Correlator choice for CLI flags.
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum CliCorrelator {
    Direct,
    Fft,
    #[default]
    Auto,
}

impl From<CliCorrelator> for CorrelatorMode {
    fn from(c: CliCorrelator) -> Self {
        match c {
            CliCorrelator::Direct => CorrelatorMode::Direct,
            CliCorrelator::Fft => CorrelatorMode::Fft,
            CliCorrelator::Auto => CorrelatorMode::Auto,
        }
    }
}

/// Resolve a geometry given as a path or as a name in the user geometry
/// directory.
pub fn resolve_geometry(name: &Path) -> anyhow::Result<PathBuf> {
    if name.is_file() {
        return Ok(name.to_path_buf());
    }
    if let Some(path) = name.to_str().and_then(find_geometry) {
        return Ok(path);
    }
    anyhow::bail!(
        "Geometry '{}' not found. Use 'sarita info' to list installed geometries.",
        name.display()
    )
}

/// Validate an overlap given on the command line.
///
/// Values outside `[0, 50]` are rejected. Values in range that are not one
/// of [`OVERLAP_PRESETS`] are accepted with a note.
pub fn check_overlap(percent: f32) -> anyhow::Result<f32> {
    let presets = OVERLAP_PRESETS
        .iter()
        .map(|p| format!("{p}"))
        .collect::<Vec<_>>()
        .join(", ");
    if !(0.0..=50.0).contains(&percent) {
        anyhow::bail!("Overlap {percent}% is out of range (0-50, presets: {presets})");
    }
    if percent != 0.0 && !OVERLAP_PRESETS.contains(&percent) {
        tracing::info!(percent, presets = %presets, "overlap is not one of the presets");
    }
    Ok(percent)
}

/// True for paths ending in `.wav`, ignoring case.
pub fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("wav"))
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        -120.0
    } else {
        20.0 * linear.log10()
    }
}
