//! Display geometry or WAV file metadata.

use super::common::{is_wav, resolve_geometry};
use clap::Args;
use sarita_config::{Geometry, list_user_geometries, user_geometry_dir};
use sarita_io::{WavFormat, read_wav_info};
use std::path::{Path, PathBuf};

/// Display geometry or WAV file information.
#[derive(Args)]
pub struct InfoArgs {
    /// Geometry file or name, or a WAV file. Lists installed geometries when omitted.
    pub file: Option<PathBuf>,

    /// Print every dense point with its neighbours and weights
    #[arg(long)]
    pub points: bool,
}

/// Run the info command.
pub fn run(args: InfoArgs) -> anyhow::Result<()> {
    match &args.file {
        None => list_geometries(),
        Some(file) if is_wav(file) => wav_info(file),
        Some(file) => geometry_info(file, args.points),
    }
}

fn list_geometries() -> anyhow::Result<()> {
    let dir = user_geometry_dir();
    let files = list_user_geometries();
    println!("Geometries in {}:", dir.display());
    if files.is_empty() {
        println!("  (none)");
    }
    for path in files {
        match Geometry::load(&path) {
            Ok(g) => println!(
                "  {:<24} {} -> {} points, order {} -> {}",
                file_stem(&path),
                g.sparse_channels(),
                g.dense_grid_size(),
                g.source_order(),
                g.target_order()
            ),
            Err(e) => println!("  {:<24} invalid: {e}", file_stem(&path)),
        }
    }
    Ok(())
}

fn geometry_info(name: &Path, points: bool) -> anyhow::Result<()> {
    let path = resolve_geometry(name)?;
    let geometry = Geometry::load(&path)?;

    println!("File:              {}", path.display());
    println!("{}", geometry.summary());
    println!("Sensor Pairs:      {}", geometry.combinations().len());
    println!("Neighbour List:    {}", geometry.neighbor_list_len());
    println!("Array Radius:      {:.4} m", geometry.radius());

    if points {
        println!("\nDense points:");
        for d in 0..geometry.dense_grid_size() {
            let dir = geometry.direction(d);
            let neighbours: Vec<String> = geometry
                .neighbors(d)
                .iter()
                .zip(geometry.weights(d))
                .map(|(n, w)| format!("{n}:{w:.3}"))
                .collect();
            println!(
                "  {:>4}  az {:>7.2}°  el {:>6.2}°  [{}]",
                d,
                dir.azimuth.to_degrees(),
                dir.elevation.to_degrees(),
                neighbours.join(" ")
            );
        }
    }

    Ok(())
}

fn wav_info(path: &Path) -> anyhow::Result<()> {
    let info = read_wav_info(path)?;

    let format_str = match info.format {
        WavFormat::Pcm => "PCM",
        WavFormat::IeeeFloat => "IEEE Float",
    };

    println!("File:        {}", path.display());
    println!("Format:      {} {}-bit", format_str, info.bits_per_sample);
    println!("Channels:    {}", info.channels);
    println!("Sample Rate: {} Hz", info.sample_rate);
    println!(
        "Duration:    {:.3}s ({} frames)",
        info.duration_secs, info.num_frames
    );

    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
