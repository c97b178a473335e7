//! Offline upsampling command.

use super::common::{CliCorrelator, check_overlap, linear_to_db, resolve_geometry, rms};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use sarita_config::{CorrelatorMode, Geometry, ProcessorSettings, default_settings_path};
use sarita_io::{RenderOptions, Renderer, WavSpec, read_wav_channels, write_wav_channels};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args)]
pub struct UpsampleArgs {
    /// Sparse array recording (one channel per sensor)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output WAV file (one channel per dense point)
    #[arg(value_name = "OUTPUT")]
    output: PathBuf,

    /// Geometry file or name; defaults to the one in the settings file
    #[arg(short, long)]
    geometry: Option<PathBuf>,

    /// Settings file [default: user settings if present]
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Frame size in samples
    #[arg(long)]
    frame_size: Option<usize>,

    /// Frame overlap in percent (0-50; presets 12.5, 25, 50)
    #[arg(long)]
    overlap: Option<f32>,

    /// Correlation backend
    #[arg(long, value_enum)]
    correlator: Option<CliCorrelator>,

    /// Keep the engine latency at the start of the output
    #[arg(long)]
    no_compensate: bool,

    /// Output bit depth (16, 24 or 32 float)
    #[arg(long, default_value = "32")]
    bit_depth: u16,
}

/// Run the upsample command.
pub fn run(args: UpsampleArgs) -> anyhow::Result<()> {
    if ![16, 24, 32].contains(&args.bit_depth) {
        anyhow::bail!("Unsupported bit depth {} (use 16, 24 or 32)", args.bit_depth);
    }
    let overlap = args.overlap.map(check_overlap).transpose()?;

    let settings = load_settings(args.settings.as_ref())?;

    let geometry_arg = args
        .geometry
        .clone()
        .or_else(|| settings.geometry.clone())
        .ok_or_else(|| {
            anyhow::anyhow!("No geometry given. Use --geometry or set one in the settings file")
        })?;
    let geometry_path = resolve_geometry(&geometry_arg)?;
    let geometry = Arc::new(Geometry::load(&geometry_path)?);

    println!("Loading {}...", args.input.display());
    let (sparse, spec) = read_wav_channels(&args.input)?;
    let samples = sparse.first().map_or(0, Vec::len);
    println!(
        "  {} channels, {} samples, {} Hz, {:.2}s",
        sparse.len(),
        samples,
        spec.sample_rate,
        samples as f32 / spec.sample_rate as f32
    );
    println!(
        "Geometry: {} ({} -> {} channels)",
        geometry_path.display(),
        geometry.sparse_channels(),
        geometry.dense_grid_size()
    );

    let mut options = RenderOptions::from_settings(&settings);
    if let Some(frame_size) = args.frame_size {
        options.frame_size = frame_size;
    }
    if let Some(overlap) = overlap {
        options.overlap_percent = overlap;
    }
    if let Some(correlator) = args.correlator {
        options.correlator = sarita_engine::correlator_kind(CorrelatorMode::from(correlator));
    }
    options.compensate_latency = !args.no_compensate;

    let mut renderer = Renderer::new(geometry, spec.sample_rate, options)?;
    if let Some(message) = renderer.warnings().primary_message() {
        println!("Warning: {message}");
    }
    println!(
        "Processing: frame {}, overlap {:.1}%, latency {} samples{}",
        options.frame_size,
        options.overlap_percent,
        renderer.latency_samples(),
        if options.compensate_latency {
            " (compensated)"
        } else {
            ""
        }
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} frames ({eta})")?
            .progress_chars("##-"),
    );
    let dense = renderer.render(&sparse, |done, total| {
        pb.set_length(total as u64);
        pb.set_position(done as u64);
    })?;
    pb.finish_with_message("done");

    let input_rms = rms(&sparse.concat());
    let output_rms = rms(&dense.concat());
    println!("\nStats:");
    println!("  Frames: {}", renderer.frames_processed());
    println!("  Input:  RMS {:.1} dB", linear_to_db(input_rms));
    println!("  Output: RMS {:.1} dB", linear_to_db(output_rms));

    let out_spec = WavSpec {
        channels: dense.len() as u16,
        sample_rate: spec.sample_rate,
        bits_per_sample: args.bit_depth,
    };
    println!("\nWriting {}...", args.output.display());
    write_wav_channels(&args.output, &dense, out_spec)?;
    println!("Done!");

    Ok(())
}

/// Settings from `path`, else the user settings file if it exists, else
/// defaults.
fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<ProcessorSettings> {
    if let Some(path) = path {
        return Ok(ProcessorSettings::load(path)?);
    }
    let default = default_settings_path();
    if default.is_file() {
        tracing::debug!(path = %default.display(), "using user settings");
        return Ok(ProcessorSettings::load(&default)?);
    }
    Ok(ProcessorSettings::default())
}
