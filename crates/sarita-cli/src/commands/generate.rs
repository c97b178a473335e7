//! Demo geometry and test signal generation.
//!
//! Both generators assume a ring array: `sensors` microphones evenly spaced
//! on the horizontal plane at `radius` metres, sensor 0 at azimuth 0.

use super::common::resolve_geometry;
use clap::{Args, Subcommand, ValueEnum};
use sarita_config::{DensePoint, Geometry, GeometryBuilder, ensure_user_geometry_dir};
use sarita_io::{WavSpec, write_wav_channels};
use std::f32::consts::TAU;
use std::path::PathBuf;

const SPEED_OF_SOUND: f32 = 343.0;

/// Waveform types for CLI
#[derive(Clone, Copy, Debug, Default, ValueEnum)]
pub enum CliWaveform {
    #[default]
    Sine,
    Noise,
}

#[derive(Args)]
pub struct GenerateArgs {
    #[command(subcommand)]
    command: GenerateCommand,
}

#[derive(Subcommand)]
enum GenerateCommand {
    /// Generate a ring-array geometry interpolating between adjacent sensors
    Geometry {
        /// Output geometry file, or a name with --install
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Number of sensors on the ring
        #[arg(long, default_value = "8")]
        sensors: usize,

        /// Dense points per sensor gap (1 reproduces the sensors)
        #[arg(long, default_value = "2")]
        density: usize,

        /// Ring radius in metres
        #[arg(long, default_value = "0.042")]
        radius: f32,

        /// Sample rate
        #[arg(long, default_value = "48000")]
        sample_rate: u32,

        /// Shift bound in samples [default: derived from sensor spacing]
        #[arg(long)]
        max_shift: Option<usize>,

        /// Save into the user geometry directory
        #[arg(long)]
        install: bool,
    },

    /// Generate a plane wave as captured by a ring array
    Signal {
        /// Output WAV file
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// Take sensor count, radius and sample rate from this geometry
        #[arg(short, long)]
        geometry: Option<PathBuf>,

        /// Number of sensors on the ring
        #[arg(long, default_value = "8")]
        sensors: usize,

        /// Ring radius in metres
        #[arg(long, default_value = "0.042")]
        radius: f32,

        /// Sample rate
        #[arg(long, default_value = "48000")]
        sample_rate: u32,

        /// Direction of arrival in degrees
        #[arg(long, default_value = "30.0")]
        azimuth: f32,

        /// Waveform type
        #[arg(long, value_enum, default_value = "sine")]
        waveform: CliWaveform,

        /// Frequency in Hz (sine only)
        #[arg(long, default_value = "1000.0")]
        freq: f32,

        /// Duration in seconds
        #[arg(long, default_value = "1.0")]
        duration: f32,

        /// Amplitude (0-1)
        #[arg(long, default_value = "0.5")]
        amplitude: f32,
    },
}

pub fn run(args: GenerateArgs) -> anyhow::Result<()> {
    match args.command {
        GenerateCommand::Geometry {
            output,
            sensors,
            density,
            radius,
            sample_rate,
            max_shift,
            install,
        } => {
            if sensors < 2 || density == 0 {
                anyhow::bail!("Need at least 2 sensors and a density of at least 1");
            }
            let max_shift = max_shift.unwrap_or_else(|| spacing_shift(sensors, radius, sample_rate));
            let geometry = ring_geometry(sensors, density, radius, sample_rate, max_shift)?;

            let path = if install {
                let mut path = ensure_user_geometry_dir()?.join(&output);
                path.set_extension(sarita_config::GEOMETRY_EXTENSION);
                path
            } else {
                output
            };
            geometry.save(&path)?;

            println!(
                "Generated ring geometry: {} sensors -> {} points, max shift {} samples",
                sensors,
                geometry.dense_grid_size(),
                max_shift
            );
            println!("Saved to {}", path.display());
        }

        GenerateCommand::Signal {
            output,
            geometry,
            sensors,
            radius,
            sample_rate,
            azimuth,
            waveform,
            freq,
            duration,
            amplitude,
        } => {
            let (sensors, radius, sample_rate) = match geometry {
                Some(name) => {
                    let g = Geometry::load(resolve_geometry(&name)?)?;
                    (g.sparse_channels(), g.radius(), g.sample_rate())
                }
                None => (sensors, radius, sample_rate),
            };
            if sensors == 0 {
                anyhow::bail!("Need at least one sensor");
            }

            let len = (duration * sample_rate as f32).round() as usize;
            let delays = arrival_delays(sensors, radius, sample_rate, azimuth.to_radians());
            let channels = plane_wave(&delays, len, sample_rate, waveform, freq, amplitude);

            let spec = WavSpec {
                channels: sensors as u16,
                sample_rate,
                bits_per_sample: 32,
            };
            write_wav_channels(&output, &channels, spec)?;

            println!(
                "Generated {} channel {:?} at {:.1}° ({:.2}s), delays {:?}",
                sensors, waveform, azimuth, duration, delays
            );
            println!("Saved to {}", output.display());
        }
    }

    Ok(())
}

/// Largest delay between adjacent sensors in samples, plus one.
fn spacing_shift(sensors: usize, radius: f32, sample_rate: u32) -> usize {
    let chord = 2.0 * radius * (std::f32::consts::PI / sensors as f32).sin();
    (chord / SPEED_OF_SOUND * sample_rate as f32).ceil() as usize + 1
}

/// Ring geometry with `density` points per gap; point `k` of gap `i`
/// blends sensor `i` into sensor `i + 1` linearly.
fn ring_geometry(
    sensors: usize,
    density: usize,
    radius: f32,
    sample_rate: u32,
    max_shift: usize,
) -> anyhow::Result<Geometry> {
    let dense = sensors * density;
    let gap = TAU / sensors as f32;
    let quadrature = 1.0 / dense as f32;

    let mut builder = GeometryBuilder::new(sample_rate)
        .orders(((sensors - 1) / 2) as u32, ((dense - 1) / 2) as u32)
        .radius(radius)
        .max_shift_overall(max_shift);

    for i in 0..sensors {
        let next = (i + 1) % sensors;
        for k in 0..density {
            let t = k as f32 / density as f32;
            let point = DensePoint::new(i as f32 * gap + t * gap, 0.0, quadrature);
            builder = builder.point(if k == 0 {
                point.neighbor(i, 1.0)
            } else {
                point.neighbor(i, 1.0 - t).neighbor(next, t)
            });
        }
    }

    Ok(builder.build()?)
}

/// Whole-sample arrival delay per sensor for a plane wave from `azimuth`,
/// relative to the first sensor reached.
fn arrival_delays(sensors: usize, radius: f32, sample_rate: u32, azimuth: f32) -> Vec<usize> {
    let scale = radius * sample_rate as f32 / SPEED_OF_SOUND;
    (0..sensors)
        .map(|i| {
            let angle = i as f32 * TAU / sensors as f32 - azimuth;
            (scale * (1.0 - angle.cos())).round() as usize
        })
        .collect()
}

fn plane_wave(
    delays: &[usize],
    len: usize,
    sample_rate: u32,
    waveform: CliWaveform,
    freq: f32,
    amplitude: f32,
) -> Vec<Vec<f32>> {
    let longest = delays.iter().copied().max().unwrap_or(0);
    let source: Vec<f32> = match waveform {
        CliWaveform::Sine => (0..len + longest)
            .map(|n| amplitude * (TAU * freq * n as f32 / sample_rate as f32).sin())
            .collect(),
        CliWaveform::Noise => {
            let mut state = 0x2545_f491_u32;
            (0..len + longest)
                .map(|_| {
                    state ^= state << 13;
                    state ^= state >> 17;
                    state ^= state << 5;
                    amplitude * (state as f32 / u32::MAX as f32 * 2.0 - 1.0)
                })
                .collect()
        }
    };

    // source[longest + n] is the wave at the first sensor at time n
    delays
        .iter()
        .map(|&d| source[longest - d..longest - d + len].to_vec())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_geometry_layout() {
        let g = ring_geometry(4, 3, 0.05, 48000, 3).unwrap();
        assert_eq!(g.dense_grid_size(), 12);
        assert_eq!(g.sparse_channels(), 4);
        assert_eq!(g.neighbors(0), &[0]);
        assert_eq!(g.neighbors(1), &[0, 1]);
        assert_eq!(g.neighbors(11), &[3, 0]);
        let w = g.weights(2);
        assert!((w[0] - 1.0 / 3.0).abs() < 1e-6);
        assert!((w[1] - 2.0 / 3.0).abs() < 1e-6);
        // one stored pair per gap
        assert_eq!(g.combinations().len(), 4);
    }

    #[test]
    fn test_spacing_shift_grows_with_radius() {
        assert!(spacing_shift(8, 0.1, 48000) > spacing_shift(8, 0.04, 48000));
        assert!(spacing_shift(8, 0.042, 48000) >= 1);
    }

    #[test]
    fn test_arrival_delays_nearest_sensor_first() {
        let delays = arrival_delays(4, 0.1, 48000, 0.0);
        assert_eq!(delays[0], 0);
        assert_eq!(delays[1], delays[3]);
        assert!(delays[2] > delays[1]);
    }

    #[test]
    fn test_plane_wave_is_delayed_copy() {
        let channels = plane_wave(&[0, 3], 100, 48000, CliWaveform::Noise, 0.0, 0.5);
        assert_eq!(channels[1][3..], channels[0][..97]);
    }
}
