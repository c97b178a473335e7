//! Multichannel WAV reading and writing.
//!
//! Samples are held planar: one `Vec<f32>` per channel.

use crate::{Error, Result, common_length};
use hound::{SampleFormat, WavReader, WavWriter};
use std::path::Path;

/// WAV audio encoding format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WavFormat {
    /// Linear PCM (integer samples).
    Pcm,
    /// IEEE 754 floating-point samples.
    IeeeFloat,
}

/// Header facts of a recording, read without decoding samples.
#[derive(Debug, Clone)]
pub struct WavInfo {
    /// Channel count: sensors for array recordings, points for dense output.
    pub channels: u16,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Bit depth per sample.
    pub bits_per_sample: u16,
    /// Samples per channel.
    pub num_frames: u64,
    /// Duration in seconds.
    pub duration_secs: f64,
    /// Audio encoding format.
    pub format: WavFormat,
}

/// Reads the header of `path`, e.g. to check a recording's channel count
/// against a geometry before rendering.
pub fn read_wav_info<P: AsRef<Path>>(path: P) -> Result<WavInfo> {
    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    let num_frames = u64::from(reader.len()) / u64::from(spec.channels.max(1));
    let duration_secs = num_frames as f64 / spec.sample_rate as f64;

    let format = match spec.sample_format {
        SampleFormat::Float => WavFormat::IeeeFloat,
        SampleFormat::Int => WavFormat::Pcm,
    };

    Ok(WavInfo {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bits_per_sample,
        num_frames,
        duration_secs,
        format,
    })
}

/// Output format for [`write_wav_channels`].
///
/// `channels` is informational when writing; [`write_wav_channels`] takes
/// the count from the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavSpec {
    /// Channel count.
    pub channels: u16,
    /// Sample rate in Hz; should match the geometry.
    pub sample_rate: u32,
    /// Bit depth per sample (16, 24 or 32; 32 is written as float).
    pub bits_per_sample: u16,
}

impl Default for WavSpec {
    fn default() -> Self {
        Self {
            channels: 1,
            sample_rate: 48000,
            bits_per_sample: 32,
        }
    }
}

impl From<hound::WavSpec> for WavSpec {
    fn from(spec: hound::WavSpec) -> Self {
        Self {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
        }
    }
}

impl From<WavSpec> for hound::WavSpec {
    fn from(spec: WavSpec) -> Self {
        hound::WavSpec {
            channels: spec.channels,
            sample_rate: spec.sample_rate,
            bits_per_sample: spec.bits_per_sample,
            sample_format: if spec.bits_per_sample == 32 {
                SampleFormat::Float
            } else {
                SampleFormat::Int
            },
        }
    }
}

/// Read a WAV file into one `f32` vector per channel.
///
/// Integer files are scaled to `[-1, 1)`.
///
/// # Example
/// ```ignore
/// let (channels, spec) = read_wav_channels("array.wav")?;
/// println!("{} channels of {} samples", channels.len(), channels[0].len());
/// ```
pub fn read_wav_channels<P: AsRef<Path>>(path: P) -> Result<(Vec<Vec<f32>>, WavSpec)> {
    let reader = WavReader::open(path)?;
    let spec = WavSpec::from(reader.spec());
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = match reader.spec().sample_format {
        SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<_>, _>>()?,
        SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
    };

    let frames = interleaved.len() / channels;
    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in interleaved.chunks_exact(channels) {
        for (dst, &sample) in planar.iter_mut().zip(frame) {
            dst.push(sample);
        }
    }

    tracing::debug!(channels, frames, sample_rate = spec.sample_rate, "read wav");
    Ok((planar, spec))
}

/// Write planar channels to an interleaved WAV file.
///
/// All channels must have the same length.
///
/// # Example
/// ```ignore
/// let channels = vec![vec![0.0f32; 48000]; 4]; // 1 second of 4-channel silence
/// write_wav_channels("dense.wav", &channels, WavSpec::default())?;
/// ```
pub fn write_wav_channels<P: AsRef<Path>>(
    path: P,
    channels: &[Vec<f32>],
    spec: WavSpec,
) -> Result<()> {
    let frames = common_length(channels)?;
    if channels.is_empty() {
        return Err(Error::ChannelCount {
            expected: 1,
            found: 0,
        });
    }
    let count = u16::try_from(channels.len()).map_err(|_| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} channels do not fit a WAV header", channels.len()),
        )
    })?;
    let spec = WavSpec {
        channels: count,
        ..spec
    };
    let mut writer = WavWriter::create(path, hound::WavSpec::from(spec))?;

    if spec.bits_per_sample == 32 {
        for i in 0..frames {
            for channel in channels {
                writer.write_sample(channel[i])?;
            }
        }
    } else {
        let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
        for i in 0..frames {
            for channel in channels {
                let int_sample = (channel[i] * max_val).clamp(-max_val, max_val - 1.0) as i32;
                writer.write_sample(int_sample)?;
            }
        }
    }

    writer.finalize()?;
    tracing::debug!(channels = count, frames, "wrote wav");
    Ok(())
}
