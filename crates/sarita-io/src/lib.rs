//! File I/O for the SARITA upsampler.
//!
//! This crate provides:
//!
//! - **Multichannel WAV I/O**: [`read_wav_channels`] and [`write_wav_channels`]
//!   load and save planar `f32` channels
//! - **Offline rendering**: [`Renderer`] runs a sparse recording through the
//!   engine and returns one channel per dense grid point
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sarita_config::Geometry;
//! use sarita_io::{RenderOptions, Renderer, read_wav_channels, write_wav_channels};
//! use std::sync::Arc;
//!
//! let geometry = Arc::new(Geometry::load("array.cfg")?);
//! let (sparse, spec) = read_wav_channels("array.wav")?;
//!
//! let mut renderer = Renderer::new(geometry, spec.sample_rate, RenderOptions::default())?;
//! let dense = renderer.render(&sparse, |_, _| {})?;
//!
//! write_wav_channels("dense.wav", &dense, spec)?;
//! ```

mod render;
mod wav;

pub use render::{RenderOptions, Renderer};
pub use wav::{WavFormat, WavInfo, WavSpec, read_wav_channels, read_wav_info, write_wav_channels};

/// Error types for file I/O and rendering.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Geometry could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] sarita_config::ConfigError),

    /// The engine rejected the configuration or a block.
    #[error("engine error: {0}")]
    Engine(#[from] sarita_engine::EngineError),

    /// Fewer channels than the geometry reads.
    #[error("expected at least {expected} channels, found {found}")]
    ChannelCount {
        /// Channels the geometry needs.
        expected: usize,
        /// Channels supplied.
        found: usize,
    },

    /// Channels of one signal differ in length.
    #[error("channel {channel} has {len} samples, expected {expected}")]
    ChannelLength {
        /// Offending channel.
        channel: usize,
        /// Its length.
        len: usize,
        /// Length of channel 0.
        expected: usize,
    },

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for I/O operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Checks that every channel has the length of the first; returns it.
pub(crate) fn common_length(channels: &[Vec<f32>]) -> Result<usize> {
    let expected = channels.first().map_or(0, Vec::len);
    for (channel, samples) in channels.iter().enumerate() {
        if samples.len() != expected {
            return Err(Error::ChannelLength {
                channel,
                len: samples.len(),
                expected,
            });
        }
    }
    Ok(expected)
}
