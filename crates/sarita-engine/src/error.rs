//! Engine error type.

use sarita_config::ConfigError;
use sarita_core::RingBufferError;
use thiserror::Error;

/// Errors raised while configuring or driving the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Geometry could not be loaded or does not fit the input.
    #[error("configuration failed: {0}")]
    Config(#[from] ConfigError),

    /// Frame size of zero.
    #[error("invalid frame size {0}")]
    InvalidFrameSize(usize),

    /// The geometry allows shifts as long as the frame itself.
    #[error("max shift of {shift} samples does not fit a frame of {frame}")]
    ShiftExceedsFrame {
        /// Overall shift bound of the geometry.
        shift: usize,
        /// Configured frame size.
        frame: usize,
    },

    /// Host block is not a whole number of frames.
    #[error("host block of {block} samples is not a multiple of the frame size {frame}")]
    BlockSizeMismatch {
        /// Host block size.
        block: usize,
        /// Configured frame size.
        frame: usize,
    },

    /// An output channel differs in length from the first one.
    #[error("output channel {channel} has {len} samples, expected {block}")]
    OutputLength {
        /// Index of the offending output.
        channel: usize,
        /// Its length.
        len: usize,
        /// Length of output 0.
        block: usize,
    },

    /// No valid geometry is loaded.
    #[error("processor is not configured")]
    NotConfigured,

    /// Ring buffer misuse.
    #[error("buffer error: {0}")]
    Buffer(#[from] RingBufferError),
}

impl From<sarita_config::ValidationError> for EngineError {
    fn from(err: sarita_config::ValidationError) -> Self {
        EngineError::Config(ConfigError::from(err))
    }
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
