//! Sarita Core - real-time primitives for microphone-array upsampling
//!
//! This crate holds the building blocks shared by the SARITA engine, all of
//! them free of allocation once constructed:
//!
//! - [`RingBuffer`] - Multichannel circular buffer with last-channel commit
//!   and overlapped reads
//! - [`OverlapWindow`] - Partial Hann window whose ramps overlap-add to unity
//! - [`Matrix`] - Flat row-major storage for geometry tables and frame scratch
//! - Math helpers: [`round_half_away`], [`accumulate_scaled`], [`overlap_samples`]
//!
//! # no_std Support
//!
//! Disable the default `std` feature for embedded targets. `alloc` is still
//! required; buffers are sized once at configuration time.
//!
//! ```toml
//! [dependencies]
//! sarita-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Example
//!
//! ```rust
//! use sarita_core::{OverlapWindow, RingBuffer};
//!
//! let frame = 8;
//! let overlap = 2;
//! let mut ring = RingBuffer::new(1, 2 * frame);
//! let window = OverlapWindow::new(frame, overlap);
//!
//! ring.push(0, &[1.0; 12]).unwrap();
//! let mut buf = [0.0; 8];
//! ring.pop_with_overlap(0, &mut buf, overlap).unwrap();
//! window.apply(&mut buf);
//! assert_eq!(ring.buffered(), 12 - (frame - overlap));
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod math;
pub mod matrix;
pub mod ring_buffer;
pub mod window;

pub use math::{accumulate, accumulate_scaled, energy, overlap_samples, round_half_away};
pub use matrix::Matrix;
pub use ring_buffer::{RingBuffer, RingBufferError};
pub use window::OverlapWindow;
