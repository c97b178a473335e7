//! SARITA engine: sparse microphone-array signals in, dense virtual grid out.
//!
//! # Overview
//!
//! - [`SaritaProcessor`] - The frame algorithm: overlapped framing,
//!   pairwise delay estimation, weighted alignment and overlap-add
//! - [`SaritaEngine`] - Drives a processor from host audio callbacks of
//!   any frame-multiple block size
//! - [`SaritaShared`] - Lock-free status and geometry handoff between the
//!   audio thread and everything else
//!
//! # Example
//!
//! ```rust
//! use sarita_analysis::CorrelatorKind;
//! use sarita_config::{DensePoint, GeometryBuilder};
//! use sarita_engine::{ReconfigureRequest, SaritaEngine, SaritaShared};
//! use std::sync::Arc;
//!
//! let geometry = GeometryBuilder::new(48000)
//!     .max_shift_overall(4)
//!     .point(DensePoint::new(0.0, 0.0, 0.5).neighbor(0, 1.0))
//!     .point(DensePoint::new(1.0, 0.0, 0.5).neighbor(0, 0.5).neighbor(1, 0.5))
//!     .build()
//!     .unwrap();
//!
//! let shared = SaritaShared::new();
//! shared.request_reconfigure(ReconfigureRequest {
//!     geometry: Arc::new(geometry),
//!     frame_size: 256,
//!     correlator: CorrelatorKind::Auto,
//! });
//!
//! let mut engine = SaritaEngine::new(shared.clone());
//! engine.prepare(48000, 512, 2, 2);
//!
//! let input = vec![0.0f32; 512];
//! let (mut d0, mut d1) = (vec![0.0f32; 512], vec![0.0f32; 512]);
//! engine.process_block(&[&input, &input], &mut [&mut d0, &mut d1]).unwrap();
//!
//! assert!(shared.snapshot().geometry_valid);
//! assert_eq!(engine.latency_samples(), 256 + 4);
//! ```

mod engine;
mod error;
pub mod processor;
pub mod shift;
mod status;

pub use engine::SaritaEngine;
pub use error::{EngineError, Result};
pub use processor::{DEFAULT_OVERLAP_PERCENT, SaritaProcessor, check_frame_size, correlator_kind};
pub use status::{ReconfigureRequest, SaritaShared, StatusSnapshot, Warnings};
