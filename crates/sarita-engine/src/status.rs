//! Thread-safe status and reconfiguration handoff.
//!
//! `SaritaShared` is the only object that crosses threads. The audio thread
//! owns the [`SaritaEngine`](crate::SaritaEngine) by value, publishes status
//! through atomics here, and polls for pending work at the start of every
//! callback. Control threads load and validate geometry, then hand it over
//! through a single-slot channel. Nothing here blocks.

use crate::error::EngineError;
use crossbeam_channel::{Receiver, Sender, bounded};
use sarita_analysis::CorrelatorKind;
use sarita_config::Geometry;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering};

/// Non-fatal conditions reported to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Warnings(u32);

impl Warnings {
    /// Host block is not a multiple of the frame size; output is silenced.
    pub const BLOCK_SIZE_MISMATCH: Self = Self(1);
    /// Host sample rate differs from the geometry's.
    pub const SAMPLE_RATE: Self = Self(1 << 1);
    /// Host provides fewer inputs than the geometry reads.
    pub const INPUT_CHANNELS: Self = Self(1 << 2);
    /// Host accepts fewer outputs than there are dense points.
    pub const OUTPUT_CHANNELS: Self = Self(1 << 3);

    /// No warnings.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Rebuilds from raw bits, dropping unknown ones.
    pub const fn from_bits_truncate(bits: u32) -> Self {
        Self(bits & 0b1111)
    }

    /// True if no warning is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if every warning in `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets or clears `other`.
    pub fn set(&mut self, other: Self, value: bool) {
        if value {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }

    /// Message for the most important warning set, if any.
    ///
    /// Checked in order: block size, sample rate, inputs, outputs.
    pub fn primary_message(self) -> Option<&'static str> {
        [
            (Self::BLOCK_SIZE_MISMATCH, "Host block size is not a multiple of the frame size"),
            (Self::SAMPLE_RATE, "Host sample rate differs from the geometry's"),
            (Self::INPUT_CHANNELS, "Not enough input channels for this geometry"),
            (Self::OUTPUT_CHANNELS, "Not enough output channels for the dense grid"),
        ]
        .into_iter()
        .find(|(flag, _)| self.contains(*flag))
        .map(|(_, msg)| msg)
    }
}

impl std::ops::BitOr for Warnings {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for Warnings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.primary_message() {
            Some(msg) => f.write_str(msg),
            None => f.write_str("OK"),
        }
    }
}

/// Geometry handed to the audio thread.
///
/// Build and validate it off the audio thread; applying it only sizes
/// buffers.
#[derive(Debug, Clone)]
pub struct ReconfigureRequest {
    /// Geometry to install.
    pub geometry: Arc<Geometry>,
    /// Internal frame size in samples.
    pub frame_size: usize,
    /// Correlation backend.
    pub correlator: CorrelatorKind,
}

/// Point-in-time copy of the engine status for display.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StatusSnapshot {
    /// Last configuration attempt failed.
    pub config_error: bool,
    /// A geometry is installed and usable.
    pub geometry_valid: bool,
    /// Dense points of the installed geometry.
    pub dense_grid_size: usize,
    /// Frames processed since the last configuration.
    pub frames_processed: u64,
    /// Active warnings.
    pub warnings: Warnings,
    /// Current overlap in percent.
    pub overlap_percent: f32,
}

struct SaritaSharedData {
    config_error: AtomicBool,
    geometry_valid: AtomicBool,
    dense_grid_size: AtomicUsize,
    frames_processed: AtomicU64,
    warnings: AtomicU32,
    /// f32 bit-cast
    overlap_percent: AtomicU32,
    overlap_changed: AtomicBool,
    wants_update: AtomicBool,
    invalidated: AtomicBool,
    reconfigure_tx: Sender<ReconfigureRequest>,
    reconfigure_rx: Receiver<ReconfigureRequest>,
}

/// Shared state between the audio thread and control threads.
///
/// Cheap to clone; all clones refer to the same state.
#[derive(Clone)]
pub struct SaritaShared {
    inner: Arc<SaritaSharedData>,
}

impl Default for SaritaShared {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SaritaShared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaritaShared")
            .field("status", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl SaritaShared {
    /// Creates unconfigured shared state with the default 25 % overlap.
    pub fn new() -> Self {
        let (reconfigure_tx, reconfigure_rx) = bounded(1);
        Self {
            inner: Arc::new(SaritaSharedData {
                config_error: AtomicBool::new(false),
                geometry_valid: AtomicBool::new(false),
                dense_grid_size: AtomicUsize::new(0),
                frames_processed: AtomicU64::new(0),
                warnings: AtomicU32::new(0),
                overlap_percent: AtomicU32::new(25.0f32.to_bits()),
                overlap_changed: AtomicBool::new(false),
                wants_update: AtomicBool::new(false),
                invalidated: AtomicBool::new(false),
                reconfigure_tx,
                reconfigure_rx,
            }),
        }
    }

    // ---- control side ----

    /// Queues `request` for the audio thread, replacing one not yet taken.
    pub fn request_reconfigure(&self, request: ReconfigureRequest) {
        while self.inner.reconfigure_rx.try_recv().is_ok() {}
        // Capacity is 1 and was just drained; a racing send only means the
        // audio thread already has a newer request.
        let _ = self.inner.reconfigure_tx.try_send(request);
        self.inner.wants_update.store(true, Ordering::Release);
    }

    /// Loads a geometry file and queues it.
    ///
    /// On failure the error flag is raised and the audio thread drops its
    /// current geometry, so the output stays silent until a valid one
    /// arrives.
    pub fn request_geometry_file(
        &self,
        path: impl AsRef<Path>,
        frame_size: usize,
        correlator: CorrelatorKind,
    ) -> Result<(), EngineError> {
        match Geometry::load(path.as_ref()) {
            Ok(geometry) => {
                self.request_reconfigure(ReconfigureRequest {
                    geometry: Arc::new(geometry),
                    frame_size,
                    correlator,
                });
                Ok(())
            }
            Err(e) => {
                tracing::warn!(path = %path.as_ref().display(), error = %e, "geometry load failed");
                // An older queued request must not override the failed load.
                while self.inner.reconfigure_rx.try_recv().is_ok() {}
                self.inner.wants_update.store(false, Ordering::Release);
                self.inner.config_error.store(true, Ordering::Release);
                self.inner.geometry_valid.store(false, Ordering::Release);
                self.inner.invalidated.store(true, Ordering::Release);
                Err(e.into())
            }
        }
    }

    /// Sets the frame overlap; clamped to `[0, 50]` percent.
    pub fn set_overlap_percent(&self, percent: f32) {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 50.0)
        } else {
            25.0
        };
        self.inner
            .overlap_percent
            .store(percent.to_bits(), Ordering::Release);
        self.inner.overlap_changed.store(true, Ordering::Release);
    }

    /// Current overlap in percent.
    pub fn overlap_percent(&self) -> f32 {
        f32::from_bits(self.inner.overlap_percent.load(Ordering::Acquire))
    }

    /// Reads all status fields.
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            config_error: self.inner.config_error.load(Ordering::Acquire),
            geometry_valid: self.inner.geometry_valid.load(Ordering::Acquire),
            dense_grid_size: self.inner.dense_grid_size.load(Ordering::Acquire),
            frames_processed: self.inner.frames_processed.load(Ordering::Relaxed),
            warnings: Warnings::from_bits_truncate(self.inner.warnings.load(Ordering::Acquire)),
            overlap_percent: self.overlap_percent(),
        }
    }

    // ---- audio side ----

    /// Takes a pending reconfiguration, if one was requested.
    pub fn take_reconfigure(&self) -> Option<ReconfigureRequest> {
        if !self.inner.wants_update.swap(false, Ordering::AcqRel) {
            return None;
        }
        self.inner.reconfigure_rx.try_recv().ok()
    }

    /// True once after a failed load was reported from the control side.
    pub fn take_invalidation(&self) -> bool {
        self.inner.invalidated.swap(false, Ordering::AcqRel)
    }

    /// Clears and returns the overlap-changed flag.
    pub fn take_overlap_change(&self) -> Option<f32> {
        self.inner
            .overlap_changed
            .swap(false, Ordering::AcqRel)
            .then(|| self.overlap_percent())
    }

    /// Publishes the result of a configuration attempt.
    pub fn publish_configuration(&self, ok: bool, dense_grid_size: usize) {
        self.inner.config_error.store(!ok, Ordering::Release);
        self.inner.geometry_valid.store(ok, Ordering::Release);
        self.inner
            .dense_grid_size
            .store(if ok { dense_grid_size } else { 0 }, Ordering::Release);
        self.inner.frames_processed.store(0, Ordering::Relaxed);
    }

    /// Publishes the current warnings.
    pub fn publish_warnings(&self, warnings: Warnings) {
        self.inner.warnings.store(warnings.bits(), Ordering::Release);
    }

    /// Adds to the processed frame count.
    pub fn add_frames(&self, frames: u64) {
        if frames > 0 {
            self.inner
                .frames_processed
                .fetch_add(frames, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sarita_config::{DensePoint, GeometryBuilder};

    fn geometry() -> Arc<Geometry> {
        Arc::new(
            GeometryBuilder::new(48000)
                .point(DensePoint::new(0.0, 0.0, 1.0).neighbor(0, 1.0))
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_warnings_priority() {
        let w = Warnings::OUTPUT_CHANNELS | Warnings::INPUT_CHANNELS;
        assert_eq!(
            w.primary_message(),
            Some("Not enough input channels for this geometry")
        );
        let w = w | Warnings::BLOCK_SIZE_MISMATCH;
        assert!(w.primary_message().unwrap().contains("block size"));
        assert_eq!(Warnings::empty().primary_message(), None);
        assert_eq!(Warnings::empty().to_string(), "OK");
    }

    #[test]
    fn test_warnings_set_and_clear() {
        let mut w = Warnings::empty();
        w.set(Warnings::SAMPLE_RATE, true);
        assert!(w.contains(Warnings::SAMPLE_RATE));
        w.set(Warnings::SAMPLE_RATE, false);
        assert!(w.is_empty());
        assert_eq!(Warnings::from_bits_truncate(0xFF).bits(), 0b1111);
    }

    #[test]
    fn test_reconfigure_handoff_keeps_latest() {
        let shared = SaritaShared::new();
        assert!(shared.take_reconfigure().is_none());

        shared.request_reconfigure(ReconfigureRequest {
            geometry: geometry(),
            frame_size: 128,
            correlator: CorrelatorKind::Direct,
        });
        shared.request_reconfigure(ReconfigureRequest {
            geometry: geometry(),
            frame_size: 512,
            correlator: CorrelatorKind::Fft,
        });

        let req = shared.take_reconfigure().unwrap();
        assert_eq!(req.frame_size, 512);
        assert!(shared.take_reconfigure().is_none());
    }

    #[test]
    fn test_overlap_change_clamped_and_taken_once() {
        let shared = SaritaShared::new();
        assert_eq!(shared.take_overlap_change(), None);
        shared.set_overlap_percent(75.0);
        assert_eq!(shared.take_overlap_change(), Some(50.0));
        assert_eq!(shared.take_overlap_change(), None);
        assert_eq!(shared.snapshot().overlap_percent, 50.0);
    }

    #[test]
    fn test_missing_geometry_raises_error_flag() {
        let shared = SaritaShared::new();
        let err = shared
            .request_geometry_file("/nonexistent/grid.cfg", 256, CorrelatorKind::Auto)
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
        let snap = shared.snapshot();
        assert!(snap.config_error);
        assert!(!snap.geometry_valid);
        assert!(shared.take_invalidation());
        assert!(!shared.take_invalidation());
    }

    #[test]
    fn test_failed_load_drops_queued_request() {
        let shared = SaritaShared::new();
        shared.request_reconfigure(ReconfigureRequest {
            geometry: geometry(),
            frame_size: 128,
            correlator: CorrelatorKind::Direct,
        });
        assert!(
            shared
                .request_geometry_file("/nonexistent/grid.cfg", 256, CorrelatorKind::Auto)
                .is_err()
        );
        assert!(shared.take_reconfigure().is_none());
        assert!(shared.snapshot().config_error);
    }

    #[test]
    fn test_snapshot_across_clones() {
        let shared = SaritaShared::new();
        let ui = shared.clone();
        shared.publish_configuration(true, 64);
        shared.add_frames(3);
        shared.publish_warnings(Warnings::SAMPLE_RATE);

        let snap = ui.snapshot();
        assert!(snap.geometry_valid);
        assert!(!snap.config_error);
        assert_eq!(snap.dense_grid_size, 64);
        assert_eq!(snap.frames_processed, 3);
        assert!(snap.warnings.contains(Warnings::SAMPLE_RATE));
    }
}
