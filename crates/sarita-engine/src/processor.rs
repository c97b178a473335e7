//! The SARITA frame processor.
//!
//! Input arrives per channel in any block size and is buffered in a ring.
//! Whenever a full frame is available the processor:
//!
//! 1. pops one overlapped frame per input channel and applies the window,
//! 2. correlates every sensor pair the geometry lists,
//! 3. estimates each neighbour's delay against its dense point's reference
//!    neighbour and takes the weighted mean,
//! 4. places every neighbour, weighted and re-aligned, into a padded dense
//!    buffer seeded with the previous frame's spill-over,
//! 5. overlap-adds the head of that buffer with the tail of the previous
//!    one, and
//! 6. pushes one hop of finished samples per dense point to the output ring.
//!
//! All buffers are sized in [`SaritaProcessor::configure_with_geometry`];
//! the frame path does not allocate.
//!
//! # Example
//!
//! ```rust
//! use sarita_config::{DensePoint, GeometryBuilder};
//! use sarita_engine::SaritaProcessor;
//! use std::sync::Arc;
//!
//! let geometry = GeometryBuilder::new(48000)
//!     .max_shift_overall(2)
//!     .point(DensePoint::new(0.0, 0.0, 1.0).neighbor(0, 1.0))
//!     .build()
//!     .unwrap();
//!
//! let mut processor = SaritaProcessor::new();
//! processor.configure_with_geometry(Arc::new(geometry), 64, 1).unwrap();
//!
//! processor.push_input(0, &[0.5; 64]).unwrap();
//! assert!(processor.process_next_frame());
//!
//! let mut out = [0.0; 48];
//! assert!(processor.pop_output(0, &mut out));
//! ```

use crate::error::{EngineError, Result};
use crate::shift;
use sarita_analysis::{Correlator, CorrelatorKind, CrossCorrelator};
use sarita_config::{CorrelatorMode, Geometry, ProcessorSettings, validate_channels};
use sarita_core::{
    Matrix, OverlapWindow, RingBuffer, RingBufferError, accumulate, accumulate_scaled,
    overlap_samples,
};
use std::path::Path;
use std::sync::Arc;

/// Overlap used until [`SaritaProcessor::set_overlap_percent`] is called.
pub const DEFAULT_OVERLAP_PERCENT: f32 = 25.0;

/// Maps the settings file's correlator choice onto the analysis backend.
pub fn correlator_kind(mode: CorrelatorMode) -> CorrelatorKind {
    match mode {
        CorrelatorMode::Direct => CorrelatorKind::Direct,
        CorrelatorMode::Fft => CorrelatorKind::Fft,
        CorrelatorMode::Auto => CorrelatorKind::Auto,
    }
}

/// Buffers and geometry of a configured processor.
struct FrameState {
    geometry: Arc<Geometry>,
    frame_size: usize,
    max_lag: usize,
    window: OverlapWindow,
    correlator: Correlator,
    input: RingBuffer,
    output: RingBuffer,
    /// inputs x frame, windowed
    sparse: Matrix<f32>,
    /// combinations x (2 * max_lag + 1)
    correlation: Matrix<f32>,
    /// lag-axis flip scratch
    flip: Vec<f32>,
    /// dense x (frame + 2 * max_shift), double-buffered
    dense: [Matrix<f32>; 2],
    current: usize,
    /// dense x (2 * max_shift)
    carry: Matrix<f32>,
    /// dense x frame; only the first hop is emitted
    segment: Matrix<f32>,
    /// dense x neighbour list length
    time_shifts: Matrix<i32>,
}

impl FrameState {
    fn new(
        geometry: Arc<Geometry>,
        frame_size: usize,
        inputs: usize,
        overlap: usize,
        kind: CorrelatorKind,
    ) -> Self {
        let dense = geometry.dense_grid_size();
        let max_shift = geometry.max_shift_overall();
        // construction rejects max_shift >= frame_size
        let max_lag = max_shift.min(frame_size - 1);
        let lags = 2 * max_lag + 1;
        let padded = frame_size + 2 * max_shift;

        Self {
            correlator: Correlator::new(kind, frame_size, max_lag, inputs),
            window: OverlapWindow::new(frame_size, overlap),
            input: RingBuffer::new(inputs, 2 * frame_size),
            output: RingBuffer::new(dense, 2 * frame_size),
            sparse: Matrix::new(inputs, frame_size),
            correlation: Matrix::new(geometry.combinations().len(), lags),
            flip: vec![0.0; lags],
            dense: [Matrix::new(dense, padded), Matrix::new(dense, padded)],
            current: 0,
            carry: Matrix::new(dense, 2 * max_shift),
            segment: Matrix::new(dense, frame_size),
            time_shifts: Matrix::new(dense, geometry.neighbor_list_len()),
            frame_size,
            max_lag,
            geometry,
        }
    }

    #[inline]
    fn hop(&self) -> usize {
        self.frame_size - self.window.overlap()
    }

    #[inline]
    fn frame_ready(&self) -> bool {
        self.input.buffered() >= self.frame_size && self.output.capacity() >= self.hop()
    }

    fn set_overlap(&mut self, overlap: usize) {
        self.window.set_overlap(overlap);
        self.reset();
    }

    fn reset(&mut self) {
        self.input.reset();
        self.output.reset();
        for buffer in &mut self.dense {
            buffer.clear();
        }
        self.carry.clear();
        self.segment.clear();
        self.time_shifts.clear();
        self.current = 0;
    }

    fn process(&mut self) -> std::result::Result<(), RingBufferError> {
        let Self {
            geometry,
            frame_size,
            max_lag,
            window,
            correlator,
            input,
            output,
            sparse,
            correlation,
            flip,
            dense,
            current,
            carry,
            segment,
            time_shifts,
        } = self;

        let len = *frame_size;
        let overlap = window.overlap();
        let hop = len - overlap;
        let max_shift = geometry.max_shift_overall();

        // Fill
        for ch in 0..sparse.rows() {
            let frame = sparse.row_mut(ch);
            input.pop_with_overlap(ch, frame, overlap)?;
            window.apply(frame);
        }

        // Correlate
        correlator.correlate_pairs(sparse, geometry.combinations(), correlation);

        let (first, second) = dense.split_at_mut(1);
        let (cur, prev) = if *current == 0 {
            (&mut first[0], &second[0])
        } else {
            (&mut second[0], &first[0])
        };

        for d in 0..geometry.dense_grid_size() {
            let neighbors = geometry.neighbors(d);
            let weights = geometry.weights(d);

            // Estimate
            let shifts = &mut time_shifts.row_mut(d)[..neighbors.len()];
            shifts[0] = 0;
            for j in 1..neighbors.len() {
                let lookup = geometry.combination(d, j);
                shifts[j] = shift::estimate_shift(
                    correlation.row(lookup.slot),
                    *max_lag,
                    geometry.max_shift(d, j),
                    lookup.reversed,
                    flip,
                );
            }
            let mean = shift::weighted_mean(shifts, weights);

            // Align and sum
            let buf = cur.row_mut(d);
            buf.fill(0.0);
            accumulate(&mut buf[overlap..overlap + 2 * max_shift], carry.row(d));
            for (j, (&sensor, &weight)) in neighbors.iter().zip(weights).enumerate() {
                let offset = shift::placement_offset(mean, shifts[j], max_shift);
                accumulate_scaled(&mut buf[offset..offset + len], sparse.row(sensor), weight);
            }

            // Overlap-add
            let seg = segment.row_mut(d);
            let tail = &prev.row(d)[len - overlap..len];
            for ((out, &head), &prev_tail) in seg[..overlap].iter_mut().zip(&buf[..overlap]).zip(tail)
            {
                *out = head + prev_tail;
            }
            seg[overlap..hop].copy_from_slice(&buf[overlap..hop]);
            carry
                .row_mut(d)
                .copy_from_slice(&buf[len..len + 2 * max_shift]);
        }
        *current ^= 1;

        // Emit
        for d in 0..segment.rows() {
            output.push(d, &segment.row(d)[..hop])?;
        }
        Ok(())
    }
}

/// Checks that `frame_size` is usable with `geometry`: non-zero and longer
/// than the overall shift bound.
pub fn check_frame_size(geometry: &Geometry, frame_size: usize) -> Result<()> {
    if frame_size == 0 {
        return Err(EngineError::InvalidFrameSize(frame_size));
    }
    let shift = geometry.max_shift_overall();
    if shift >= frame_size {
        return Err(EngineError::ShiftExceedsFrame {
            shift,
            frame: frame_size,
        });
    }
    Ok(())
}

/// Sparse-to-dense frame processor.
///
/// Single-threaded; wrap it in a [`SaritaEngine`](crate::SaritaEngine) to
/// drive it from a host callback.
pub struct SaritaProcessor {
    state: Option<FrameState>,
    overlap_percent: f32,
    correlator: CorrelatorKind,
    error: bool,
    frames_processed: u64,
}

impl Default for SaritaProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SaritaProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaritaProcessor")
            .field("configured", &self.state.is_some())
            .field("error", &self.error)
            .field("frame_size", &self.frame_size())
            .field("grid_size", &self.grid_size())
            .field("overlap_percent", &self.overlap_percent)
            .finish_non_exhaustive()
    }
}

impl SaritaProcessor {
    /// Unconfigured processor with the default overlap and correlator.
    pub fn new() -> Self {
        Self {
            state: None,
            overlap_percent: DEFAULT_OVERLAP_PERCENT,
            correlator: CorrelatorKind::default(),
            error: false,
            frames_processed: 0,
        }
    }

    /// Unconfigured processor using the overlap and correlator of `settings`.
    pub fn from_settings(settings: &ProcessorSettings) -> Self {
        let mut processor = Self::new();
        processor.overlap_percent = settings.clamped_overlap();
        processor.correlator = correlator_kind(settings.correlator);
        processor
    }

    /// Selects the correlation backend used by the next configuration.
    pub fn set_correlator(&mut self, kind: CorrelatorKind) {
        self.correlator = kind;
    }

    /// Backend in use, or the one the next configuration will use.
    pub fn correlator_kind(&self) -> CorrelatorKind {
        match &self.state {
            Some(state) => state.correlator.kind(),
            None => self.correlator,
        }
    }

    /// Loads `path` and configures for it.
    ///
    /// On any failure the processor is torn down and left in the error
    /// state until a later configuration succeeds.
    pub fn configure(
        &mut self,
        path: impl AsRef<Path>,
        frame_size: usize,
        num_input_channels: usize,
    ) -> Result<()> {
        match Geometry::load(path) {
            Ok(geometry) => {
                self.configure_with_geometry(Arc::new(geometry), frame_size, num_input_channels)
            }
            Err(e) => Err(self.fail(e.into())),
        }
    }

    /// Configures for an already loaded geometry.
    ///
    /// Allocates every buffer. Fails if the frame is empty, if the
    /// geometry's overall shift is not shorter than the frame, or if it
    /// reads channels beyond `num_input_channels`.
    pub fn configure_with_geometry(
        &mut self,
        geometry: Arc<Geometry>,
        frame_size: usize,
        num_input_channels: usize,
    ) -> Result<()> {
        self.teardown();

        if let Err(e) = check_frame_size(&geometry, frame_size) {
            return Err(self.fail(e));
        }
        if let Err(e) = validate_channels(&geometry, num_input_channels) {
            return Err(self.fail(e.into()));
        }
        let max_shift = geometry.max_shift_overall();

        let overlap = overlap_samples(frame_size, self.overlap_percent);
        let state = FrameState::new(
            geometry,
            frame_size,
            num_input_channels,
            overlap,
            self.correlator,
        );
        tracing::info!(
            dense = state.geometry.dense_grid_size(),
            inputs = num_input_channels,
            frame_size,
            overlap,
            max_shift,
            correlator = ?state.correlator.kind(),
            "processor configured"
        );
        self.state = Some(state);
        self.error = false;
        Ok(())
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        tracing::warn!(error = %err, "processor configuration failed");
        self.teardown();
        self.error = true;
        err
    }

    /// Sets the overlap in percent of the frame, clamped to `[0, 50]`.
    ///
    /// A configured processor recomputes its window in place and restarts
    /// from empty buffers.
    pub fn set_overlap_percent(&mut self, percent: f32) {
        self.overlap_percent = if percent.is_finite() {
            percent.clamp(0.0, 50.0)
        } else {
            DEFAULT_OVERLAP_PERCENT
        };
        if let Some(state) = &mut self.state {
            state.set_overlap(overlap_samples(state.frame_size, self.overlap_percent));
        }
    }

    /// Overlap in percent.
    pub fn overlap_percent(&self) -> f32 {
        self.overlap_percent
    }

    /// Overlap in samples; 0 when unconfigured.
    pub fn overlap(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.window.overlap())
    }

    /// Samples emitted per frame; 0 when unconfigured.
    pub fn hop(&self) -> usize {
        self.state.as_ref().map_or(0, FrameState::hop)
    }

    /// Frame size; 0 when unconfigured.
    pub fn frame_size(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.frame_size)
    }

    /// Input channels the processor was configured for.
    pub fn num_inputs(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.input.channels())
    }

    /// Appends `samples` to input `channel`.
    ///
    /// Push every channel with the same length; buffered counts advance
    /// when the last channel is pushed.
    pub fn push_input(&mut self, channel: usize, samples: &[f32]) -> Result<()> {
        let state = self.state.as_mut().ok_or(EngineError::NotConfigured)?;
        state.input.push(channel, samples)?;
        Ok(())
    }

    /// True if a full frame is buffered and the output has room for it.
    pub fn has_frame_ready(&self) -> bool {
        !self.error && self.state.as_ref().is_some_and(FrameState::frame_ready)
    }

    /// Processes one frame. Returns false, doing nothing, if no frame is
    /// ready or the processor is not configured.
    pub fn process_next_frame(&mut self) -> bool {
        if !self.has_frame_ready() {
            return false;
        }
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        if state.process().is_err() {
            return false;
        }
        self.frames_processed += 1;
        true
    }

    /// Processes frames until none is ready; returns how many ran.
    pub fn process_ready_frames(&mut self) -> usize {
        let mut frames = 0;
        while self.process_next_frame() {
            frames += 1;
        }
        frames
    }

    /// Samples per dense channel waiting in the output.
    pub fn output_available(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.output.buffered())
    }

    /// Reads `out.len()` samples of dense `channel`.
    ///
    /// Returns false and zero-fills `out` if that many are not available.
    /// The read commits when the last dense channel is popped; use
    /// [`skip_output`](Self::skip_output) when it is not.
    pub fn pop_output(&mut self, channel: usize, out: &mut [f32]) -> bool {
        let popped = match &mut self.state {
            Some(state) if !self.error && state.output.buffered() >= out.len() => {
                state.output.pop(channel, out).is_ok()
            }
            _ => false,
        };
        if !popped {
            out.fill(0.0);
        }
        popped
    }

    /// Commits a read of `len` samples without copying.
    pub fn skip_output(&mut self, len: usize) -> bool {
        self.state
            .as_mut()
            .is_some_and(|s| s.output.skip_pop(len).is_ok())
    }

    /// True after a failed configuration.
    pub fn is_in_error_state(&self) -> bool {
        self.error
    }

    /// Dense points produced; 0 when unconfigured.
    pub fn grid_size(&self) -> usize {
        self.state
            .as_ref()
            .map_or(0, |s| s.geometry.dense_grid_size())
    }

    /// True when configured and not in error.
    pub fn has_valid_geometry(&self) -> bool {
        !self.error && self.state.is_some()
    }

    /// Installed geometry.
    pub fn geometry(&self) -> Option<&Arc<Geometry>> {
        self.state.as_ref().map(|s| &s.geometry)
    }

    /// Shifts estimated for dense point `d` in the last frame, reference
    /// neighbour first.
    pub fn last_time_shifts(&self, d: usize) -> Option<&[i32]> {
        let state = self.state.as_ref()?;
        if d >= state.geometry.dense_grid_size() {
            return None;
        }
        let n = state.geometry.num_neighbors(d);
        Some(&state.time_shifts.row(d)[..n])
    }

    /// Delay from input to output when driven one frame at a time.
    ///
    /// Every output sample waits `max_shift_overall` for alignment padding;
    /// with overlap the first hop cannot fill a frame-sized read, which adds
    /// one frame.
    pub fn latency_samples(&self) -> usize {
        match &self.state {
            Some(s) if s.window.overlap() > 0 => s.frame_size + s.geometry.max_shift_overall(),
            Some(s) => s.geometry.max_shift_overall(),
            None => 0,
        }
    }

    /// Frames processed since configuration.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Clears buffered audio, keeping the configuration.
    pub fn reset(&mut self) {
        if let Some(state) = &mut self.state {
            state.reset();
        }
    }

    /// Releases every buffer and the geometry.
    pub fn teardown(&mut self) {
        if self.state.take().is_some() {
            tracing::debug!("processor torn down");
        }
        self.frames_processed = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sarita_config::{ConfigError, DensePoint, GeometryBuilder};

    fn single_point(max_shift: usize) -> Arc<Geometry> {
        Arc::new(
            GeometryBuilder::new(48000)
                .max_shift_overall(max_shift)
                .point(DensePoint::new(0.0, 0.0, 1.0).neighbor(0, 1.0))
                .build()
                .unwrap(),
        )
    }

    fn pair(max_shift: usize) -> Arc<Geometry> {
        Arc::new(
            GeometryBuilder::new(48000)
                .max_shift_overall(max_shift)
                .point(DensePoint::new(0.0, 0.0, 0.5).neighbor(0, 0.5).neighbor(1, 0.5))
                .point(DensePoint::new(1.0, 0.0, 0.5).neighbor(1, 0.5).neighbor(0, 0.5))
                .build()
                .unwrap(),
        )
    }

    fn white_noise(n: usize, seed: u32) -> Vec<f32> {
        let mut state = seed;
        (0..n)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
                (state >> 16) as f32 / 32768.0 - 1.0
            })
            .collect()
    }

    #[test]
    fn test_unconfigured_refuses_work() {
        let mut p = SaritaProcessor::new();
        assert!(!p.has_valid_geometry());
        assert!(!p.is_in_error_state());
        assert!(matches!(p.push_input(0, &[0.0; 4]), Err(EngineError::NotConfigured)));
        assert!(!p.process_next_frame());
        let mut out = [1.0; 4];
        assert!(!p.pop_output(0, &mut out));
        assert_eq!(out, [0.0; 4]);
        assert_eq!(p.latency_samples(), 0);
    }

    #[test]
    fn test_missing_file_enters_error_state() {
        let mut p = SaritaProcessor::new();
        let err = p.configure("/nonexistent/grid.cfg", 256, 2).unwrap_err();
        assert!(matches!(err, EngineError::Config(ConfigError::ReadFile { .. })));
        assert!(p.is_in_error_state());
        assert!(!p.has_valid_geometry());
        assert_eq!(p.grid_size(), 0);
    }

    #[test]
    fn test_configuration_checks() {
        let mut p = SaritaProcessor::new();
        assert!(matches!(
            p.configure_with_geometry(single_point(2), 0, 1),
            Err(EngineError::InvalidFrameSize(0))
        ));
        assert!(p.is_in_error_state());

        assert!(matches!(
            p.configure_with_geometry(single_point(64), 64, 1),
            Err(EngineError::ShiftExceedsFrame { shift: 64, frame: 64 })
        ));

        assert!(matches!(
            p.configure_with_geometry(pair(2), 64, 1),
            Err(EngineError::Config(ConfigError::Validation(_)))
        ));

        p.configure_with_geometry(pair(2), 64, 2).unwrap();
        assert!(!p.is_in_error_state());
        assert!(p.has_valid_geometry());
        assert_eq!(p.grid_size(), 2);
    }

    #[test]
    fn test_overlap_percent_clamped() {
        let mut p = SaritaProcessor::new();
        p.configure_with_geometry(single_point(0), 256, 1).unwrap();
        assert_eq!(p.overlap(), 64);
        p.set_overlap_percent(90.0);
        assert_eq!(p.overlap_percent(), 50.0);
        assert_eq!(p.overlap(), 128);
        p.set_overlap_percent(12.5);
        assert_eq!(p.overlap(), 32);
        assert_eq!(p.hop(), 224);
    }

    #[test]
    fn test_frame_ready_gating() {
        let mut p = SaritaProcessor::new();
        p.configure_with_geometry(single_point(0), 64, 1).unwrap();
        p.push_input(0, &[0.1; 63]).unwrap();
        assert!(!p.has_frame_ready());
        p.push_input(0, &[0.1; 1]).unwrap();
        assert!(p.has_frame_ready());
        assert!(p.process_next_frame());
        assert_eq!(p.output_available(), p.hop());
        assert_eq!(p.frames_processed(), 1);
    }

    #[test]
    fn test_identity_geometry_delays_by_max_shift() {
        let max_shift = 3;
        let mut p = SaritaProcessor::new();
        p.set_overlap_percent(25.0);
        p.configure_with_geometry(single_point(max_shift), 64, 1).unwrap();
        let hop = p.hop();

        let input = white_noise(16 + 12 * hop, 7);
        let mut output = Vec::new();
        let mut fed = 0;
        let mut chunk = vec![0.0; hop];
        while fed < input.len() {
            let n = if fed == 0 { 64 } else { hop };
            p.push_input(0, &input[fed..fed + n]).unwrap();
            fed += n;
            p.process_ready_frames();
            while p.pop_output(0, &mut chunk) {
                output.extend_from_slice(&chunk);
            }
        }

        // skip the first frame's unmatched up-ramp
        for k in 32..output.len() {
            assert!(
                (output[k] - input[k - max_shift]).abs() < 1e-4,
                "sample {k}: {} vs {}",
                output[k],
                input[k - max_shift]
            );
        }
    }

    #[test]
    fn test_pair_shifts_recovered_both_orientations() {
        let delay = 3usize;
        let mut p = SaritaProcessor::new();
        p.configure_with_geometry(pair(4), 128, 2).unwrap();

        let source = white_noise(128 + delay, 11);
        let a = &source[delay..];
        let b = &source[..128];
        p.push_input(0, a).unwrap();
        p.push_input(1, b).unwrap();
        assert!(p.process_next_frame());

        assert_eq!(p.last_time_shifts(0), Some(&[0, delay as i32][..]));
        assert_eq!(p.last_time_shifts(1), Some(&[0, -(delay as i32)][..]));
        assert_eq!(p.last_time_shifts(2), None);
    }

    #[test]
    fn test_teardown_releases_state() {
        let mut p = SaritaProcessor::new();
        p.configure_with_geometry(single_point(1), 32, 1).unwrap();
        p.teardown();
        assert!(!p.has_valid_geometry());
        assert!(!p.is_in_error_state());
        assert_eq!(p.frame_size(), 0);
    }

    #[test]
    fn test_from_settings() {
        let settings = ProcessorSettings {
            overlap_percent: 50.0,
            correlator: CorrelatorMode::Direct,
            ..ProcessorSettings::default()
        };
        let mut p = SaritaProcessor::from_settings(&settings);
        assert_eq!(p.correlator_kind(), CorrelatorKind::Direct);
        p.configure_with_geometry(single_point(0), 512, 1).unwrap();
        assert_eq!(p.overlap(), 256);
        assert_eq!(p.correlator_kind(), CorrelatorKind::Direct);
    }
}
