//! Offline rendering of sparse recordings.
//!
//! [`Renderer`] drives a [`SaritaEngine`] the way a host would, one
//! frame-sized block at a time, then optionally removes the engine's
//! latency so dense channel `k` lines up with input sample `k`.

use crate::{Error, Result, common_length};
use sarita_analysis::CorrelatorKind;
use sarita_config::{Geometry, ProcessorSettings};
use sarita_engine::{
    DEFAULT_OVERLAP_PERCENT, ReconfigureRequest, SaritaEngine, SaritaShared, Warnings,
    check_frame_size, correlator_kind,
};
use std::sync::Arc;

/// Rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderOptions {
    /// Frame size in samples; also used as the block size.
    pub frame_size: usize,
    /// Frame overlap in percent, clamped to `[0, 50]`.
    pub overlap_percent: f32,
    /// Correlation backend.
    pub correlator: CorrelatorKind,
    /// Drop the leading latency so output aligns with input.
    pub compensate_latency: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            frame_size: 256,
            overlap_percent: DEFAULT_OVERLAP_PERCENT,
            correlator: CorrelatorKind::Auto,
            compensate_latency: true,
        }
    }
}

impl RenderOptions {
    /// Options taken from a settings file, with latency compensation on.
    pub fn from_settings(settings: &ProcessorSettings) -> Self {
        Self {
            frame_size: settings.frame_size,
            overlap_percent: settings.clamped_overlap(),
            correlator: correlator_kind(settings.correlator),
            compensate_latency: true,
        }
    }
}

/// Renders whole recordings through the engine.
#[derive(Debug)]
pub struct Renderer {
    geometry: Arc<Geometry>,
    options: RenderOptions,
    sample_rate: u32,
    engine: SaritaEngine,
}

impl Renderer {
    /// Configures an engine for `geometry` at `sample_rate`.
    ///
    /// A sample rate that differs from the geometry's is logged, not
    /// rejected.
    pub fn new(geometry: Arc<Geometry>, sample_rate: u32, options: RenderOptions) -> Result<Self> {
        check_frame_size(&geometry, options.frame_size)?;

        let shared = SaritaShared::new();
        shared.set_overlap_percent(options.overlap_percent);
        let mut renderer = Self {
            geometry,
            options,
            sample_rate,
            engine: SaritaEngine::new(shared),
        };
        renderer.restart()?;

        if let Some(message) = renderer.warnings().primary_message() {
            tracing::warn!(
                sample_rate,
                geometry_rate = renderer.geometry.sample_rate(),
                "{message}"
            );
        }
        Ok(renderer)
    }

    /// Reconfigures from scratch so the next render starts from silence.
    fn restart(&mut self) -> Result<()> {
        self.engine.shared().request_reconfigure(ReconfigureRequest {
            geometry: Arc::clone(&self.geometry),
            frame_size: self.options.frame_size,
            correlator: self.options.correlator,
        });
        self.engine.prepare(
            self.sample_rate,
            self.options.frame_size,
            self.geometry.sparse_channels(),
            self.geometry.dense_grid_size(),
        );
        if self.engine.processor().has_valid_geometry() {
            Ok(())
        } else {
            Err(sarita_engine::EngineError::NotConfigured.into())
        }
    }

    /// Geometry being rendered.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Options in use.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Host format warnings, e.g. a sample rate mismatch.
    pub fn warnings(&self) -> Warnings {
        self.engine.warnings()
    }

    /// Engine latency in samples.
    pub fn latency_samples(&self) -> usize {
        self.engine.latency_samples()
    }

    /// Frames processed by the last render.
    pub fn frames_processed(&self) -> u64 {
        self.engine.shared().snapshot().frames_processed
    }

    /// Renders `inputs`, one vector per sparse channel, into one vector per
    /// dense point of the same length.
    ///
    /// Channels beyond those the geometry reads are ignored. `progress` is
    /// called after every block with `(blocks_done, blocks_total)`.
    pub fn render(
        &mut self,
        inputs: &[Vec<f32>],
        mut progress: impl FnMut(usize, usize),
    ) -> Result<Vec<Vec<f32>>> {
        let sparse = self.geometry.sparse_channels();
        if inputs.len() < sparse {
            return Err(Error::ChannelCount {
                expected: sparse,
                found: inputs.len(),
            });
        }
        let inputs = &inputs[..sparse];
        let len = common_length(inputs)?;
        self.restart()?;

        let frame = self.options.frame_size;
        let skip = if self.options.compensate_latency {
            self.latency_samples()
        } else {
            0
        };
        let blocks = (len + skip).div_ceil(frame);
        let dense = self.geometry.dense_grid_size();

        tracing::info!(
            samples = len,
            sparse,
            dense,
            blocks,
            latency = self.latency_samples(),
            "rendering"
        );

        let mut outputs = vec![Vec::with_capacity(blocks * frame); dense];
        let mut in_block = vec![vec![0.0f32; frame]; sparse];
        let mut out_block = vec![vec![0.0f32; frame]; dense];

        for block in 0..blocks {
            let start = block * frame;
            let end = (start + frame).min(len);
            for (dst, src) in in_block.iter_mut().zip(inputs) {
                dst.fill(0.0);
                if start < end {
                    dst[..end - start].copy_from_slice(&src[start..end]);
                }
            }

            let in_refs: Vec<&[f32]> = in_block.iter().map(Vec::as_slice).collect();
            let mut out_refs: Vec<&mut [f32]> =
                out_block.iter_mut().map(Vec::as_mut_slice).collect();
            self.engine.process_block(&in_refs, &mut out_refs)?;

            for (out, chunk) in outputs.iter_mut().zip(&out_block) {
                out.extend_from_slice(chunk);
            }
            progress(block + 1, blocks);
        }

        for out in &mut outputs {
            out.drain(..skip.min(out.len()));
            out.truncate(len);
        }
        Ok(outputs)
    }
}
