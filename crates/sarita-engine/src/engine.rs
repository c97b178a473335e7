//! Host-block adapter around [`SaritaProcessor`].
//!
//! A host calls [`SaritaEngine::prepare`] whenever its stream format changes
//! and [`SaritaEngine::process_block`] once per audio callback. The engine
//! polls [`SaritaShared`] for overlap changes and new geometry at the start
//! of each block, checks the host format against the geometry, and moves
//! audio through the processor one frame-sized chunk at a time.

use crate::error::{EngineError, Result};
use crate::processor::SaritaProcessor;
use crate::status::{ReconfigureRequest, SaritaShared, Warnings};
use std::sync::Arc;

/// Audio-thread side of the engine.
#[derive(Debug)]
pub struct SaritaEngine {
    processor: SaritaProcessor,
    shared: SaritaShared,
    last_request: Option<ReconfigureRequest>,
    sample_rate: u32,
    host_block: usize,
    host_inputs: usize,
    host_outputs: usize,
    warnings: Warnings,
    /// Stand-in for host inputs the geometry needs but the host lacks.
    zeros: Vec<f32>,
}

impl SaritaEngine {
    /// Creates an unconfigured engine reporting through `shared`.
    pub fn new(shared: SaritaShared) -> Self {
        let mut processor = SaritaProcessor::new();
        processor.set_overlap_percent(shared.overlap_percent());
        Self {
            processor,
            shared,
            last_request: None,
            sample_rate: 0,
            host_block: 0,
            host_inputs: 0,
            host_outputs: 0,
            warnings: Warnings::empty(),
            zeros: Vec::new(),
        }
    }

    /// Shared status handle.
    pub fn shared(&self) -> &SaritaShared {
        &self.shared
    }

    /// Wrapped processor.
    pub fn processor(&self) -> &SaritaProcessor {
        &self.processor
    }

    /// Current warnings.
    pub fn warnings(&self) -> Warnings {
        self.warnings
    }

    /// Delay from host input to host output in samples.
    pub fn latency_samples(&self) -> usize {
        self.processor.latency_samples()
    }

    /// Records the host stream format.
    ///
    /// Installs a pending geometry if there is one; otherwise re-applies the
    /// last geometry when the format changed or the processor is in error.
    pub fn prepare(&mut self, sample_rate: u32, host_block: usize, inputs: usize, outputs: usize) {
        let changed = sample_rate != self.sample_rate
            || host_block != self.host_block
            || inputs != self.host_inputs
            || outputs != self.host_outputs;
        self.sample_rate = sample_rate;
        self.host_block = host_block;
        self.host_inputs = inputs;
        self.host_outputs = outputs;

        tracing::debug!(sample_rate, host_block, inputs, outputs, "engine prepared");

        if self.shared.take_invalidation() {
            self.invalidate();
        }
        if let Some(request) = self.shared.take_reconfigure() {
            self.apply(request);
        } else if (changed || !self.processor.has_valid_geometry())
            && let Some(request) = self.last_request.clone()
        {
            self.apply(request);
        }
        self.update_warnings(host_block);
    }

    fn apply(&mut self, request: ReconfigureRequest) {
        let inputs = self.host_inputs.max(request.geometry.sparse_channels());
        self.processor.set_correlator(request.correlator);
        let ok = self
            .processor
            .configure_with_geometry(Arc::clone(&request.geometry), request.frame_size, inputs)
            .is_ok();

        self.zeros.clear();
        self.zeros.resize(request.frame_size, 0.0);
        self.shared
            .publish_configuration(ok, request.geometry.dense_grid_size());
        self.last_request = ok.then_some(request);
    }

    fn invalidate(&mut self) {
        self.processor.teardown();
        self.last_request = None;
        self.shared.publish_configuration(false, 0);
    }

    fn poll(&mut self) {
        if self.shared.take_invalidation() {
            self.invalidate();
        }
        if let Some(percent) = self.shared.take_overlap_change() {
            self.processor.set_overlap_percent(percent);
        } else if let Some(request) = self.shared.take_reconfigure() {
            self.apply(request);
            self.update_warnings(self.host_block);
        }
    }

    fn update_warnings(&mut self, block: usize) {
        let mut warnings = Warnings::empty();
        if let Some(geometry) = self.processor.geometry() {
            let frame = self.processor.frame_size();
            warnings.set(
                Warnings::BLOCK_SIZE_MISMATCH,
                block == 0 || block % frame != 0,
            );
            warnings.set(
                Warnings::SAMPLE_RATE,
                self.sample_rate != 0 && self.sample_rate != geometry.sample_rate(),
            );
            warnings.set(
                Warnings::INPUT_CHANNELS,
                self.host_inputs < geometry.sparse_channels(),
            );
            warnings.set(
                Warnings::OUTPUT_CHANNELS,
                self.host_outputs < geometry.dense_grid_size(),
            );
        }
        if warnings != self.warnings {
            self.warnings = warnings;
            self.shared.publish_warnings(warnings);
        }
    }

    /// Processes one host block.
    ///
    /// `inputs[ch]` are host input channels; missing ones read as silence.
    /// `outputs[d]` receives dense point `d`; outputs beyond the grid are
    /// zeroed. All channels must share one length, a multiple of the frame
    /// size. Otherwise, or without a valid geometry, the outputs are
    /// silenced and an error is returned.
    pub fn process_block(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]]) -> Result<()> {
        self.poll();

        for out in outputs.iter_mut() {
            out.fill(0.0);
        }
        if !self.processor.has_valid_geometry() {
            return Err(EngineError::NotConfigured);
        }

        let block = outputs
            .first()
            .map(|c| c.len())
            .or_else(|| inputs.first().map(|c| c.len()))
            .unwrap_or(0);
        let frame = self.processor.frame_size();
        if block != self.host_block {
            self.host_block = block;
            self.update_warnings(block);
        }
        if block % frame != 0 {
            return Err(EngineError::BlockSizeMismatch { block, frame });
        }
        if let Some((channel, out)) = outputs.iter().enumerate().find(|(_, o)| o.len() != block) {
            return Err(EngineError::OutputLength {
                channel,
                len: out.len(),
                block,
            });
        }

        let dense = self.processor.grid_size();
        let served = outputs.len().min(dense);
        let mut frames = 0;

        for start in (0..block).step_by(frame) {
            let end = start + frame;
            for ch in 0..self.processor.num_inputs() {
                let samples = match inputs.get(ch) {
                    Some(c) if c.len() >= end => &c[start..end],
                    _ => &self.zeros[..frame],
                };
                self.processor.push_input(ch, samples)?;
            }

            frames += self.processor.process_ready_frames();

            if self.processor.output_available() >= frame {
                for (d, out) in outputs.iter_mut().take(served).enumerate() {
                    self.processor.pop_output(d, &mut out[start..end]);
                }
                if served < dense {
                    self.processor.skip_output(frame);
                }
            }
        }

        self.shared.add_frames(frames as u64);
        Ok(())
    }
}
