//! Real-time cross-correlation engines.
//!
//! A [`CrossCorrelator`] is built once for a fixed frame length and lag range
//! and then correlates frame pairs into caller-provided buffers without
//! allocating. Two backends share the same output convention (see
//! [`crate::xcorr`]): unnormalized, `2 * max_lag + 1` values centered on
//! lag 0.
//!
//! | Backend | Cost per pair | Notes |
//! |---------|---------------|-------|
//! | [`DirectCorrelator`] | O(N · max_lag) | No state; best for short frames or few lags |
//! | [`FftCorrelator`] | O(S log S), S = next_pow2(N + max_lag) | Caches one spectrum per channel in [`CrossCorrelator::correlate_pairs`] |
//!
//! [`Correlator`] dispatches over both, selected by [`CorrelatorKind`]. Without
//! the `fft` feature every kind resolves to the direct backend.

use crate::xcorr::xcorr_direct_into;
use sarita_core::Matrix;

#[cfg(feature = "fft")]
use crate::fft::Fft;
#[cfg(feature = "fft")]
use crate::xcorr::{fft_size_for, unwrap_circular};
#[cfg(feature = "fft")]
use rustfft::num_complex::Complex;

/// Frame length at or above which [`CorrelatorKind::Auto`] picks the FFT backend.
pub const FFT_THRESHOLD: usize = 256;

/// Correlates fixed-length frames over a fixed lag range.
pub trait CrossCorrelator {
    /// Frame length this engine was built for.
    fn frame_len(&self) -> usize;

    /// Largest lag magnitude computed.
    fn max_lag(&self) -> usize;

    /// Values written per correlation: `2 * max_lag + 1`.
    fn output_len(&self) -> usize {
        2 * self.max_lag() + 1
    }

    /// Writes R_xy for lags `-max_lag..=max_lag` into `out`.
    ///
    /// `out.len()` must equal [`output_len`](Self::output_len).
    fn correlate(&mut self, x: &[f32], y: &[f32], out: &mut [f32]);

    /// Correlates row pairs of `frames`; pair `k` is written to row `k` of `out`.
    fn correlate_pairs(
        &mut self,
        frames: &Matrix<f32>,
        pairs: &[(usize, usize)],
        out: &mut Matrix<f32>,
    ) {
        for (k, &(a, b)) in pairs.iter().enumerate() {
            self.correlate(frames.row(a), frames.row(b), out.row_mut(k));
        }
    }
}

/// Time-domain correlator.
#[derive(Debug, Clone)]
pub struct DirectCorrelator {
    frame_len: usize,
    max_lag: usize,
}

impl DirectCorrelator {
    /// Creates a correlator for frames of `frame_len` samples.
    pub fn new(frame_len: usize, max_lag: usize) -> Self {
        Self { frame_len, max_lag }
    }
}

impl CrossCorrelator for DirectCorrelator {
    fn frame_len(&self) -> usize {
        self.frame_len
    }

    fn max_lag(&self) -> usize {
        self.max_lag
    }

    #[inline]
    fn correlate(&mut self, x: &[f32], y: &[f32], out: &mut [f32]) {
        xcorr_direct_into(x, y, out);
    }
}

/// Frequency-domain correlator with preplanned transforms and scratch.
#[cfg(feature = "fft")]
pub struct FftCorrelator {
    fft: Fft,
    frame_len: usize,
    max_lag: usize,
    buf_x: Vec<Complex<f32>>,
    buf_y: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
    /// One spectrum per channel, filled by `correlate_pairs`.
    spectra: Matrix<Complex<f32>>,
}

#[cfg(feature = "fft")]
impl FftCorrelator {
    /// Plans transforms for `frame_len`-sample frames and reserves spectrum
    /// cache for `channels` channels.
    pub fn new(frame_len: usize, max_lag: usize, channels: usize) -> Self {
        let size = fft_size_for(frame_len, max_lag);
        let fft = Fft::new(size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.scratch_len()];

        Self {
            fft,
            frame_len,
            max_lag,
            buf_x: vec![Complex::new(0.0, 0.0); size],
            buf_y: vec![Complex::new(0.0, 0.0); size],
            scratch,
            spectra: Matrix::new(channels, size),
        }
    }

    /// Transform length.
    pub fn fft_size(&self) -> usize {
        self.fft.size()
    }

    /// Inverse-transforms `buf_x` (holding a cross spectrum) into `out`.
    fn finish(&mut self, out: &mut [f32]) {
        self.fft
            .inverse_with_scratch(&mut self.buf_x, &mut self.scratch);
        unwrap_circular(&self.buf_x, out);
    }
}

#[cfg(feature = "fft")]
impl CrossCorrelator for FftCorrelator {
    fn frame_len(&self) -> usize {
        self.frame_len
    }

    fn max_lag(&self) -> usize {
        self.max_lag
    }

    fn correlate(&mut self, x: &[f32], y: &[f32], out: &mut [f32]) {
        self.fft.load_real(x, &mut self.buf_x);
        self.fft.load_real(y, &mut self.buf_y);
        self.fft
            .forward_with_scratch(&mut self.buf_x, &mut self.scratch);
        self.fft
            .forward_with_scratch(&mut self.buf_y, &mut self.scratch);

        for (cx, cy) in self.buf_x.iter_mut().zip(self.buf_y.iter()) {
            *cx = cx.conj() * cy;
        }
        self.finish(out);
    }

    fn correlate_pairs(
        &mut self,
        frames: &Matrix<f32>,
        pairs: &[(usize, usize)],
        out: &mut Matrix<f32>,
    ) {
        if frames.rows() > self.spectra.rows() {
            for (k, &(a, b)) in pairs.iter().enumerate() {
                self.correlate(frames.row(a), frames.row(b), out.row_mut(k));
            }
            return;
        }

        for ch in 0..frames.rows() {
            let spectrum = self.spectra.row_mut(ch);
            self.fft.load_real(frames.row(ch), spectrum);
            self.fft.forward_with_scratch(spectrum, &mut self.scratch);
        }

        for (k, &(a, b)) in pairs.iter().enumerate() {
            let (sa, sb) = (self.spectra.row(a), self.spectra.row(b));
            for ((dst, x), y) in self.buf_x.iter_mut().zip(sa.iter()).zip(sb.iter()) {
                *dst = x.conj() * y;
            }
            self.finish(out.row_mut(k));
        }
    }
}

/// Backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrelatorKind {
    /// Always time-domain.
    Direct,
    /// Always frequency-domain (direct when built without `fft`).
    Fft,
    /// FFT for frames of [`FFT_THRESHOLD`] samples or more.
    #[default]
    Auto,
}

impl CorrelatorKind {
    /// Backend this kind resolves to for a given frame length.
    pub fn resolve(self, frame_len: usize) -> Self {
        match self {
            Self::Auto if frame_len >= FFT_THRESHOLD => Self::Fft,
            Self::Auto => Self::Direct,
            other => other,
        }
    }
}

/// Enum-dispatched correlator.
pub enum Correlator {
    /// Time-domain backend.
    Direct(DirectCorrelator),
    /// Frequency-domain backend.
    #[cfg(feature = "fft")]
    Fft(FftCorrelator),
}

impl Correlator {
    /// Builds the backend `kind` resolves to. `channels` sizes the FFT
    /// spectrum cache and is ignored by the direct backend.
    #[cfg_attr(not(feature = "fft"), allow(unused_variables))]
    pub fn new(kind: CorrelatorKind, frame_len: usize, max_lag: usize, channels: usize) -> Self {
        match kind.resolve(frame_len) {
            #[cfg(feature = "fft")]
            CorrelatorKind::Fft => Self::Fft(FftCorrelator::new(frame_len, max_lag, channels)),
            _ => Self::Direct(DirectCorrelator::new(frame_len, max_lag)),
        }
    }

    /// Resolved backend.
    pub fn kind(&self) -> CorrelatorKind {
        match self {
            Self::Direct(_) => CorrelatorKind::Direct,
            #[cfg(feature = "fft")]
            Self::Fft(_) => CorrelatorKind::Fft,
        }
    }
}

impl CrossCorrelator for Correlator {
    fn frame_len(&self) -> usize {
        match self {
            Self::Direct(c) => c.frame_len(),
            #[cfg(feature = "fft")]
            Self::Fft(c) => c.frame_len(),
        }
    }

    fn max_lag(&self) -> usize {
        match self {
            Self::Direct(c) => c.max_lag(),
            #[cfg(feature = "fft")]
            Self::Fft(c) => c.max_lag(),
        }
    }

    fn correlate(&mut self, x: &[f32], y: &[f32], out: &mut [f32]) {
        match self {
            Self::Direct(c) => c.correlate(x, y, out),
            #[cfg(feature = "fft")]
            Self::Fft(c) => c.correlate(x, y, out),
        }
    }

    fn correlate_pairs(
        &mut self,
        frames: &Matrix<f32>,
        pairs: &[(usize, usize)],
        out: &mut Matrix<f32>,
    ) {
        match self {
            Self::Direct(c) => c.correlate_pairs(frames, pairs, out),
            #[cfg(feature = "fft")]
            Self::Fft(c) => c.correlate_pairs(frames, pairs, out),
        }
    }
}
