//! Partial Hann window for overlap-add framing.
//!
//! A frame of length `L` with overlap `O` is weighted by a raised-cosine ramp
//! over its first `O` samples, unity in the interior, and the mirrored ramp
//! over its last `O` samples. Both ramps are cut from the same Hann window of
//! length `2O + 1`:
//!
//! ```text
//! h(n) = 0.5 · (1 - cos(π n / O)),   n = 0 ..= 2O
//! up[i]   = h(i)        i = 0 .. O
//! down[i] = h(O + i)    i = 0 .. O
//! ```
//!
//! Since `h(O + i) = 1 - h(i)`, `up[i] + down[i] = 1` and consecutive frames
//! hopped by `L - O` overlap-add to unity gain.

#[cfg(not(feature = "std"))]
extern crate alloc;

#[cfg(feature = "std")]
extern crate std as alloc;

use alloc::vec;
use alloc::vec::Vec;
use core::f32::consts::PI;
use libm::cosf;

/// Frame-length window with Hann ramps at both ends.
///
/// # Example
///
/// ```rust
/// use sarita_core::OverlapWindow;
///
/// let window = OverlapWindow::new(8, 2);
/// let c = window.coefficients();
/// assert_eq!(c[0], 0.0);
/// assert_eq!(c[4], 1.0);
/// assert!((c[1] + c[7] - 1.0).abs() < 1e-6);
/// ```
#[derive(Debug, Clone)]
pub struct OverlapWindow {
    coeffs: Vec<f32>,
    overlap: usize,
}

impl OverlapWindow {
    /// Creates a window of `len` samples with `overlap` samples of ramp at
    /// each end. `overlap` is clamped to `len / 2`.
    pub fn new(len: usize, overlap: usize) -> Self {
        let mut window = Self {
            coeffs: vec![1.0; len],
            overlap: 0,
        };
        window.set_overlap(overlap);
        window
    }

    /// Frame length.
    #[inline]
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    /// True for a zero-length window.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Ramp length in samples.
    #[inline]
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Recomputes the coefficients in place for a new overlap.
    ///
    /// Does not allocate.
    pub fn set_overlap(&mut self, overlap: usize) {
        let len = self.coeffs.len();
        let overlap = overlap.min(len / 2);
        self.overlap = overlap;

        self.coeffs.fill(1.0);
        if overlap == 0 {
            return;
        }

        let step = PI / overlap as f32;
        for i in 0..overlap {
            let up = 0.5 * (1.0 - cosf(step * i as f32));
            let down = 0.5 * (1.0 - cosf(step * (overlap + i) as f32));
            self.coeffs[i] = up;
            self.coeffs[len - overlap + i] = down;
        }
    }

    /// Window coefficients, one per frame sample.
    #[inline]
    pub fn coefficients(&self) -> &[f32] {
        &self.coeffs
    }

    /// Multiplies `frame` by the window.
    ///
    /// Processes `min(frame.len(), self.len())` samples.
    #[inline]
    pub fn apply(&self, frame: &mut [f32]) {
        for (sample, &w) in frame.iter_mut().zip(self.coeffs.iter()) {
            *sample *= w;
        }
    }
}
