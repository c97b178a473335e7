//! FFT wrapper with preplanned transforms and caller-owned scratch.

use rustfft::{FftPlanner, num_complex::Complex};
use std::sync::Arc;

/// Forward/inverse FFT pair of a fixed size.
///
/// The `*_with_scratch` methods take a caller-owned scratch buffer of
/// [`scratch_len`](Self::scratch_len) elements and never allocate, which is
/// what the per-frame correlator uses.
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f32>>,
    ifft: Arc<dyn rustfft::Fft<f32>>,
    size: usize,
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        Self {
            fft,
            ifft,
            size,
        }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Scratch length needed by the in-place transforms in either direction.
    pub fn scratch_len(&self) -> usize {
        self.fft
            .get_inplace_scratch_len()
            .max(self.ifft.get_inplace_scratch_len())
    }

    /// Copies real `input` into `buffer`, zero-padding to the FFT size.
    ///
    /// `input` longer than the FFT size is truncated.
    pub fn load_real(&self, input: &[f32], buffer: &mut [Complex<f32>]) {
        let n = input.len().min(buffer.len());
        for (dst, &src) in buffer[..n].iter_mut().zip(input.iter()) {
            *dst = Complex::new(src, 0.0);
        }
        buffer[n..].fill(Complex::new(0.0, 0.0));
    }

    /// Perform forward FFT on complex input (in-place)
    pub fn forward_complex(&self, buffer: &mut [Complex<f32>]) {
        self.fft.process(buffer);
    }

    /// Forward FFT in place without allocating.
    pub fn forward_with_scratch(&self, buffer: &mut [Complex<f32>], scratch: &mut [Complex<f32>]) {
        self.fft.process_with_scratch(buffer, scratch);
    }

    /// Perform inverse FFT on complex buffer (in-place), normalized by 1/size
    pub fn inverse_complex(&self, buffer: &mut [Complex<f32>]) {
        self.ifft.process(buffer);
        self.normalize(buffer);
    }

    /// Normalized inverse FFT in place without allocating.
    pub fn inverse_with_scratch(&self, buffer: &mut [Complex<f32>], scratch: &mut [Complex<f32>]) {
        self.ifft.process_with_scratch(buffer, scratch);
        self.normalize(buffer);
    }

    fn normalize(&self, buffer: &mut [Complex<f32>]) {
        let scale = 1.0 / self.size as f32;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_fft_roundtrip() {
        let fft = Fft::new(256);

        let input: Vec<f32> = (0..256)
            .map(|i| (2.0 * PI * 10.0 * i as f32 / 256.0).sin())
            .collect();

        let mut buffer = vec![Complex::new(0.0, 0.0); 256];
        let mut scratch = vec![Complex::new(0.0, 0.0); fft.scratch_len()];
        fft.load_real(&input, &mut buffer);
        fft.forward_with_scratch(&mut buffer, &mut scratch);
        fft.inverse_with_scratch(&mut buffer, &mut scratch);

        for (a, b) in input.iter().zip(buffer.iter()) {
            assert!((a - b.re).abs() < 1e-4, "Mismatch: {} vs {}", a, b.re);
        }
    }

    #[test]
    fn test_load_real_zero_pads() {
        let fft = Fft::new(8);
        let mut buffer = vec![Complex::new(9.0, 9.0); 8];
        fft.load_real(&[1.0, 2.0, 3.0], &mut buffer);
        assert_eq!(buffer[2], Complex::new(3.0, 0.0));
        assert!(buffer[3..].iter().all(|c| *c == Complex::new(0.0, 0.0)));
    }
}
