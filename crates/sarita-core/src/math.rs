//! Small numeric helpers for the per-frame path.
//!
//! All functions are allocation-free and suitable for `no_std`.

use libm::roundf;

/// Rounds to the nearest integer, halves away from zero.
///
/// ```rust
/// use sarita_core::round_half_away;
///
/// assert_eq!(round_half_away(2.5), 3);
/// assert_eq!(round_half_away(-2.5), -3);
/// assert_eq!(round_half_away(-0.4), 0);
/// ```
#[inline]
pub fn round_half_away(x: f32) -> i32 {
    roundf(x) as i32
}

/// `dst[i] += src[i] * gain` over the shorter of the two slices.
#[inline]
pub fn accumulate_scaled(dst: &mut [f32], src: &[f32], gain: f32) {
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d += s * gain;
    }
}

/// `dst[i] += src[i]` over the shorter of the two slices.
#[inline]
pub fn accumulate(dst: &mut [f32], src: &[f32]) {
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d += s;
    }
}

/// Frame overlap in samples for a percentage of the frame length.
///
/// Truncates toward zero, then caps at half the frame.
///
/// ```rust
/// use sarita_core::overlap_samples;
///
/// assert_eq!(overlap_samples(256, 25.0), 64);
/// assert_eq!(overlap_samples(256, 12.5), 32);
/// assert_eq!(overlap_samples(100, 33.3), 33);
/// ```
#[inline]
pub fn overlap_samples(frame_len: usize, percent: f32) -> usize {
    let percent = if percent.is_finite() {
        percent.clamp(0.0, 50.0)
    } else {
        0.0
    };
    ((frame_len as f32 * percent / 100.0) as usize).min(frame_len / 2)
}

/// Sum of squares.
#[inline]
pub fn energy(signal: &[f32]) -> f32 {
    signal.iter().map(|&s| s * s).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_away() {
        assert_eq!(round_half_away(0.5), 1);
        assert_eq!(round_half_away(-0.5), -1);
        assert_eq!(round_half_away(1.49), 1);
        assert_eq!(round_half_away(-1.51), -2);
    }

    #[test]
    fn test_accumulate_scaled() {
        let mut dst = [1.0, 1.0, 1.0];
        accumulate_scaled(&mut dst, &[2.0, 4.0], 0.5);
        assert_eq!(dst, [2.0, 3.0, 1.0]);
    }

    #[test]
    fn test_overlap_samples_clamps() {
        assert_eq!(overlap_samples(256, 75.0), 128);
        assert_eq!(overlap_samples(256, -5.0), 0);
        assert_eq!(overlap_samples(256, f32::NAN), 0);
        assert_eq!(overlap_samples(256, 50.0), 128);
    }
}
