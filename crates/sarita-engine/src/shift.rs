//! Per-neighbour delay estimation and placement.
//!
//! Shifts are in samples, positive when a neighbour lags the reference
//! (`neighbor[n] ≈ reference[n - shift]`). A dense point's signal is the
//! weighted sum of its neighbours, each advanced by its own shift and then
//! delayed by the weighted mean shift, so the result sits at the point's
//! interpolated arrival time.

use sarita_analysis::peak_lag_within;
use sarita_core::round_half_away;

/// Estimates one neighbour's shift from the stored pair correlation.
///
/// `correlation` holds lags `-max_lag..=max_lag`. When `reversed` the stored
/// pair is (neighbour, reference) and the lag axis is flipped through
/// `scratch`, which must be at least as long as `correlation`.
pub fn estimate_shift(
    correlation: &[f32],
    max_lag: usize,
    search: usize,
    reversed: bool,
    scratch: &mut [f32],
) -> i32 {
    if reversed {
        let flipped = &mut scratch[..correlation.len()];
        for (dst, &src) in flipped.iter_mut().zip(correlation.iter().rev()) {
            *dst = src;
        }
        peak_lag_within(flipped, max_lag, search).0
    } else {
        peak_lag_within(correlation, max_lag, search).0
    }
}

/// `sum(shift_j * weight_j)`; weights are not renormalized.
#[inline]
pub fn weighted_mean(shifts: &[i32], weights: &[f32]) -> f32 {
    shifts
        .iter()
        .zip(weights.iter())
        .map(|(&s, &w)| s as f32 * w)
        .sum()
}

/// Start index of a neighbour's frame inside the padded dense buffer.
///
/// `round(mean - shift + max_shift)`, halves away from zero, clamped to
/// `[0, 2 * max_shift]`.
///
/// ```rust
/// use sarita_engine::shift::placement_offset;
///
/// assert_eq!(placement_offset(0.0, 0, 4), 4);
/// assert_eq!(placement_offset(1.5, 0, 4), 6);
/// assert_eq!(placement_offset(0.0, 9, 4), 0);
/// ```
#[inline]
pub fn placement_offset(mean: f32, shift: i32, max_shift: usize) -> usize {
    let offset = round_half_away(mean - shift as f32 + max_shift as f32);
    offset.clamp(0, 2 * max_shift as i32) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corr_with_peak(max_lag: usize, lag: i32) -> Vec<f32> {
        let mut c = vec![0.1; 2 * max_lag + 1];
        c[(max_lag as i32 + lag) as usize] = 1.0;
        c
    }

    #[test]
    fn test_estimate_shift_direct() {
        let mut scratch = vec![0.0; 9];
        let c = corr_with_peak(4, 3);
        assert_eq!(estimate_shift(&c, 4, 4, false, &mut scratch), 3);
    }

    #[test]
    fn test_estimate_shift_reversed_negates() {
        let mut scratch = vec![0.0; 9];
        let c = corr_with_peak(4, 3);
        assert_eq!(estimate_shift(&c, 4, 4, true, &mut scratch), -3);
    }

    #[test]
    fn test_estimate_shift_respects_search_window() {
        let mut scratch = vec![0.0; 9];
        let mut c = corr_with_peak(4, 4);
        c[4 + 1] = 0.5;
        assert_eq!(estimate_shift(&c, 4, 2, false, &mut scratch), 1);
    }

    #[test]
    fn test_zero_search_pins_to_zero() {
        let mut scratch = vec![0.0; 9];
        let c = corr_with_peak(4, -2);
        assert_eq!(estimate_shift(&c, 4, 0, false, &mut scratch), 0);
    }

    #[test]
    fn test_weighted_mean_not_normalized() {
        assert_eq!(weighted_mean(&[0, 4], &[0.5, 0.5]), 2.0);
        assert_eq!(weighted_mean(&[0, 4], &[0.25, 0.25]), 1.0);
        assert_eq!(weighted_mean(&[], &[]), 0.0);
    }

    #[test]
    fn test_placement_rounds_half_away() {
        // mean 0.5, shift 0, bias 2 -> 2.5 -> 3
        assert_eq!(placement_offset(0.5, 0, 2), 3);
        // mean 1, shift 2 -> 1 - 2 + 2 = 1
        assert_eq!(placement_offset(1.0, 2, 2), 1);
        // mean -2.5, no bias -> clamped to 0
        assert_eq!(placement_offset(-2.5, 0, 0), 0);
    }

    #[test]
    fn test_placement_clamped_to_padding() {
        assert_eq!(placement_offset(10.0, -10, 3), 6);
        assert_eq!(placement_offset(-10.0, 10, 3), 0);
    }

    #[test]
    fn test_pair_placement_aligns_neighbours() {
        // neighbour lags the reference by 2; equal weights
        let shifts = [0, 2];
        let m = weighted_mean(&shifts, &[0.5, 0.5]);
        let ref_off = placement_offset(m, shifts[0], 4);
        let nb_off = placement_offset(m, shifts[1], 4);
        // reference delayed by 1, neighbour advanced by 1: both land at mean
        assert_eq!(ref_off, 5);
        assert_eq!(nb_off, 3);
    }
}
