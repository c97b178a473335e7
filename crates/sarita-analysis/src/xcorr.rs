//! Cross-correlation: time-domain (direct) and frequency-domain (FFT) forms,
//! normalization, and peak lag search.
//!
//! # Definition
//!
//! ```text
//! R_xy(τ) = Σ_{n} x[n] · y[n + τ]
//! ```
//!
//! If y is x delayed by τ₀ samples (`y[n] = x[n - τ₀]`), R_xy peaks at
//! τ = +τ₀. Swapping the arguments mirrors the lag axis:
//! `R_yx(τ) = R_xy(-τ)`, so a stored correlation can serve the reversed pair
//! by reversing the vector.
//!
//! # Layout
//!
//! Every function in this module returns `2 * max_lag + 1` values laid out
//! `[R(-max_lag), …, R(0), …, R(max_lag)]`. Index `max_lag` is lag 0.
//! Outputs are unnormalized unless stated.
//!
//! # References
//!
//! - Oppenheim & Schafer, "Discrete-Time Signal Processing" (3rd ed.), section 2.8.
//! - Knapp & Carter, "The generalized correlation method for estimation of time
//!   delay", IEEE TASSP 24(4), 1976.

#[cfg(feature = "fft")]
use crate::fft::Fft;
#[cfg(feature = "fft")]
use rustfft::num_complex::Complex;

/// Direct time-domain cross-correlation, allocating the output.
///
/// O(n · max_lag). See [`xcorr_direct_into`] for the non-allocating form.
pub fn xcorr_direct(x: &[f32], y: &[f32], max_lag: usize) -> Vec<f32> {
    let mut result = vec![0.0f32; 2 * max_lag + 1];
    xcorr_direct_into(x, y, &mut result);
    result
}

/// Direct cross-correlation into a caller-provided buffer.
///
/// `out.len()` must be odd; `max_lag = out.len() / 2`. Never allocates.
///
/// # Panics
///
/// Panics if `out.len()` is even.
pub fn xcorr_direct_into(x: &[f32], y: &[f32], out: &mut [f32]) {
    assert!(out.len() % 2 == 1, "correlation buffer length must be odd");
    let max_lag = (out.len() / 2) as isize;

    for (out_i, slot) in out.iter_mut().enumerate() {
        let lag = out_i as isize - max_lag;
        // n ranges over indices where both x[n] and y[n + lag] exist
        let n_start = (-lag).max(0) as usize;
        let n_end = (x.len() as isize).min(y.len() as isize - lag).max(0) as usize;

        let mut sum = 0.0f32;
        for n in n_start..n_end.max(n_start) {
            sum += x[n] * y[(n as isize + lag) as usize];
        }
        *slot = sum;
    }
}

/// FFT-based cross-correlation.
///
/// Uses R_xy = IFFT(conj(X) · Y) with zero-padding so that lags up to
/// `max_lag` are free of circular wrap-around. O(n log n).
#[cfg(feature = "fft")]
pub fn xcorr_fft(x: &[f32], y: &[f32], max_lag: usize) -> Vec<f32> {
    let fft_size = fft_size_for(x.len().max(y.len()), max_lag);
    let fft = Fft::new(fft_size);

    let mut buf_x = vec![Complex::new(0.0, 0.0); fft_size];
    let mut buf_y = vec![Complex::new(0.0, 0.0); fft_size];
    fft.load_real(x, &mut buf_x);
    fft.load_real(y, &mut buf_y);

    fft.forward_complex(&mut buf_x);
    fft.forward_complex(&mut buf_y);

    for (cx, cy) in buf_x.iter_mut().zip(buf_y.iter()) {
        *cx = cx.conj() * cy;
    }

    fft.inverse_complex(&mut buf_x);

    let mut result = vec![0.0f32; 2 * max_lag + 1];
    unwrap_circular(&buf_x, &mut result);
    result
}

/// Smallest power-of-two FFT size that holds lags `±max_lag` of signals of
/// length `n` without circular aliasing.
#[cfg(feature = "fft")]
pub fn fft_size_for(n: usize, max_lag: usize) -> usize {
    (n + max_lag).next_power_of_two().max(2)
}

/// Reads lags `±out.len()/2` out of a circular correlation.
///
/// Positive lags sit at indices `0, 1, …`, negative lags wrap to
/// `size-1, size-2, …`. Lags beyond the circular buffer are written as 0.
#[cfg(feature = "fft")]
pub(crate) fn unwrap_circular(circular: &[Complex<f32>], out: &mut [f32]) {
    let size = circular.len() as isize;
    let max_lag = (out.len() / 2) as isize;

    for (out_i, slot) in out.iter_mut().enumerate() {
        let lag = out_i as isize - max_lag;
        let idx = if lag >= 0 { lag } else { size + lag };
        *slot = if (0..size).contains(&idx) && lag.abs() < size {
            circular[idx as usize].re
        } else {
            0.0
        };
    }
}

/// Normalized cross-correlation (Pearson correlation coefficient per lag).
///
/// ```text
/// R̂_xy(τ) = R_xy(τ) / sqrt(Σ x[n]² · Σ y[n]²)
/// ```
///
/// Values lie in [-1, 1]. Near-silent input is returned unnormalized.
pub fn xcorr_normalized(x: &[f32], y: &[f32], max_lag: usize) -> Vec<f32> {
    let raw = xcorr_direct(x, y, max_lag);

    let denom = (sarita_core::energy(x) * sarita_core::energy(y)).sqrt();
    if denom < 1e-12 {
        return raw;
    }

    raw.iter().map(|&r| r / denom).collect()
}

/// Lag of maximum **absolute** correlation and its value.
///
/// `max_lag` is the value used to compute `correlation`. Positive lag means
/// y lags x (`y[n] ≈ x[n - lag]`). Finds anti-phase peaks too; for delay
/// estimation use [`peak_lag_within`].
pub fn peak_lag(correlation: &[f32], max_lag: usize) -> (i32, f32) {
    let mut best_idx = 0;
    let mut best_val = match correlation.first() {
        Some(&v) => v,
        None => return (0, 0.0),
    };

    for (i, &v) in correlation.iter().enumerate().skip(1) {
        if v.abs() > best_val.abs() {
            best_idx = i;
            best_val = v;
        }
    }

    (best_idx as i32 - max_lag as i32, best_val)
}

/// Lag of the maximum (signed) correlation with `|lag| <= search`.
///
/// `correlation` is centered at index `max_lag`; `search` is clamped to
/// `max_lag`. Ties resolve to the most negative lag. Returns `(0, 0.0)` for
/// an empty input.
///
/// ```rust
/// use sarita_analysis::xcorr::peak_lag_within;
///
/// // lags -3..=3, global max at +3 but search limited to ±2
/// let corr = [0.0, 0.1, 0.2, 0.5, 0.9, 0.3, 1.0];
/// assert_eq!(peak_lag_within(&corr, 3, 2), (1, 0.9));
/// ```
pub fn peak_lag_within(correlation: &[f32], max_lag: usize, search: usize) -> (i32, f32) {
    if correlation.is_empty() {
        return (0, 0.0);
    }
    let search = search.min(max_lag);
    let lo = max_lag - search;
    let hi = (max_lag + search).min(correlation.len() - 1);
    if lo > hi {
        return (0, 0.0);
    }

    let mut best_idx = lo;
    let mut best_val = correlation[lo];
    for (i, &v) in correlation.iter().enumerate().take(hi + 1).skip(lo + 1) {
        if v > best_val {
            best_idx = i;
            best_val = v;
        }
    }

    (best_idx as i32 - max_lag as i32, best_val)
}
