//! Sarita Analysis - cross-correlation for inter-sensor delay estimation
//!
//! - [`xcorr`] - Direct and FFT cross-correlation, normalization, peak search
//! - [`correlator`] - Allocation-free [`CrossCorrelator`] engines for the
//!   per-frame path ([`DirectCorrelator`], [`FftCorrelator`], [`Correlator`])
//! - [`fft`] - FFT wrapper with caller-owned scratch
//!
//! ## Features
//!
//! - `fft` (default) - Enables the rustfft-backed engine. Without it every
//!   [`CorrelatorKind`] resolves to the direct engine.
//!
//! ## Example
//!
//! ```rust
//! use sarita_analysis::{Correlator, CorrelatorKind, CrossCorrelator};
//! use sarita_analysis::xcorr::peak_lag_within;
//!
//! let mut x = vec![0.0f32; 64];
//! x[10] = 1.0;
//! x[11] = -0.5;
//! let mut y = vec![0.0; 64];
//! y[2..].copy_from_slice(&x[..62]);
//!
//! let mut engine = Correlator::new(CorrelatorKind::Direct, 64, 4, 2);
//! let mut out = vec![0.0; engine.output_len()];
//! engine.correlate(&x, &y, &mut out);
//! assert_eq!(peak_lag_within(&out, 4, 4).0, 2);
//! ```

pub mod correlator;
#[cfg(feature = "fft")]
pub mod fft;
pub mod xcorr;

#[cfg(feature = "fft")]
pub use correlator::FftCorrelator;
pub use correlator::{Correlator, CorrelatorKind, CrossCorrelator, DirectCorrelator, FFT_THRESHOLD};
#[cfg(feature = "fft")]
pub use fft::Fft;
#[cfg(feature = "fft")]
pub use xcorr::xcorr_fft;
pub use xcorr::{peak_lag, peak_lag_within, xcorr_direct, xcorr_direct_into, xcorr_normalized};
