//! Rational resampling for converting traces to the canonical rate.
//!
//! Implements polyphase FIR resampling using a windowed-sinc lowpass with
//! Blackman windowing. A rate change from `fs_in` to `fs_out` is expressed as
//! the reduced fraction `P/Q = fs_out / fs_in` (e.g. 100 Hz → 8 Hz uses
//! P = 2, Q = 25).
//!
//! # Theory
//!
//! Resampling by P/Q is equivalent to upsampling by P, lowpass filtering at
//! `min(1/P, 1/Q)` (normalized), then downsampling by Q. The polyphase
//! decomposition evaluates only the output samples that survive the
//! downsampling. The prototype filter is linear-phase; its group delay of
//! `(taps - 1) / 2` upsampled samples is compensated so the output stays
//! aligned with the input time axis.
//!
//! Reference: P. P. Vaidyanathan, *Multirate Systems and Filter Banks*,
//! Prentice Hall, 1993, Chapter 4.

use std::f64::consts::PI;
use thiserror::Error;

/// Largest P or Q accepted; keeps the prototype filter bounded.
pub const MAX_RATIO_TERM: usize = 10_000;

/// Rates are matched on a millihertz grid.
const RATE_GRID: f64 = 1000.0;

/// Errors from rate ratio derivation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResampleError {
    /// A rate is zero, negative, or not finite.
    #[error("invalid sample rate: {0} Hz")]
    InvalidRate(f64),

    /// The reduced ratio exceeds [`MAX_RATIO_TERM`].
    #[error("cannot resample {from_hz} Hz to {to_hz} Hz: ratio {p}/{q} is too large")]
    RatioTooLarge {
        /// Source rate.
        from_hz: f64,
        /// Target rate.
        to_hz: f64,
        /// Reduced upsampling factor.
        p: usize,
        /// Reduced downsampling factor.
        q: usize,
    },
}

/// Compute windowed-sinc lowpass FIR coefficients.
///
/// `h[n] = sinc(cutoff * (n - M/2)) * w_blackman[n]`, normalized to unity DC
/// gain. `cutoff` is in `(0, 1)` where 1.0 is the Nyquist frequency.
///
/// Reference: A. V. Oppenheim and R. W. Schafer, *Discrete-Time Signal Processing*,
/// 3rd ed., Prentice Hall, 2009, Section 7.6.
pub fn design_lowpass(num_taps: usize, cutoff: f64) -> Vec<f64> {
    if num_taps == 0 {
        return Vec::new();
    }

    let m = num_taps - 1;
    let mut coeffs = Vec::with_capacity(num_taps);

    for n in 0..num_taps {
        let x = n as f64 - m as f64 / 2.0;

        let sinc = if x.abs() < 1e-12 {
            cutoff
        } else {
            (PI * cutoff * x).sin() / (PI * x)
        };

        let window = if m == 0 {
            1.0
        } else {
            let phase = 2.0 * PI * n as f64 / m as f64;
            0.42 - 0.5 * phase.cos() + 0.08 * (2.0 * phase).cos()
        };

        coeffs.push(sinc * window);
    }

    let sum: f64 = coeffs.iter().sum();
    if sum.abs() > 1e-12 {
        for c in coeffs.iter_mut() {
            *c /= sum;
        }
    }

    coeffs
}

/// Compute the greatest common divisor of two integers.
pub fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

/// Reduced `(P, Q)` with `P / Q = to_hz / from_hz`.
pub fn rational_ratio(from_hz: f64, to_hz: f64) -> Result<(usize, usize), ResampleError> {
    for rate in [from_hz, to_hz] {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ResampleError::InvalidRate(rate));
        }
    }

    let from = (from_hz * RATE_GRID).round().max(1.0) as usize;
    let to = (to_hz * RATE_GRID).round().max(1.0) as usize;
    let g = gcd(from, to);
    let (p, q) = (to / g, from / g);

    if p > MAX_RATIO_TERM || q > MAX_RATIO_TERM {
        return Err(ResampleError::RatioTooLarge {
            from_hz,
            to_hz,
            p,
            q,
        });
    }
    Ok((p, q))
}

/// Rational resampling by the factor P/Q.
///
/// The output length is `ceil(input.len() * P / Q)`.
///
/// # Algorithm
///
/// 1. Simplify P and Q by their GCD.
/// 2. Design one prototype lowpass with cutoff `0.9 / max(P, Q)`.
/// 3. Split it into P polyphase sub-filters.
/// 4. Output sample `m` sits at `j = m*Q + D` in the upsampled sequence,
///    where `D` is the prototype group delay; it uses sub-filter `j mod P`
///    over input samples ending at `j / P`.
///
/// # Arguments
///
/// * `signal` - Input samples at the source rate
/// * `p` - Upsampling factor (must be ≥ 1)
/// * `q` - Downsampling factor (must be ≥ 1)
/// * `filter_order` - Prototype FIR length. Pass `0` for the default of
///   `4 * max(P, Q) * 10 + 1` taps.
pub fn resample(signal: &[f64], p: usize, q: usize, filter_order: usize) -> Vec<f64> {
    assert!(p >= 1, "upsample factor P must be >= 1");
    assert!(q >= 1, "downsample factor Q must be >= 1");

    let g = gcd(p, q);
    let p = p / g;
    let q = q / g;

    if p == 1 && q == 1 {
        return signal.to_vec();
    }

    let num_taps = if filter_order == 0 {
        4 * p.max(q) * 10 + 1
    } else {
        filter_order
    };

    let cutoff = 0.9 / p.max(q) as f64;
    let prototype = design_lowpass(num_taps, cutoff);
    let delay = (num_taps - 1) / 2;

    let out_len = (signal.len() * p).div_ceil(q);
    let taps_per_phase = num_taps.div_ceil(p);

    // polyphase[k][i] = prototype[k + i*P]
    let mut polyphase = vec![vec![0.0f64; taps_per_phase]; p];
    for (tap_idx, &coeff) in prototype.iter().enumerate() {
        polyphase[tap_idx % p][tap_idx / p] = coeff;
    }

    let mut output = Vec::with_capacity(out_len);

    for m in 0..out_len {
        let full_idx = m * q + delay;
        let n = full_idx / p;
        let sub_filter = &polyphase[full_idx % p];

        let mut acc = 0.0f64;
        for (i, &coeff) in sub_filter.iter().enumerate() {
            if n >= i && (n - i) < signal.len() {
                acc += coeff * signal[n - i];
            }
        }

        // Scale by P to restore unity gain after zero insertion.
        output.push(acc * p as f64);
    }

    output
}

/// Resample between two rates given in Hz.
pub fn resample_rate(signal: &[f64], from_hz: f64, to_hz: f64) -> Result<Vec<f64>, ResampleError> {
    let (p, q) = rational_ratio(from_hz, to_hz)?;
    Ok(resample(signal, p, q, 0))
}
