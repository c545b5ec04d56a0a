//! Trend and offset removal.
//!
//! Both operations work in place. The linear fit uses sample index as the
//! abscissa, so it is independent of the sample rate.

/// Least-squares line `(intercept, slope)` through `(i, signal[i])`.
///
/// Returns `None` for fewer than two samples.
pub fn fit_line(signal: &[f64]) -> Option<(f64, f64)> {
    let n = signal.len();
    if n < 2 {
        return None;
    }

    // Center the abscissa to keep the normal equations well conditioned for
    // day-long traces (n ~ 1e7).
    let m = n as f64;
    let t_mean = (m - 1.0) / 2.0;
    let y_mean = signal.iter().sum::<f64>() / m;

    let mut s_tt = 0.0;
    let mut s_ty = 0.0;
    for (i, &y) in signal.iter().enumerate() {
        let t = i as f64 - t_mean;
        s_tt += t * t;
        s_ty += t * (y - y_mean);
    }

    let slope = s_ty / s_tt;
    let intercept = y_mean - slope * t_mean;
    Some((intercept, slope))
}

/// Remove the least-squares linear trend.
///
/// A single-sample signal is demeaned instead (becomes zero).
pub fn detrend_linear(signal: &mut [f64]) {
    match fit_line(signal) {
        Some((intercept, slope)) => {
            for (i, sample) in signal.iter_mut().enumerate() {
                *sample -= intercept + slope * i as f64;
            }
        }
        None => demean(signal),
    }
}

/// Arithmetic mean; 0.0 for an empty signal.
pub fn mean(signal: &[f64]) -> f64 {
    if signal.is_empty() {
        return 0.0;
    }
    signal.iter().sum::<f64>() / signal.len() as f64
}

/// Subtract the mean.
pub fn demean(signal: &mut [f64]) {
    let m = mean(signal);
    for sample in signal.iter_mut() {
        *sample -= m;
    }
}
