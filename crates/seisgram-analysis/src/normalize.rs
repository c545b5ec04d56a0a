//! Per-instance z-score normalization.
//!
//! Every spectrogram is scaled with its own mean and population standard
//! deviation, so amplitudes are not comparable across instances or days.

use crate::spectrogram::Spectrogram;
use chrono::{DateTime, Utc};
use ndarray::Array2;
use thiserror::Error;

/// Standard deviations at or below this are treated as zero.
pub const MIN_STD: f64 = 1e-12;

/// A spectrogram with (near) zero or undefined variance.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
#[error("degenerate spectrogram (mean {mean}, std {std})")]
pub struct DegenerateSpectrogram {
    /// Mean of the rejected instance (NaN if empty).
    pub mean: f64,
    /// Population standard deviation of the rejected instance.
    pub std: f64,
}

/// Zero-mean, unit-variance spectrogram.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedSpectrogram {
    /// `[frequency_bin, time_frame]` z-scores.
    pub data: Array2<f64>,
    /// Start instant of the source segment.
    pub start: DateTime<Utc>,
}

impl NormalizedSpectrogram {
    /// `(frequency bins, time bins)`.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Population mean and standard deviation.
pub fn mean_std(data: &Array2<f64>) -> (f64, f64) {
    let n = data.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = data.sum() / n as f64;
    let var = data.iter().map(|&x| (x - mean) * (x - mean)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

/// Normalize one spectrogram, rejecting degenerate instances.
pub fn normalize(spectrogram: Spectrogram) -> Result<NormalizedSpectrogram, DegenerateSpectrogram> {
    let (mean, std) = mean_std(&spectrogram.data);
    if !(mean.is_finite() && std.is_finite()) || std <= MIN_STD {
        return Err(DegenerateSpectrogram { mean, std });
    }

    let data = spectrogram.data.mapv_into(|x| (x - mean) / std);
    Ok(NormalizedSpectrogram {
        data,
        start: spectrogram.start,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ndarray::array;

    fn spectrogram(data: Array2<f64>) -> Spectrogram {
        Spectrogram {
            data,
            fft_size: 4,
            hop_size: 2,
            sample_rate: 8.0,
            start: Utc.with_ymd_and_hms(2021, 3, 12, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn zero_mean_unit_std() {
        let normalized = normalize(spectrogram(array![[1.0, 2.0, 3.0], [4.0, 5.0, 9.0]])).unwrap();
        let (mean, std) = mean_std(&normalized.data);
        assert!(mean.abs() < 1e-12);
        assert!((std - 1.0).abs() < 1e-12);
        assert_eq!(normalized.shape(), (2, 3));
    }

    #[test]
    fn constant_is_degenerate() {
        let err = normalize(spectrogram(Array2::from_elem((3, 4), 0.7))).unwrap_err();
        assert_eq!(err.std, 0.0);
        assert!((err.mean - 0.7).abs() < 1e-12);
    }

    #[test]
    fn all_zero_is_degenerate() {
        assert!(normalize(spectrogram(Array2::zeros((129, 224)))).is_err());
    }

    #[test]
    fn empty_is_degenerate() {
        let err = normalize(spectrogram(Array2::zeros((129, 0)))).unwrap_err();
        assert!(err.mean.is_nan());
    }

    #[test]
    fn non_finite_is_degenerate() {
        assert!(normalize(spectrogram(array![[1.0, f64::INFINITY]])).is_err());
    }
}
