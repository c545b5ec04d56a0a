//! STFT-based spectrogram generation
//!
//! Each segment becomes a `(frequency bins, time bins)` matrix of one-sided
//! power spectral density, compressed with `log(1 + P)`.
//!
//! Per frame the analyzer removes the frame mean, applies the window, and
//! scales `|X|²` by `1 / (fs · Σw²)` (density scaling), doubling every bin
//! except DC and, for even sizes, Nyquist. The output shape depends only on
//! the segment length, window size, and overlap:
//!
//! ```text
//! F = N / 2 + 1
//! T = (S - N) / hop + 1      hop = N - floor(N * overlap)
//! ```

use crate::fft::{Fft, Window};
use chrono::{DateTime, Utc};
use ndarray::Array2;
use seisgram_core::Segment;
use thiserror::Error;

/// Invalid transform parameters.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransformError {
    /// Window size must be at least 2 samples.
    #[error("window size {0} is too small (minimum 2)")]
    WindowTooSmall(usize),

    /// Overlap must lie in `[0, 1)`.
    #[error("overlap fraction {0} must be in [0, 1)")]
    InvalidOverlap(f64),
}

/// Log-compressed spectrogram of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Spectrogram {
    /// `[frequency_bin, time_frame]` values.
    pub data: Array2<f64>,
    /// FFT size used
    pub fft_size: usize,
    /// Hop size between frames
    pub hop_size: usize,
    /// Sample rate
    pub sample_rate: f64,
    /// Start instant of the source segment.
    pub start: DateTime<Utc>,
}

impl Spectrogram {
    /// Number of frequency bins (fft_size / 2 + 1)
    pub fn num_bins(&self) -> usize {
        self.data.nrows()
    }

    /// Number of time frames
    pub fn num_frames(&self) -> usize {
        self.data.ncols()
    }

    /// `(frequency bins, time bins)`.
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Get frequency in Hz for a given bin index
    pub fn bin_to_freq(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate / self.fft_size as f64
    }

    /// Center time in seconds (from segment start) of a frame.
    pub fn frame_to_time(&self, frame: usize) -> f64 {
        (frame * self.hop_size) as f64 / self.sample_rate
            + self.fft_size as f64 / (2.0 * self.sample_rate)
    }

    /// Value at a bin and frame; `None` if out of bounds.
    pub fn get(&self, bin: usize, frame: usize) -> Option<f64> {
        self.data.get((bin, frame)).copied()
    }

    /// Bin with the largest time-averaged value.
    pub fn dominant_bin(&self) -> Option<usize> {
        self.data
            .rows()
            .into_iter()
            .map(|row| row.sum())
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(bin, _)| bin)
    }
}

/// STFT (Short-Time Fourier Transform) analyzer
pub struct StftAnalyzer {
    fft_size: usize,
    hop_size: usize,
    window: Window,
    fft: Fft,
    window_coeffs: Vec<f64>,
    window_power: f64,
}

impl StftAnalyzer {
    /// Create a new STFT analyzer
    ///
    /// # Arguments
    /// * `fft_size` - Frame length N (also the FFT size)
    /// * `overlap` - Fraction of N shared by consecutive frames, in `[0, 1)`
    /// * `window` - Window function to use
    pub fn new(fft_size: usize, overlap: f64, window: Window) -> Result<Self, TransformError> {
        if fft_size < 2 {
            return Err(TransformError::WindowTooSmall(fft_size));
        }
        if !(0.0..1.0).contains(&overlap) {
            return Err(TransformError::InvalidOverlap(overlap));
        }

        let noverlap = (fft_size as f64 * overlap).floor() as usize;
        let hop_size = fft_size - noverlap;
        let window_coeffs = window.coefficients(fft_size);
        let window_power = window_coeffs.iter().map(|w| w * w).sum();

        Ok(Self {
            fft_size,
            hop_size,
            window,
            fft: Fft::new(fft_size),
            window_coeffs,
            window_power,
        })
    }

    /// Analyzer with 50% overlap and the quarter-taper Tukey window.
    pub fn default_for_size(fft_size: usize) -> Result<Self, TransformError> {
        Self::new(fft_size, 0.5, Window::TUKEY_QUARTER)
    }

    /// Get FFT size
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Get hop size
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Get the window function used
    pub fn window(&self) -> Window {
        self.window
    }

    /// Number of frames for a signal of `len` samples.
    pub fn num_frames(&self, len: usize) -> usize {
        if len >= self.fft_size {
            (len - self.fft_size) / self.hop_size + 1
        } else {
            0
        }
    }

    /// `(frequency bins, time bins)` for a segment of `segment_len` samples.
    pub fn output_shape(&self, segment_len: usize) -> (usize, usize) {
        (self.fft_size / 2 + 1, self.num_frames(segment_len))
    }

    /// One-sided PSD `[bin, frame]` without compression.
    pub fn power(&self, signal: &[f64], sample_rate: f64) -> Array2<f64> {
        let (num_bins, num_frames) = self.output_shape(signal.len());
        let mut power = Array2::<f64>::zeros((num_bins, num_frames));
        let scale = 1.0 / (sample_rate * self.window_power);
        let nyquist_bin = if self.fft_size % 2 == 0 {
            Some(num_bins - 1)
        } else {
            None
        };

        let mut frame = vec![0.0; self.fft_size];
        for frame_idx in 0..num_frames {
            let start = frame_idx * self.hop_size;
            frame.copy_from_slice(&signal[start..start + self.fft_size]);

            // Constant detrend per frame
            let frame_mean = frame.iter().sum::<f64>() / self.fft_size as f64;
            for (sample, &coeff) in frame.iter_mut().zip(self.window_coeffs.iter()) {
                *sample = (*sample - frame_mean) * coeff;
            }

            let spectrum = self.fft.forward(&frame);
            for (bin, c) in spectrum.iter().enumerate() {
                let mut p = c.norm_sqr() * scale;
                if bin != 0 && Some(bin) != nyquist_bin {
                    p *= 2.0;
                }
                power[[bin, frame_idx]] = p;
            }
        }

        power
    }

    /// Log-compressed spectrogram of one segment.
    pub fn analyze(&self, segment: &Segment) -> Spectrogram {
        let data = self
            .power(&segment.samples, segment.sample_rate)
            .mapv_into(f64::ln_1p);

        Spectrogram {
            data,
            fft_size: self.fft_size,
            hop_size: self.hop_size,
            sample_rate: segment.sample_rate,
            start: segment.start,
        }
    }
}
