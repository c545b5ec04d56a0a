//! FFT wrapper with windowing functions

use rustfft::{FftPlanner, num_complex::Complex};
use std::f64::consts::PI;
use std::sync::Arc;

/// Window function types
///
/// All windows are periodic ("FFT bins") variants, the form used for
/// spectral estimation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Window {
    /// Rectangular (no windowing)
    Rectangular,
    /// Hann window (raised cosine)
    Hann,
    /// Hamming window
    Hamming,
    /// Blackman window
    Blackman,
    /// Tukey (tapered cosine) window; `alpha` is the tapered fraction.
    ///
    /// `alpha = 0` is rectangular, `alpha = 1` is Hann.
    Tukey {
        /// Fraction of the window inside the cosine tapers, in `[0, 1]`.
        alpha: f64,
    },
}

impl Window {
    /// Default window for seismic spectrograms: Tukey with 25% taper.
    pub const TUKEY_QUARTER: Window = Window::Tukey { alpha: 0.25 };

    /// Parse a window name (`tukey`, `hann`, `hamming`, `blackman`, `rectangular`).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "tukey" => Some(Self::TUKEY_QUARTER),
            "hann" | "hanning" => Some(Window::Hann),
            "hamming" => Some(Window::Hamming),
            "blackman" => Some(Window::Blackman),
            "rectangular" | "rect" | "boxcar" | "none" => Some(Window::Rectangular),
            _ => None,
        }
    }

    /// Apply window to a buffer
    pub fn apply(&self, buffer: &mut [f64]) {
        let coeffs = self.coefficients(buffer.len());
        for (sample, w) in buffer.iter_mut().zip(coeffs) {
            *sample *= w;
        }
    }

    /// Get window coefficients
    pub fn coefficients(&self, size: usize) -> Vec<f64> {
        let n = size as f64;
        match *self {
            Window::Rectangular => vec![1.0; size],
            Window::Hann => (0..size)
                .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / n).cos()))
                .collect(),
            Window::Hamming => (0..size)
                .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / n).cos())
                .collect(),
            Window::Blackman => (0..size)
                .map(|i| {
                    let x = 2.0 * PI * i as f64 / n;
                    0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos()
                })
                .collect(),
            Window::Tukey { alpha } => tukey_periodic(size, alpha),
        }
    }
}

/// Periodic Tukey window: the symmetric window of length `size + 1` with the
/// last point dropped.
fn tukey_periodic(size: usize, alpha: f64) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    if alpha <= 0.0 {
        return vec![1.0; size];
    }
    let alpha = alpha.min(1.0);

    let m = size + 1;
    let span = (m - 1) as f64;
    let width = (alpha * span / 2.0).floor() as usize;

    let mut w = vec![1.0; m];
    for (i, value) in w.iter_mut().enumerate().take(width + 1) {
        *value = 0.5 * (1.0 + (PI * (-1.0 + 2.0 * i as f64 / alpha / span)).cos());
    }
    for (i, value) in w.iter_mut().enumerate().skip(m - width - 1) {
        *value = 0.5 * (1.0 + (PI * (-2.0 / alpha + 1.0 + 2.0 * i as f64 / alpha / span)).cos());
    }

    w.truncate(size);
    w
}

/// FFT processor with cached forward and inverse plans
pub struct Fft {
    fft: Arc<dyn rustfft::Fft<f64>>,
    ifft: Arc<dyn rustfft::Fft<f64>>,
    size: usize,
}

impl Fft {
    /// Create a new FFT processor for the given size
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        Self { fft, ifft, size }
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of one-sided bins (DC to Nyquist).
    pub fn num_bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Perform forward FFT on real input
    ///
    /// Returns complex spectrum (size/2 + 1 bins for positive frequencies)
    pub fn forward(&self, input: &[f64]) -> Vec<Complex<f64>> {
        let mut buffer: Vec<Complex<f64>> = input.iter().map(|&x| Complex::new(x, 0.0)).collect();

        // Pad or truncate to FFT size
        buffer.resize(self.size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        buffer.truncate(self.num_bins());
        buffer
    }

    /// Perform inverse FFT from a one-sided spectrum back to a real signal.
    pub fn inverse(&self, spectrum: &[Complex<f64>]) -> Vec<f64> {
        let mut buffer = vec![Complex::new(0.0, 0.0); self.size];
        for (k, &c) in spectrum.iter().enumerate().take(self.num_bins()) {
            buffer[k] = c;
            if k > 0 && k < self.size - k {
                buffer[self.size - k] = c.conj();
            }
        }

        self.ifft.process(&mut buffer);

        let scale = 1.0 / self.size as f64;
        buffer.iter().map(|c| c.re * scale).collect()
    }
}
