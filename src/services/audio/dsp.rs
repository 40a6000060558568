//! Shared signal-processing primitives: windows, RMS/dB conversions,
//! percentiles, and a Hann-windowed STFT built on `rustfft`.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Root-mean-square of a sample slice. Empty input yields 0.
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples.iter().map(|&s| s * s).sum();
    (sum / samples.len() as f32).sqrt()
}

/// RMS level in dBFS. Silence maps to `f32::NEG_INFINITY`.
pub fn dbfs(rms_value: f32) -> f32 {
    if rms_value <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * rms_value.log10()
    }
}

/// Linear gain for a dB value.
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Hann window of length `n`.
pub fn hann_window(n: usize) -> Vec<f32> {
    if n <= 1 {
        return vec![1.0; n];
    }
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / (n - 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// The `p`-th percentile (0–100) of `values` by linear interpolation.
/// Empty input yields 0.
pub fn percentile(values: &[f32], p: f32) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted: Vec<f32> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f32;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f32;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Hann-windowed short-time Fourier transform with overlap-add synthesis.
pub struct Stft {
    window: Vec<f32>,
    size: usize,
    hop: usize,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl Stft {
    /// Create an STFT processor. `hop` should divide `size`; the usual
    /// configuration is `size = 1024`, `hop = 512`.
    pub fn new(size: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            window: hann_window(size),
            size,
            hop,
            forward: planner.plan_fft_forward(size),
            inverse: planner.plan_fft_inverse(size),
        }
    }

    /// Frame size in samples.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Hop size in samples.
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// Analyze `samples` into complex spectra, one per hop.
    pub fn analyze(&self, samples: &[f32]) -> Vec<Vec<Complex<f32>>> {
        if samples.len() < self.size {
            return Vec::new();
        }
        let frame_count = (samples.len() - self.size) / self.hop + 1;
        let mut frames = Vec::with_capacity(frame_count);
        for f in 0..frame_count {
            let offset = f * self.hop;
            let mut buffer: Vec<Complex<f32>> = samples[offset..offset + self.size]
                .iter()
                .zip(&self.window)
                .map(|(&s, &w)| Complex::new(s * w, 0.0))
                .collect();
            self.forward.process(&mut buffer);
            frames.push(buffer);
        }
        frames
    }

    /// Overlap-add resynthesis to `output_len` samples.
    ///
    /// Window energy is compensated per sample, so analyze → synthesize of
    /// an unmodified spectrum reconstructs the interior of the signal within
    /// float tolerance.
    pub fn synthesize(&self, frames: &[Vec<Complex<f32>>], output_len: usize) -> Vec<f32> {
        let mut output = vec![0.0f32; output_len];
        let mut weight = vec![0.0f32; output_len];
        let scale = 1.0 / self.size as f32;

        for (f, frame) in frames.iter().enumerate() {
            let mut buffer = frame.clone();
            self.inverse.process(&mut buffer);
            let offset = f * self.hop;
            for i in 0..self.size {
                let idx = offset + i;
                if idx >= output_len {
                    break;
                }
                output[idx] += buffer[i].re * scale * self.window[i];
                weight[idx] += self.window[i] * self.window[i];
            }
        }
        for (sample, w) in output.iter_mut().zip(weight) {
            if w > 1e-8 {
                *sample /= w;
            }
        }
        output
    }

    /// Center frequency of FFT bin `bin` at the given sample rate.
    pub fn bin_frequency(&self, bin: usize, sample_rate: u32) -> f32 {
        bin as f32 * sample_rate as f32 / self.size as f32
    }
}
