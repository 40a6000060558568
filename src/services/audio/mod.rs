//! Audio processing services: buffer types, WAV loading, normalization,
//! enhancement, and the pitch/formant/voice-start analyzers.
//!
//! Every analyzer operates on an immutable [`AudioBuffer`]; components return
//! new values and never mutate their inputs, so buffers can be shared across
//! tasks without locking.

use crate::{Result, error::HanToneError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub mod dsp;
pub mod enhancer;
pub mod formant;
pub mod loader;
pub mod normalizer;
pub mod pitch;
pub mod vad;

pub use enhancer::{AudioEnhancer, EqPreset};
pub use formant::{FormantAnalysis, FormantAnalyzer, FormantPoint};
pub use loader::load_wav;
pub use normalizer::{AudioNormalizer, NormalizedAudio};
pub use pitch::{Gender, PitchAnalysis, PitchAnalyzer, PitchContour, PitchPoint, PitchStatistics};
pub use vad::VoiceStartDetector;

/// Immutable PCM audio buffer.
///
/// Samples are interleaved `f32` in `[-1, 1]`. The sample vector is shared
/// behind an `Arc`, making clones cheap enough to hand to parallel
/// recognizer tasks.
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    channels: u16,
}

impl AudioBuffer {
    /// Create a buffer, validating the structural invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HanToneError::InputFormat`] when `sample_rate` is zero,
    /// `channels` is zero, or the sample count is not a multiple of the
    /// channel count.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(HanToneError::input_format("sample rate must be positive"));
        }
        if channels == 0 {
            return Err(HanToneError::input_format("channel count must be positive"));
        }
        if samples.len() % channels as usize != 0 {
            return Err(HanToneError::input_format(format!(
                "sample count {} is not a multiple of {} channels",
                samples.len(),
                channels
            )));
        }
        Ok(Self {
            samples: Arc::new(samples),
            sample_rate,
            channels,
        })
    }

    /// Create a mono buffer without channel bookkeeping.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(samples, sample_rate, 1)
    }

    /// Interleaved sample data.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of interleaved channels.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    /// Total duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Whether every sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.samples.iter().all(|&s| s == 0.0)
    }

    /// Downmix to mono by averaging channels. Returns a clone when the
    /// buffer is already mono.
    pub fn to_mono(&self) -> AudioBuffer {
        if self.channels == 1 {
            return self.clone();
        }
        let ch = self.channels as usize;
        let mono: Vec<f32> = self
            .samples
            .chunks_exact(ch)
            .map(|frame| frame.iter().sum::<f32>() / ch as f32)
            .collect();
        AudioBuffer {
            samples: Arc::new(mono),
            sample_rate: self.sample_rate,
            channels: 1,
        }
    }

    /// Raw little-endian byte view of the samples, used for content hashing.
    pub fn content_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.samples.len() * 4);
        for &s in self.samples.iter() {
            bytes.extend_from_slice(&s.to_le_bytes());
        }
        bytes
    }
}

/// Intensity (RMS energy) contour at a fixed time step, in dB.
///
/// Values are offset so that typical speech lands on a positive scale,
/// mirroring acoustic intensity conventions; pure digital silence maps to 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntensityContour {
    /// Frame step in seconds
    pub time_step: f64,
    /// Intensity per frame, dB (offset scale, silence = 0)
    pub values: Vec<f32>,
}

impl IntensityContour {
    /// Time of frame `i` (frame centers are not used; frames are left-aligned).
    pub fn time_at(&self, index: usize) -> f64 {
        index as f64 * self.time_step
    }

    /// Mean over strictly positive frames, or `None` when all frames are
    /// silent.
    pub fn positive_mean(&self) -> Option<f32> {
        let positive: Vec<f32> = self.values.iter().copied().filter(|&v| v > 0.0).collect();
        if positive.is_empty() {
            None
        } else {
            Some(positive.iter().sum::<f32>() / positive.len() as f32)
        }
    }
}

/// Compute the intensity contour of a mono buffer.
///
/// `time_step` is both the window and hop length; the spec floor of 10 ms is
/// enforced.
pub fn intensity_contour(audio: &AudioBuffer, time_step: f64) -> IntensityContour {
    let time_step = time_step.max(0.010);
    let mono = audio.to_mono();
    let samples = mono.samples();
    let step = (time_step * audio.sample_rate() as f64).round() as usize;
    let step = step.max(1);

    let values = samples
        .chunks(step)
        .map(|frame| {
            let rms = dsp::rms(frame);
            if rms <= 0.0 {
                0.0
            } else {
                // 0 dB at an RMS of 1e-5 keeps speech comfortably positive.
                (20.0 * (rms / 1e-5).log10()).max(0.0)
            }
        })
        .collect();

    IntensityContour { time_step, values }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_invariants_are_enforced() {
        assert!(AudioBuffer::new(vec![0.0; 4], 16000, 2).is_ok());
        assert!(AudioBuffer::new(vec![0.0; 3], 16000, 2).is_err());
        assert!(AudioBuffer::new(vec![0.0; 4], 0, 1).is_err());
        assert!(AudioBuffer::new(vec![0.0; 4], 16000, 0).is_err());
    }

    #[test]
    fn stereo_downmix_averages_channels() {
        let buffer = AudioBuffer::new(vec![1.0, -1.0, 0.5, 0.5], 16000, 2).unwrap();
        let mono = buffer.to_mono();
        assert_eq!(mono.channels(), 1);
        assert_eq!(mono.samples(), &[0.0, 0.5]);
        assert_eq!(mono.frames(), 2);
    }

    #[test]
    fn duration_accounts_for_channels() {
        let buffer = AudioBuffer::new(vec![0.0; 32000], 16000, 2).unwrap();
        assert!((buffer.duration_seconds() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn silence_detection() {
        let silent = AudioBuffer::mono(vec![0.0; 100], 16000).unwrap();
        assert!(silent.is_silent());
        let speechy = AudioBuffer::mono(vec![0.0, 0.1, 0.0], 16000).unwrap();
        assert!(!speechy.is_silent());
    }

    #[test]
    fn intensity_contour_positive_for_tone_zero_for_silence() {
        let sr = 16000u32;
        let samples: Vec<f32> = (0..sr)
            .map(|i| (2.0 * std::f32::consts::PI * 220.0 * i as f32 / sr as f32).sin() * 0.5)
            .collect();
        let tone = AudioBuffer::mono(samples, sr).unwrap();
        let contour = intensity_contour(&tone, 0.01);
        assert!(contour.positive_mean().unwrap() > 0.0);

        let silence = AudioBuffer::mono(vec![0.0; sr as usize], sr).unwrap();
        let contour = intensity_contour(&silence, 0.01);
        assert!(contour.positive_mean().is_none());
    }
}
