//! Speech enhancement: pre-emphasis, spectral-subtraction noise reduction,
//! piecewise-linear EQ, and soft-knee compression.
//!
//! Each stage can be toggled through [`EnhancementConfig`]; the adaptive
//! pipeline controller re-runs this component with adjusted settings when a
//! re-processing strategy targets audio quality.

use super::{AudioBuffer, dsp, dsp::Stft};
use crate::config::EnhancementConfig;
use crate::Result;
use log::debug;
use serde::{Deserialize, Serialize};

/// Pre-emphasis coefficient for the speech band.
const PRE_EMPHASIS_ALPHA: f32 = 0.97;
/// Portion of the signal head used for the noise profile, in seconds.
const NOISE_PROFILE_SECONDS: f64 = 0.5;
/// Spectral floor as a fraction of the original magnitude.
const SPECTRAL_FLOOR: f32 = 0.1;
/// Compressor threshold in dBFS.
const COMPRESSOR_THRESHOLD_DB: f32 = -20.0;
/// Compression ratio above threshold.
const COMPRESSOR_RATIO: f32 = 3.0;
/// Soft-knee width in dB.
const COMPRESSOR_KNEE_DB: f32 = 6.0;

/// Equalizer presets as piecewise-linear gain curves over frequency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EqPreset {
    /// No equalization.
    Flat,
    /// Emphasizes the 300–3400 Hz band that carries Korean speech.
    KoreanSpeech,
    /// Boosts 2–5 kHz where Korean stop and fricative consonants live.
    /// Used by the consonant-boost re-processing strategy.
    ConsonantBoost,
}

impl EqPreset {
    /// Gain curve breakpoints as `(frequency_hz, gain_db)`, interpolated
    /// linearly between points and held flat outside them.
    fn curve(&self) -> &'static [(f32, f32)] {
        match self {
            EqPreset::Flat => &[],
            EqPreset::KoreanSpeech => &[
                (0.0, -4.0),
                (200.0, -1.0),
                (300.0, 2.0),
                (1000.0, 3.0),
                (3400.0, 2.0),
                (5000.0, -1.0),
                (8000.0, -5.0),
            ],
            EqPreset::ConsonantBoost => &[
                (0.0, 0.0),
                (1800.0, 0.0),
                (2000.0, 4.0),
                (3500.0, 5.0),
                (5000.0, 4.0),
                (6000.0, 0.0),
            ],
        }
    }

    fn gain_db_at(&self, freq: f32) -> f32 {
        let curve = self.curve();
        if curve.is_empty() {
            return 0.0;
        }
        if freq <= curve[0].0 {
            return curve[0].1;
        }
        for pair in curve.windows(2) {
            let (f0, g0) = pair[0];
            let (f1, g1) = pair[1];
            if freq <= f1 {
                let t = (freq - f0) / (f1 - f0);
                return g0 + t * (g1 - g0);
            }
        }
        curve[curve.len() - 1].1
    }
}

/// Speech enhancer operating on mono buffers.
pub struct AudioEnhancer {
    config: EnhancementConfig,
    stft: Stft,
}

impl AudioEnhancer {
    /// Create an enhancer from the enhancement configuration section.
    pub fn new(config: EnhancementConfig) -> Self {
        Self {
            config,
            stft: Stft::new(1024, 512),
        }
    }

    /// Override the noise over-subtraction factor, clamped to the supported
    /// `[1.5, 2.5]` range. Used by the enhanced-denoise strategy.
    pub fn with_noise_beta(mut self, beta: f32) -> Self {
        self.config.noise_beta = beta.clamp(1.5, 2.5);
        self
    }

    /// Override the EQ preset. Used by the consonant-boost strategy.
    pub fn with_eq_preset(mut self, preset: EqPreset) -> Self {
        self.config.eq_preset = preset;
        self
    }

    /// Run the enabled enhancement stages.
    ///
    /// The sample rate is preserved and the output length equals the input
    /// length (spectral stages pad their tail within one STFT frame).
    pub fn enhance(&self, input: &AudioBuffer) -> Result<AudioBuffer> {
        let mono = input.to_mono();
        let mut samples = mono.samples().to_vec();
        let sample_rate = mono.sample_rate();

        if self.config.pre_emphasis {
            samples = pre_emphasis(&samples, PRE_EMPHASIS_ALPHA);
        }
        if self.config.noise_reduction || self.config.eq_preset != EqPreset::Flat {
            samples = self.spectral_stage(&samples, sample_rate);
        }
        if self.config.compression {
            samples = compress(&samples, COMPRESSOR_THRESHOLD_DB, COMPRESSOR_RATIO);
            samples = peak_normalize(samples, 0.95);
        }

        debug!(
            "Enhanced audio: denoise={} (beta {:.2}), eq={:?}, compression={}",
            self.config.noise_reduction,
            self.config.noise_beta,
            self.config.eq_preset,
            self.config.compression
        );
        AudioBuffer::mono(samples, sample_rate)
    }

    /// Noise subtraction and EQ share one STFT pass.
    fn spectral_stage(&self, samples: &[f32], sample_rate: u32) -> Vec<f32> {
        let mut frames = self.stft.analyze(samples);
        if frames.is_empty() {
            return samples.to_vec();
        }

        let noise_profile = if self.config.noise_reduction {
            Some(self.estimate_noise_profile(&frames, sample_rate))
        } else {
            None
        };

        let bins = frames[0].len();
        let eq_gains: Vec<f32> = (0..bins)
            .map(|bin| {
                let freq = self.stft.bin_frequency(bin.min(bins - bin), sample_rate);
                dsp::db_to_linear(self.config.eq_preset.gain_db_at(freq))
            })
            .collect();

        for frame in frames.iter_mut() {
            for (bin, value) in frame.iter_mut().enumerate() {
                let magnitude = value.norm();
                if magnitude == 0.0 {
                    continue;
                }
                let mut new_magnitude = magnitude;
                if let Some(noise) = &noise_profile {
                    let subtracted = magnitude - self.config.noise_beta * noise[bin];
                    new_magnitude = subtracted.max(SPECTRAL_FLOOR * magnitude);
                }
                new_magnitude *= eq_gains[bin];
                let scale = new_magnitude / magnitude;
                *value *= scale;
            }
        }

        self.stft.synthesize(&frames, samples.len())
    }

    /// Frame-wise mean magnitude over the first 500 ms of the signal.
    fn estimate_noise_profile(
        &self,
        frames: &[Vec<rustfft::num_complex::Complex<f32>>],
        sample_rate: u32,
    ) -> Vec<f32> {
        let frames_in_profile = ((NOISE_PROFILE_SECONDS * sample_rate as f64) as usize
            / self.stft.hop())
        .clamp(1, frames.len());
        let bins = frames[0].len();
        let mut profile = vec![0.0f32; bins];
        for frame in &frames[..frames_in_profile] {
            for (bin, value) in frame.iter().enumerate() {
                profile[bin] += value.norm();
            }
        }
        for value in profile.iter_mut() {
            *value /= frames_in_profile as f32;
        }
        profile
    }
}

/// First-order pre-emphasis filter `y[n] = x[n] - alpha * x[n-1]`.
fn pre_emphasis(samples: &[f32], alpha: f32) -> Vec<f32> {
    let mut output = Vec::with_capacity(samples.len());
    let mut previous = 0.0f32;
    for &s in samples {
        output.push(s - alpha * previous);
        previous = s;
    }
    output
}

/// Soft-knee downward compressor on a smoothed envelope.
fn compress(samples: &[f32], threshold_db: f32, ratio: f32) -> Vec<f32> {
    // One-pole envelope follower, ~5 ms attack / ~50 ms release at 16 kHz.
    let attack = 0.012f32;
    let release = 0.0012f32;
    let mut envelope = 0.0f32;
    let half_knee = COMPRESSOR_KNEE_DB / 2.0;

    samples
        .iter()
        .map(|&s| {
            let rectified = s.abs();
            let coefficient = if rectified > envelope { attack } else { release };
            envelope += coefficient * (rectified - envelope);

            let level_db = dsp::dbfs(envelope.max(1e-9));
            let over = level_db - threshold_db;
            let gain_db = if over <= -half_knee {
                0.0
            } else if over >= half_knee {
                over * (1.0 / ratio - 1.0)
            } else {
                // Quadratic interpolation through the knee.
                let t = over + half_knee;
                (1.0 / ratio - 1.0) * t * t / (2.0 * COMPRESSOR_KNEE_DB)
            };
            s * dsp::db_to_linear(gain_db)
        })
        .collect()
}

/// Scale so the absolute peak hits `target`, leaving silence untouched.
fn peak_normalize(mut samples: Vec<f32>, target: f32) -> Vec<f32> {
    let peak = samples.iter().fold(0f32, |m, &s| m.max(s.abs()));
    if peak > 1e-6 {
        let gain = target / peak;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnhancementConfig;

    fn tone_with_noise(sr: u32, seconds: f64, tone_amp: f32, noise_amp: f32) -> Vec<f32> {
        (0..(sr as f64 * seconds) as usize)
            .map(|i| {
                let t = i as f32 / sr as f32;
                let tone = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * tone_amp;
                // Deterministic pseudo-noise, cheap and reproducible.
                let noise = ((i as f32 * 12.9898).sin() * 43758.547).fract() - 0.5;
                tone + noise * noise_amp
            })
            .collect()
    }

    #[test]
    fn output_length_matches_input() {
        let audio = AudioBuffer::mono(tone_with_noise(16000, 1.0, 0.4, 0.05), 16000).unwrap();
        let enhancer = AudioEnhancer::new(EnhancementConfig::default());
        let enhanced = enhancer.enhance(&audio).unwrap();
        assert_eq!(enhanced.samples().len(), audio.samples().len());
        assert_eq!(enhanced.sample_rate(), audio.sample_rate());
    }

    #[test]
    fn noise_reduction_lowers_noise_floor() {
        let sr = 16000;
        // Half a second of pure noise (the profile region), then tone+noise.
        let mut samples = tone_with_noise(sr, 0.5, 0.0, 0.1);
        samples.extend(tone_with_noise(sr, 1.0, 0.5, 0.1));
        let audio = AudioBuffer::mono(samples, sr).unwrap();

        let mut config = EnhancementConfig::default();
        config.pre_emphasis = false;
        config.compression = false;
        config.eq_preset = EqPreset::Flat;
        config.noise_reduction = true;
        let enhanced = AudioEnhancer::new(config).enhance(&audio).unwrap();

        // The noise-only head should come out quieter than it went in.
        let head = (sr as f64 * 0.4) as usize;
        let noise_before = dsp::rms(&audio.samples()[1024..head]);
        let noise_after = dsp::rms(&enhanced.samples()[1024..head]);
        assert!(
            noise_after < noise_before * 0.8,
            "noise {noise_before} -> {noise_after}"
        );
    }

    #[test]
    fn eq_presets_interpolate_between_breakpoints() {
        let preset = EqPreset::KoreanSpeech;
        assert!(preset.gain_db_at(1000.0) > preset.gain_db_at(100.0));
        assert!(preset.gain_db_at(8000.0) < 0.0);

        let boost = EqPreset::ConsonantBoost;
        assert_eq!(boost.gain_db_at(500.0), 0.0);
        assert!(boost.gain_db_at(3000.0) > 3.0);
        assert_eq!(EqPreset::Flat.gain_db_at(1234.0), 0.0);
    }

    #[test]
    fn compression_reduces_dynamic_range() {
        let sr = 16000;
        let mut samples = tone_with_noise(sr, 0.5, 0.05, 0.0);
        samples.extend(tone_with_noise(sr, 0.5, 0.9, 0.0));
        let audio = AudioBuffer::mono(samples, sr).unwrap();

        let mut config = EnhancementConfig::default();
        config.pre_emphasis = false;
        config.noise_reduction = false;
        config.eq_preset = EqPreset::Flat;
        config.compression = true;
        let enhanced = AudioEnhancer::new(config).enhance(&audio).unwrap();

        let quiet_len = (sr as f64 * 0.5) as usize;
        let range_before = dsp::rms(&audio.samples()[quiet_len..])
            / dsp::rms(&audio.samples()[..quiet_len]).max(1e-9);
        let range_after = dsp::rms(&enhanced.samples()[quiet_len..])
            / dsp::rms(&enhanced.samples()[..quiet_len]).max(1e-9);
        assert!(
            range_after < range_before,
            "dynamic range {range_before} -> {range_after}"
        );
    }

    #[test]
    fn beta_override_is_clamped() {
        let enhancer = AudioEnhancer::new(EnhancementConfig::default()).with_noise_beta(9.0);
        assert_eq!(enhancer.config.noise_beta, 2.5);
        let enhancer = AudioEnhancer::new(EnhancementConfig::default()).with_noise_beta(0.1);
        assert_eq!(enhancer.config.noise_beta, 1.5);
    }
}
