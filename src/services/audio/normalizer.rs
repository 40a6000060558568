//! Audio normalization: mono downmix, resampling to the target rate,
//! silence trimming, and loudness normalization.
//!
//! The normalizer is the first pipeline stage and establishes the format
//! contract every downstream analyzer relies on: mono PCM at the configured
//! sample rate (16 kHz by default) around -20 dBFS.

use super::{AudioBuffer, dsp};
use crate::config::AudioConfig;
use crate::{Result, error::HanToneError};
use log::{debug, warn};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

/// Minimum silence run that gets trimmed, in seconds.
const MIN_TRIMMABLE_SILENCE: f64 = 0.300;
/// Silence retained on each side after trimming, in seconds.
const SILENCE_GUARD: f64 = 0.100;
/// Relative peak fraction used for the per-utterance silence threshold.
const SILENCE_PEAK_RATIO: f32 = 0.03;
/// Hard limit applied after gain.
const CLIP_LIMIT: f32 = 0.99;
/// Resampling ratios outside this range are rejected as unsupported.
const MAX_RESAMPLE_RATIO: f64 = 32.0;

/// Output of a successful normalization pass.
#[derive(Debug, Clone)]
pub struct NormalizedAudio {
    /// Mono audio at the target sample rate, loudness-normalized.
    pub audio: AudioBuffer,
    /// `output_duration / input_duration`; downstream TextGrid imports use
    /// this to rescale timestamps after silence trimming.
    pub time_ratio: f64,
    /// Leading silence removed, in seconds of the original timeline.
    pub leading_trimmed: f64,
    /// Scalar gain that was applied for loudness normalization.
    pub applied_gain: f32,
}

/// Normalizer for raw PCM input.
///
/// Passing the output through the normalizer again is a near no-op: the
/// format already matches, the trim threshold finds no long silence runs,
/// and the loudness gain is ~1.
pub struct AudioNormalizer {
    target_sample_rate: u32,
    target_dbfs: f32,
    /// Absolute silence floor derived from the configured gate.
    silence_floor: f32,
}

impl AudioNormalizer {
    /// Create a normalizer from the audio configuration section.
    pub fn new(config: &AudioConfig) -> Self {
        Self {
            target_sample_rate: config.target_sample_rate,
            target_dbfs: config.target_dbfs,
            silence_floor: dsp::db_to_linear(config.silence_threshold_db),
        }
    }

    /// Normalize `input` to the target format.
    ///
    /// # Errors
    ///
    /// - [`HanToneError::AllSilence`] when every input sample is zero.
    /// - [`HanToneError::InputFormat`] when the resampling ratio is outside
    ///   the supported range.
    pub fn normalize(&self, input: &AudioBuffer) -> Result<NormalizedAudio> {
        if input.is_silent() {
            return Err(HanToneError::AllSilence);
        }

        let input_duration = input.duration_seconds();
        let mono = input.to_mono();
        let resampled = self.resample(&mono)?;

        let (trimmed, leading_trimmed) = self.trim_silence(&resampled);
        let (leveled, applied_gain) = self.normalize_loudness(trimmed);

        let audio = AudioBuffer::mono(leveled, self.target_sample_rate)?;
        let time_ratio = if input_duration > 0.0 {
            audio.duration_seconds() / input_duration
        } else {
            1.0
        };
        debug!(
            "Normalized audio: {:.3}s -> {:.3}s (ratio {:.3}), gain {:.3}",
            input_duration,
            audio.duration_seconds(),
            time_ratio,
            applied_gain
        );

        Ok(NormalizedAudio {
            audio,
            time_ratio,
            leading_trimmed,
            applied_gain,
        })
    }

    fn resample(&self, mono: &AudioBuffer) -> Result<Vec<f32>> {
        if mono.sample_rate() == self.target_sample_rate {
            return Ok(mono.samples().to_vec());
        }

        let ratio = self.target_sample_rate as f64 / mono.sample_rate() as f64;
        if !(1.0 / MAX_RESAMPLE_RATIO..=MAX_RESAMPLE_RATIO).contains(&ratio) {
            return Err(HanToneError::input_format(format!(
                "cannot resample {} Hz to {} Hz",
                mono.sample_rate(),
                self.target_sample_rate
            )));
        }

        let chunk_size = 1024;
        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };
        let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
            .map_err(|e| HanToneError::audio_processing(format!("resampler setup: {e}")))?;

        let input = mono.samples();
        let mut output: Vec<f32> = Vec::with_capacity((input.len() as f64 * ratio) as usize + 64);
        let mut pos = 0;
        while pos < input.len() {
            let needed = resampler.input_frames_next();
            let chunk = if input.len() - pos >= needed {
                let frames = resampler
                    .process(&[&input[pos..pos + needed]], None)
                    .map_err(|e| HanToneError::audio_processing(format!("resampling: {e}")))?;
                pos += needed;
                frames
            } else {
                let frames = resampler
                    .process_partial(Some(&[&input[pos..]]), None)
                    .map_err(|e| HanToneError::audio_processing(format!("resampling: {e}")))?;
                pos = input.len();
                frames
            };
            output.extend_from_slice(&chunk[0]);
        }
        Ok(output)
    }

    /// Remove leading/trailing silence runs of at least 300 ms, keeping a
    /// 100 ms guard on each side. Returns the samples and the amount of
    /// leading audio removed in seconds.
    fn trim_silence(&self, samples: &[f32]) -> (Vec<f32>, f64) {
        let sr = self.target_sample_rate as f64;
        let frame_len = (0.010 * sr) as usize;
        if frame_len == 0 || samples.len() < frame_len {
            return (samples.to_vec(), 0.0);
        }

        let peak = samples.iter().fold(0f32, |m, &s| m.max(s.abs()));
        let threshold = (peak * SILENCE_PEAK_RATIO).max(self.silence_floor);

        let frames: Vec<bool> = samples
            .chunks(frame_len)
            .map(|f| dsp::rms(f) >= threshold)
            .collect();

        let first_voiced = frames.iter().position(|&v| v);
        let last_voiced = frames.iter().rposition(|&v| v);
        let (Some(first), Some(last)) = (first_voiced, last_voiced) else {
            // Nothing crosses the threshold; keep the input untouched rather
            // than returning an empty buffer.
            warn!("Silence trim found no frames above threshold {threshold:.6}");
            return (samples.to_vec(), 0.0);
        };

        let guard_frames = (SILENCE_GUARD / 0.010) as usize;
        let min_run_frames = (MIN_TRIMMABLE_SILENCE / 0.010) as usize;

        let lead_frames = if first >= min_run_frames {
            first.saturating_sub(guard_frames)
        } else {
            0
        };
        let trailing_silence = frames.len() - 1 - last;
        let tail_keep_frames = if trailing_silence >= min_run_frames {
            (last + 1 + guard_frames).min(frames.len())
        } else {
            frames.len()
        };

        let start = lead_frames * frame_len;
        let end = (tail_keep_frames * frame_len).min(samples.len());
        let leading_trimmed = start as f64 / sr;
        (samples[start..end].to_vec(), leading_trimmed)
    }

    /// Scale to the target dBFS and hard-limit the result.
    fn normalize_loudness(&self, mut samples: Vec<f32>) -> (Vec<f32>, f32) {
        let current = dsp::dbfs(dsp::rms(&samples));
        if !current.is_finite() {
            return (samples, 1.0);
        }
        let gain = dsp::db_to_linear(self.target_dbfs - current);
        for s in samples.iter_mut() {
            *s = (*s * gain).clamp(-CLIP_LIMIT, CLIP_LIMIT);
        }
        (samples, gain)
    }
}
