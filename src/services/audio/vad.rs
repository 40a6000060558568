//! Voice-start detection.
//!
//! Two tiers: a coarse estimate from recognizer word timestamps (a first
//! word stretched over leading silence gives itself away by its duration)
//! and a fine RMS-energy scan over the waveform. When the tiers disagree by
//! more than 100 ms, the fine detector wins.
//!
//! This is a pure function over a bounded buffer; there are no suspension
//! points and no model state.

use super::{AudioBuffer, dsp};
use crate::services::stt::WordAlignment;
use log::debug;

/// RMS threshold above which a frame counts as voiced.
const ENERGY_THRESHOLD: f32 = 0.001;
/// Analysis window in seconds.
const WINDOW_SECONDS: f64 = 0.050;
/// Hop in seconds.
const HOP_SECONDS: f64 = 0.010;
/// Voicing must persist this long to count as a start.
const MIN_SUSTAIN_SECONDS: f64 = 0.050;
/// Guard subtracted from the detected start.
const GUARD_SECONDS: f64 = 0.050;
/// First words longer than this are assumed to swallow leading silence.
const LONG_FIRST_WORD_SECONDS: f64 = 1.5;
/// Fraction of an overlong first word attributed to silence.
const LONG_FIRST_WORD_SILENCE_RATIO: f64 = 0.7;
/// First words starting later than this are trusted as a silence estimate.
const LATE_FIRST_WORD_SECONDS: f64 = 0.5;
/// Tier disagreement beyond this prefers the fine detector.
const TIER_AGREEMENT_SECONDS: f64 = 0.100;

/// Voice-start detector combining recognizer hints with energy analysis.
pub struct VoiceStartDetector;

impl VoiceStartDetector {
    /// Detect the start of sustained speech, in seconds from buffer start.
    ///
    /// `words` may be empty; the detector then relies on energy alone.
    /// Returns 0.0 when no speech onset is found.
    pub fn detect(audio: &AudioBuffer, words: &[WordAlignment]) -> f64 {
        let coarse = Self::coarse_from_words(words);
        let fine = Self::fine_from_energy(audio);

        let start = match (coarse, fine) {
            (Some(c), Some(f)) => {
                if (c - f).abs() > TIER_AGREEMENT_SECONDS {
                    debug!(
                        "VAD tiers disagree (coarse {:.3}s, fine {:.3}s), using fine",
                        c, f
                    );
                    f
                } else {
                    c
                }
            }
            (Some(c), None) => c,
            (None, Some(f)) => f,
            (None, None) => 0.0,
        };
        debug!("Voice start detected at {:.3}s", start);
        start
    }

    /// Coarse tier: infer leading silence from the first word's timing.
    fn coarse_from_words(words: &[WordAlignment]) -> Option<f64> {
        let first = words.first()?;
        let duration = first.end - first.start;

        if duration > LONG_FIRST_WORD_SECONDS {
            // The recognizer stretched the first word over the silence.
            return Some(first.start + duration * LONG_FIRST_WORD_SILENCE_RATIO);
        }
        if first.start > LATE_FIRST_WORD_SECONDS {
            return Some(first.start);
        }
        None
    }

    /// Fine tier: earliest frame whose RMS exceeds the threshold and stays
    /// above it for the sustain window, minus the guard.
    fn fine_from_energy(audio: &AudioBuffer) -> Option<f64> {
        let mono = audio.to_mono();
        let samples = mono.samples();
        let sr = mono.sample_rate() as f64;
        let window = (WINDOW_SECONDS * sr) as usize;
        let hop = (HOP_SECONDS * sr) as usize;
        if window == 0 || hop == 0 || samples.len() < window {
            return None;
        }

        let frame_count = (samples.len() - window) / hop + 1;
        let energies: Vec<f32> = (0..frame_count)
            .map(|f| dsp::rms(&samples[f * hop..f * hop + window]))
            .collect();

        let sustain_frames = (MIN_SUSTAIN_SECONDS / HOP_SECONDS).round() as usize;
        for (i, &energy) in energies.iter().enumerate() {
            if energy <= ENERGY_THRESHOLD {
                continue;
            }
            let run_end = (i + sustain_frames).min(energies.len());
            if energies[i..run_end].iter().all(|&e| e > ENERGY_THRESHOLD)
                && run_end - i >= sustain_frames.min(energies.len() - i)
            {
                let start = i as f64 * HOP_SECONDS;
                return Some((start - GUARD_SECONDS).max(0.0));
            }
        }
        None
    }
}
