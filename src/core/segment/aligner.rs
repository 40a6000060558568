//! Syllable alignment from recognizer word timestamps.
//!
//! Each word's interval is distributed uniformly over the word's Hangul
//! syllables, after the whole timeline has been shifted back by the detected
//! voice-start offset. Mismatches between the target syllable count and the
//! aligned count are truncated to the shorter side with reduced confidence.

use super::Syllable;
use crate::core::hangul;
use crate::services::stt::WordAlignment;
use log::{debug, warn};

/// Confidence for syllables derived from recognizer word timestamps.
const TIMESTAMP_CONFIDENCE: f32 = 0.8;
/// Confidence for syllables from uniform distribution or after truncation.
const UNIFORM_CONFIDENCE: f32 = 0.6;

/// Outcome of an alignment pass.
#[derive(Debug, Clone)]
pub struct AlignmentResult {
    /// Aligned syllables, sorted and non-overlapping
    pub syllables: Vec<Syllable>,
    /// Set when the target syllable count did not match the aligned count
    pub count_mismatch: Option<CountMismatch>,
}

/// The aligner produced a different number of syllables than the target
/// text contains; output was truncated to the shorter side.
#[derive(Debug, Clone, Copy)]
pub struct CountMismatch {
    pub expected: usize,
    pub aligned: usize,
}

/// Word-timestamp based syllable aligner.
pub struct SyllableAligner;

impl SyllableAligner {
    /// Align the Hangul syllables of `target_text` to `words`, shifting all
    /// timestamps by `voice_start` (clamped at zero).
    ///
    /// Words without Hangul content and zero-duration words are skipped.
    pub fn align(
        target_text: &str,
        words: &[WordAlignment],
        voice_start: f64,
    ) -> AlignmentResult {
        let target_syllables = hangul::syllables(target_text);
        debug!(
            "Aligning {} target syllables over {} words (voice start {:.3}s)",
            target_syllables.len(),
            words.len(),
            voice_start
        );

        let mut aligned: Vec<Syllable> = Vec::with_capacity(target_syllables.len());
        for word in words {
            let word_syllables = hangul::syllables(&word.word);
            if word_syllables.is_empty() {
                continue;
            }
            let start = (word.start - voice_start).max(0.0);
            let end = (word.end - voice_start).max(0.0);
            if end <= start {
                debug!("Dropping zero-duration word '{}'", word.word.trim());
                continue;
            }

            let slot = (end - start) / word_syllables.len() as f64;
            let confidence = word.confidence.unwrap_or(TIMESTAMP_CONFIDENCE);
            for (i, &c) in word_syllables.iter().enumerate() {
                let syllable_start = start + i as f64 * slot;
                aligned.push(Syllable::new(
                    c,
                    syllable_start,
                    syllable_start + slot,
                    confidence,
                ));
            }
        }

        let count_mismatch = if aligned.len() != target_syllables.len() {
            warn!(
                "Syllable count mismatch: target has {}, alignment produced {}",
                target_syllables.len(),
                aligned.len()
            );
            let mismatch = CountMismatch {
                expected: target_syllables.len(),
                aligned: aligned.len(),
            };
            aligned.truncate(target_syllables.len());
            for syllable in aligned.iter_mut() {
                syllable.confidence = UNIFORM_CONFIDENCE;
            }
            Some(mismatch)
        } else {
            None
        };

        AlignmentResult {
            syllables: aligned,
            count_mismatch,
        }
    }

    /// Uniform fallback: distribute `[0, duration]` evenly over the Hangul
    /// syllables of `target_text`. Used when a recognizer returns text but
    /// no word timing at all and boundary detection is unavailable.
    pub fn align_uniform(target_text: &str, duration: f64) -> Vec<Syllable> {
        let syllables = hangul::syllables(target_text);
        if syllables.is_empty() || duration <= 0.0 {
            return Vec::new();
        }
        let slot = duration / syllables.len() as f64;
        syllables
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Syllable::new(c, i as f64 * slot, (i + 1) as f64 * slot, UNIFORM_CONFIDENCE)
            })
            .collect()
    }
}
