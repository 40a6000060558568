//! Syllable segmentation: data types, the timestamp-based aligner, and the
//! boundary-detection fallback segmenter.

pub mod aligner;
pub mod boundary;

pub use aligner::SyllableAligner;
pub use boundary::BoundarySegmenter;

use crate::core::hangul;
use serde::{Deserialize, Serialize};

/// One Hangul syllable with its time interval and jamo decomposition.
///
/// Within a segmentation, intervals are sorted and non-overlapping but need
/// not cover the full utterance duration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Syllable {
    /// The syllable text, a single precomposed Hangul codepoint
    pub text: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds, strictly greater than `start`
    pub end: f64,
    /// Segmentation confidence in `[0, 1]`
    pub confidence: f32,
    /// Initial consonant (choseong)
    pub initial: String,
    /// Medial vowel (jungseong)
    pub medial: String,
    /// Final consonant (jongseong), empty when absent
    pub coda: String,
}

impl Syllable {
    /// Build a syllable from a Hangul character, filling the jamo fields
    /// from the codec. Non-Hangul characters yield empty jamo fields.
    pub fn new(c: char, start: f64, end: f64, confidence: f32) -> Self {
        let (initial, medial, coda) = match hangul::decompose(c) {
            Ok(jamo) => (
                jamo.initial.to_string(),
                jamo.medial.to_string(),
                jamo.last.map(|j| j.to_string()).unwrap_or_default(),
            ),
            Err(_) => (String::new(), String::new(), String::new()),
        };
        Self {
            text: c.to_string(),
            start,
            end,
            confidence,
            initial,
            medial,
            coda,
        }
    }

    /// Interval length in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Check the segmentation invariants: positive-length, sorted,
/// non-overlapping intervals.
pub fn is_valid_segmentation(syllables: &[Syllable]) -> bool {
    syllables.iter().all(|s| s.start < s.end)
        && syllables.windows(2).all(|pair| pair[0].end <= pair[1].start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syllable_carries_its_decomposition() {
        let syllable = Syllable::new('녕', 0.2, 0.45, 0.8);
        assert_eq!(syllable.text, "녕");
        assert_eq!(syllable.initial, "ㄴ");
        assert_eq!(syllable.medial, "ㅕ");
        assert_eq!(syllable.coda, "ㅇ");
        assert!((syllable.duration() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn open_syllable_has_empty_coda() {
        let syllable = Syllable::new('하', 0.0, 0.1, 0.8);
        assert_eq!(syllable.coda, "");
    }

    #[test]
    fn segmentation_validity() {
        let good = vec![
            Syllable::new('안', 0.0, 0.2, 0.8),
            Syllable::new('녕', 0.2, 0.4, 0.8),
        ];
        assert!(is_valid_segmentation(&good));

        let overlapping = vec![
            Syllable::new('안', 0.0, 0.3, 0.8),
            Syllable::new('녕', 0.2, 0.4, 0.8),
        ];
        assert!(!is_valid_segmentation(&overlapping));

        let zero_length = vec![Syllable::new('안', 0.1, 0.1, 0.8)];
        assert!(!is_valid_segmentation(&zero_length));
    }
}
