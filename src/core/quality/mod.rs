//! Quality metrics and the validator driving adaptive re-processing.

pub mod validator;

pub use validator::{QualityAssessment, QualityValidator, StrategyHint};

use crate::core::hangul;
use serde::{Deserialize, Serialize};

/// Phonetic-validity factor; a placeholder until a phonotactic checker
/// replaces it.
const PHONETIC_VALIDITY_DEFAULT: f32 = 0.9;

/// Multi-dimensional quality metrics, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    /// Edit-distance accuracy over Hangul syllables
    pub syllable_accuracy: f32,
    /// Edit-distance accuracy over jamo sequences
    pub phonetic_similarity: f32,
    /// Confidence reported by the recognition stage
    pub confidence_score: f32,
    /// Agreement between actual and expected utterance duration
    pub duration_alignment: f32,
    /// Korean text quality of the prediction
    pub korean_text_quality: f32,
    /// Weighted composite of the above
    pub overall: f32,
}

/// Korean text quality in `[0, 1]`: the average of the Hangul-character
/// ratio, the complement of the incomplete-jamo ratio, and a phonetic
/// validity placeholder.
///
/// Shared between the ensemble score and the validator. The input text is
/// never mutated or filtered; this is a read-only measure.
pub fn korean_text_quality(text: &str) -> f32 {
    let significant: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
    if significant.is_empty() {
        return 0.0;
    }

    let total = significant.len() as f32;
    let hangul_count = significant
        .iter()
        .filter(|&&c| hangul::is_hangul_syllable(c))
        .count() as f32;
    let incomplete_count = significant
        .iter()
        .filter(|&&c| hangul::is_incomplete_jamo(c))
        .count() as f32;

    let hangul_ratio = hangul_count / total;
    let completeness = 1.0 - incomplete_count / total;

    (hangul_ratio + completeness + PHONETIC_VALIDITY_DEFAULT) / 3.0
}
