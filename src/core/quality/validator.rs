//! Composite quality validation of a recognition result against a reference
//! transcript, with a strategy hint for the adaptive controller.

use super::{QualityMetrics, korean_text_quality};
use crate::config::QualityConfig;
use crate::core::{hangul, similarity};
use log::debug;
use serde::{Deserialize, Serialize};

/// Composite weights; syllable accuracy dominates.
const WEIGHT_SYLLABLE: f32 = 0.35;
const WEIGHT_PHONETIC: f32 = 0.25;
const WEIGHT_CONFIDENCE: f32 = 0.20;
const WEIGHT_DURATION: f32 = 0.10;
const WEIGHT_KOREAN: f32 = 0.10;

/// Expected duration of one Korean syllable, in seconds.
const SYLLABLE_DURATION_PRIOR: f64 = 0.3;

/// Which metric dragged the composite down the most.
///
/// The adaptive controller matches re-processing strategies against this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyHint {
    SyllableAccuracy,
    PhoneticSimilarity,
    Confidence,
    DurationAlignment,
    KoreanQuality,
}

/// Validation outcome: metrics, pass/fail, and the weakest factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityAssessment {
    pub metrics: QualityMetrics,
    /// Whether `overall` cleared the configured threshold
    pub passed: bool,
    /// The factor that contributed the least, driving strategy selection
    pub hint: StrategyHint,
}

/// Validator producing the composite quality score.
pub struct QualityValidator {
    threshold: f32,
}

impl QualityValidator {
    /// Create a validator from the quality configuration section.
    pub fn new(config: &QualityConfig) -> Self {
        Self {
            threshold: config.quality_threshold,
        }
    }

    /// Score `predicted` against `target`.
    ///
    /// `audio_duration` is the utterance length in seconds;
    /// `predicted_confidence` comes from the recognition stage.
    pub fn assess(
        &self,
        predicted: &str,
        target: &str,
        audio_duration: f64,
        predicted_confidence: f32,
    ) -> QualityAssessment {
        let predicted_syllables = hangul::syllables(predicted);
        let target_syllables = hangul::syllables(target);

        let syllable_accuracy =
            similarity::edit_distance_accuracy(&predicted_syllables, &target_syllables);
        let phonetic_similarity = similarity::edit_distance_accuracy(
            &hangul::jamo_sequence(predicted),
            &hangul::jamo_sequence(target),
        );
        let duration_alignment =
            duration_alignment(audio_duration, target_syllables.len());
        let korean_quality = korean_text_quality(predicted);
        let confidence = predicted_confidence.clamp(0.0, 1.0);

        let overall = (WEIGHT_SYLLABLE * syllable_accuracy
            + WEIGHT_PHONETIC * phonetic_similarity
            + WEIGHT_CONFIDENCE * confidence
            + WEIGHT_DURATION * duration_alignment
            + WEIGHT_KOREAN * korean_quality)
            .clamp(0.0, 1.0);

        let metrics = QualityMetrics {
            syllable_accuracy,
            phonetic_similarity,
            confidence_score: confidence,
            duration_alignment,
            korean_text_quality: korean_quality,
            overall,
        };
        let hint = weakest_factor(&metrics);
        let passed = overall >= self.threshold;
        debug!(
            "Quality: overall {:.3} ({}), syllable {:.3}, phonetic {:.3}, \
             confidence {:.3}, duration {:.3}, korean {:.3}, hint {:?}",
            overall,
            if passed { "pass" } else { "fail" },
            syllable_accuracy,
            phonetic_similarity,
            confidence,
            duration_alignment,
            korean_quality,
            hint
        );

        QualityAssessment {
            metrics,
            passed,
            hint,
        }
    }
}

/// `min(actual, expected) / max(actual, expected)` with the Korean
/// syllable-duration prior of 0.3 s per target syllable.
fn duration_alignment(actual_seconds: f64, target_syllable_count: usize) -> f32 {
    if target_syllable_count == 0 || actual_seconds <= 0.0 {
        return 0.0;
    }
    let expected = SYLLABLE_DURATION_PRIOR * target_syllable_count as f64;
    (actual_seconds.min(expected) / actual_seconds.max(expected)) as f32
}

/// The hint is the factor with the smallest value, ties resolved in weight
/// order so selection stays deterministic.
fn weakest_factor(metrics: &QualityMetrics) -> StrategyHint {
    let factors = [
        (StrategyHint::SyllableAccuracy, metrics.syllable_accuracy),
        (StrategyHint::PhoneticSimilarity, metrics.phonetic_similarity),
        (StrategyHint::Confidence, metrics.confidence_score),
        (StrategyHint::DurationAlignment, metrics.duration_alignment),
        (StrategyHint::KoreanQuality, metrics.korean_text_quality),
    ];
    factors
        .into_iter()
        .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(hint, _)| hint)
        .unwrap_or(StrategyHint::Confidence)
}
