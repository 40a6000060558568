//! Re-processing strategy catalog.
//!
//! Each strategy targets the quality factors it is expected to improve; the
//! controller picks the highest-priority untried strategy matching the
//! validator's hint. Ties are broken by expected improvement, then by name,
//! so selection is a total order and controller runs are deterministic.

use crate::core::quality::StrategyHint;
use crate::services::audio::EqPreset;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Audio-stage adjustments a strategy applies on the next attempt.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AudioAdjustments {
    /// Override the spectral-subtraction over-subtraction factor.
    pub noise_beta: Option<f32>,
    /// Override the EQ preset.
    pub eq_preset: Option<EqPreset>,
    /// Force the compression stage on (the prosody-flattening stand-in).
    pub extra_compression: bool,
}

/// Recognition-stage adjustments a strategy applies on the next attempt.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct SttAdjustments {
    /// Decoding temperature override.
    pub temperature: Option<f32>,
    /// Beam width override.
    pub beam_size: Option<u32>,
    /// Require a consensus group; disables the high-confidence shortcut.
    pub require_consensus: bool,
}

/// One re-processing strategy.
#[derive(Debug, Clone, Copy)]
pub struct ReprocessingStrategy {
    /// Stable strategy name, recorded in `stages_executed`
    pub name: &'static str,
    /// Quality factors this strategy targets
    pub targets: &'static [StrategyHint],
    pub audio: AudioAdjustments,
    pub stt: SttAdjustments,
    /// Lower value means higher priority
    pub priority: u32,
    /// Expected composite-score improvement, used as a tiebreaker
    pub expected_improvement: f32,
}

/// The full strategy catalog, in declaration order.
pub const CATALOG: [ReprocessingStrategy; 5] = [
    ReprocessingStrategy {
        name: "whisper_large_precision",
        targets: &[StrategyHint::SyllableAccuracy, StrategyHint::Confidence],
        audio: AudioAdjustments {
            noise_beta: None,
            eq_preset: None,
            extra_compression: false,
        },
        stt: SttAdjustments {
            temperature: Some(0.0),
            beam_size: Some(10),
            require_consensus: false,
        },
        priority: 1,
        expected_improvement: 0.25,
    },
    ReprocessingStrategy {
        name: "enhanced_denoise",
        targets: &[StrategyHint::Confidence, StrategyHint::KoreanQuality],
        audio: AudioAdjustments {
            noise_beta: Some(2.5),
            eq_preset: None,
            extra_compression: false,
        },
        stt: SttAdjustments {
            temperature: None,
            beam_size: None,
            require_consensus: false,
        },
        priority: 1,
        expected_improvement: 0.15,
    },
    ReprocessingStrategy {
        name: "korean_consonant_boost",
        targets: &[
            StrategyHint::SyllableAccuracy,
            StrategyHint::PhoneticSimilarity,
        ],
        audio: AudioAdjustments {
            noise_beta: None,
            eq_preset: Some(EqPreset::ConsonantBoost),
            extra_compression: false,
        },
        stt: SttAdjustments {
            temperature: None,
            beam_size: None,
            require_consensus: false,
        },
        priority: 2,
        expected_improvement: 0.20,
    },
    ReprocessingStrategy {
        name: "multi_engine_consensus",
        targets: &[StrategyHint::Confidence],
        audio: AudioAdjustments {
            noise_beta: None,
            eq_preset: None,
            extra_compression: false,
        },
        stt: SttAdjustments {
            temperature: None,
            beam_size: None,
            require_consensus: true,
        },
        priority: 2,
        expected_improvement: 0.18,
    },
    ReprocessingStrategy {
        name: "prosody_normalization",
        targets: &[
            StrategyHint::PhoneticSimilarity,
            StrategyHint::DurationAlignment,
        ],
        audio: AudioAdjustments {
            noise_beta: None,
            eq_preset: None,
            // Stand-in for PSOLA-style time flattening.
            extra_compression: true,
        },
        stt: SttAdjustments {
            temperature: None,
            beam_size: None,
            require_consensus: false,
        },
        priority: 3,
        expected_improvement: 0.12,
    },
];

/// Pick the best untried strategy for `hint`.
///
/// Ordering: priority ascending, expected improvement descending, name
/// ascending.
pub fn select_strategy(
    hint: StrategyHint,
    tried: &HashSet<&'static str>,
) -> Option<&'static ReprocessingStrategy> {
    CATALOG
        .iter()
        .filter(|s| s.targets.contains(&hint) && !tried.contains(s.name))
        .min_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then(
                    b.expected_improvement
                        .partial_cmp(&a.expected_improvement)
                        .unwrap_or(std::cmp::Ordering::Equal),
                )
                .then(a.name.cmp(b.name))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syllable_accuracy_prefers_precision_mode() {
        let tried = HashSet::new();
        let strategy = select_strategy(StrategyHint::SyllableAccuracy, &tried).unwrap();
        assert_eq!(strategy.name, "whisper_large_precision");
        assert_eq!(strategy.stt.temperature, Some(0.0));
        assert_eq!(strategy.stt.beam_size, Some(10));
    }

    #[test]
    fn tried_strategies_are_skipped() {
        let mut tried = HashSet::new();
        tried.insert("whisper_large_precision");
        let strategy = select_strategy(StrategyHint::SyllableAccuracy, &tried).unwrap();
        assert_eq!(strategy.name, "korean_consonant_boost");

        tried.insert("korean_consonant_boost");
        assert!(select_strategy(StrategyHint::SyllableAccuracy, &tried).is_none());
    }

    #[test]
    fn confidence_hint_walks_priority_order() {
        let mut tried = HashSet::new();
        let names: Vec<&str> = std::iter::from_fn(|| {
            let strategy = select_strategy(StrategyHint::Confidence, &tried)?;
            tried.insert(strategy.name);
            Some(strategy.name)
        })
        .collect();
        assert_eq!(
            names,
            vec![
                "whisper_large_precision",
                "enhanced_denoise",
                "multi_engine_consensus"
            ]
        );
    }

    #[test]
    fn duration_hint_maps_to_prosody() {
        let tried = HashSet::new();
        let strategy = select_strategy(StrategyHint::DurationAlignment, &tried).unwrap();
        assert_eq!(strategy.name, "prosody_normalization");
        assert!(strategy.audio.extra_compression);
    }

    #[test]
    fn catalog_names_are_unique() {
        let mut names: Vec<&str> = CATALOG.iter().map(|s| s.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), CATALOG.len());
    }

    #[test]
    fn denoise_beta_stays_in_supported_range() {
        let strategy = CATALOG.iter().find(|s| s.name == "enhanced_denoise").unwrap();
        let beta = strategy.audio.noise_beta.unwrap();
        assert!((1.5..=2.5).contains(&beta));
    }
}
