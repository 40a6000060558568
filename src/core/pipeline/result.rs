//! Pipeline result and warning types.

use crate::core::quality::QualityMetrics;
use crate::core::segment::Syllable;
use crate::core::telemetry::PipelineTrace;
use crate::services::audio::{FormantAnalysis, IntensityContour, PitchAnalysis};
use crate::services::stt::{EngineResult, TranscriptionResult};
use serde::{Deserialize, Serialize};

/// Non-fatal conditions collected during a pipeline invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Validation never cleared the threshold; the best attempt is returned.
    QualityBelowThreshold {
        score: f32,
    },
    /// One recognizer failed; the ensemble continued without it.
    EngineFailed {
        engine_id: String,
        error_kind: String,
    },
    /// A feature analyzer produced an empty contour.
    FeatureExtraction {
        component: String,
    },
    /// The aligner truncated a syllable-count mismatch.
    SyllableCountMismatch {
        expected: usize,
        aligned: usize,
    },
    /// The input was too short for acoustic analysis.
    InputTooShort,
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::QualityBelowThreshold { score } => {
                write!(f, "quality stayed below threshold (best {score:.3})")
            }
            Warning::EngineFailed {
                engine_id,
                error_kind,
            } => write!(f, "engine {engine_id} failed ({error_kind})"),
            Warning::FeatureExtraction { component } => {
                write!(f, "{component} analysis returned no usable frames")
            }
            Warning::SyllableCountMismatch { expected, aligned } => write!(
                f,
                "syllable count mismatch: expected {expected}, aligned {aligned}"
            ),
            Warning::InputTooShort => write!(f, "input too short for acoustic analysis"),
        }
    }
}

/// Complete output of one pipeline invocation.
///
/// Every non-fatal path produces one of these; fatal conditions surface as
/// `Err` before a result exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// The accepted transcript text
    pub final_text: String,
    /// Combined recognition confidence
    pub confidence: f32,
    /// Syllable accuracy against the reference, when one was supplied
    pub achieved_accuracy: Option<f32>,
    /// Time-aligned syllable segmentation
    pub segments: Vec<Syllable>,
    /// Pitch contour and voice-quality measures
    pub pitch: PitchAnalysis,
    /// Formant track and vowel-space summary
    pub formants: FormantAnalysis,
    /// Intensity (RMS energy) contour of the processed audio
    pub intensity: IntensityContour,
    /// Output-over-input duration ratio after silence trimming; TextGrid
    /// imports rescale their timestamps by this
    pub time_ratio: f64,
    /// The winning transcript with word timestamps
    pub transcript: TranscriptionResult,
    /// Per-engine ensemble breakdown, registration order
    pub engines: Vec<EngineResult>,
    /// Quality metrics of the accepted attempt
    pub quality: QualityMetrics,
    /// Stage and strategy names in execution order
    pub stages_executed: Vec<String>,
    /// Number of re-processing attempts beyond the first
    pub reprocess_attempts: u32,
    /// Wall-clock duration of the invocation
    pub total_duration_ms: u64,
    /// Non-fatal conditions encountered on the way
    pub warnings: Vec<Warning>,
    /// Structured stage telemetry
    pub trace: Option<PipelineTrace>,
}

impl Default for PipelineResult {
    fn default() -> Self {
        Self {
            final_text: String::new(),
            confidence: 0.0,
            achieved_accuracy: None,
            segments: Vec::new(),
            pitch: PitchAnalysis::empty(0.01),
            formants: FormantAnalysis::default(),
            intensity: IntensityContour {
                time_step: 0.01,
                values: Vec::new(),
            },
            time_ratio: 1.0,
            transcript: TranscriptionResult::empty("none", "ko"),
            engines: Vec::new(),
            quality: QualityMetrics::default(),
            stages_executed: Vec::new(),
            reprocess_attempts: 0,
            total_duration_ms: 0,
            warnings: Vec::new(),
            trace: None,
        }
    }
}

impl PipelineResult {
    /// Whether any warning of the given discriminant is present.
    pub fn has_quality_warning(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, Warning::QualityBelowThreshold { .. }))
    }
}
