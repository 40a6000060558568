//! Speech-to-text service layer.
//!
//! Defines the [`Recognizer`] trait every STT backend implements, the common
//! transcription result types, and the error taxonomy adapters map their
//! native failures into. The ensemble coordinator consumes recognizers
//! exclusively through this interface; it never assumes an adapter is
//! re-entrant and gives each invocation exclusive access.

use crate::services::audio::AudioBuffer;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub mod ensemble;
pub mod registry;
pub mod retry;
pub mod whisper_api;

pub use ensemble::{EngineResult, EnsembleCoordinator, EnsembleResult};
pub use registry::{create_recognizer, engine_base_weight};
pub use whisper_api::WhisperApiRecognizer;

/// A word with its time span inside the utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordAlignment {
    /// The recognized word, spacing preserved as the engine produced it
    pub word: String,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Engine-reported word confidence, when exposed
    pub confidence: Option<f32>,
}

/// A sentence- or phrase-level segment of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentenceSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// Result of one recognizer invocation.
///
/// Invariants: `words` are sorted by start time and non-overlapping; `text`
/// is consistent with the concatenation of `words`. Engines that expose no
/// utterance confidence report `None` rather than a fabricated value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    pub text: String,
    pub language: String,
    /// Engine-reported confidence; `None` when the engine does not expose one
    pub confidence: Option<f32>,
    pub words: Vec<WordAlignment>,
    pub segments: Vec<SentenceSegment>,
    /// Identifier of the engine that produced this result
    pub engine_id: String,
}

impl TranscriptionResult {
    /// An empty transcript attributed to `engine_id`.
    pub fn empty(engine_id: &str, language: &str) -> Self {
        Self {
            text: String::new(),
            language: language.to_string(),
            confidence: None,
            words: Vec::new(),
            segments: Vec::new(),
            engine_id: engine_id.to_string(),
        }
    }
}

/// Options for a single recognition call.
#[derive(Debug, Clone)]
pub struct RecognizeOptions {
    /// BCP-47-ish language code, e.g. `ko`
    pub language: String,
    /// Whether word-level timestamps should be requested
    pub want_word_timestamps: bool,
    /// Optional priming prompt for engines that support one
    pub initial_prompt: Option<String>,
    /// Decoding temperature override
    pub temperature: Option<f32>,
    /// Beam width override for engines with beam search
    pub beam_size: Option<u32>,
    /// Hard deadline for the call
    pub deadline: Duration,
}

impl Default for RecognizeOptions {
    fn default() -> Self {
        Self {
            language: "ko".to_string(),
            want_word_timestamps: true,
            initial_prompt: None,
            temperature: None,
            beam_size: None,
            deadline: Duration::from_secs(60),
        }
    }
}

/// Common error taxonomy for recognizer adapters.
///
/// Adapters map their native failures onto these kinds so the coordinator
/// can treat engines uniformly.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum RecognizeError {
    /// The engine is not reachable or not configured.
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    /// The call exceeded its deadline.
    #[error("timed out after {seconds}s")]
    Timeout {
        /// Deadline that was exceeded
        seconds: u64,
    },
    /// Credentials were rejected.
    #[error("authentication failed: {0}")]
    AuthFailed(String),
    /// A retryable transport or server error.
    #[error("transient failure: {0}")]
    Transient(String),
    /// The engine returned a response we could not interpret.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl RecognizeError {
    /// Short machine-readable kind, used in telemetry and warnings.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Timeout { .. } => "timeout",
            Self::AuthFailed(_) => "auth_failed",
            Self::Transient(_) => "transient",
            Self::Malformed(_) => "malformed",
        }
    }

    /// Whether retrying the same adapter can plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout { .. })
    }
}

/// Pluggable speech recognizer.
///
/// Implementations must be `Send + Sync`; the coordinator still serializes
/// calls per adapter instance unless an adapter opts into concurrency by
/// being cheap to clone.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Stable engine identifier (e.g. `whisper-large`).
    fn id(&self) -> &str;

    /// Language codes this engine accepts (e.g. `["ko", "en"]`).
    fn language_codes(&self) -> &[&str];

    /// Transcribe `audio` under `opts`. The implementation should respect
    /// `opts.deadline`; the coordinator additionally enforces it from the
    /// outside.
    async fn recognize(
        &self,
        audio: &AudioBuffer,
        opts: &RecognizeOptions,
    ) -> Result<TranscriptionResult, RecognizeError>;
}
