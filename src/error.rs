//! Comprehensive error types for the HanTone pipeline operations.
//!
//! This module defines the `HanToneError` enum covering all error conditions
//! that can occur during audio normalization, feature extraction, speech
//! recognition, quality validation, and general command execution.
//!
//! It also provides helper methods to construct errors and generate
//! user-friendly messages.
use thiserror::Error;

/// Represents all possible errors in the HanTone pipeline.
///
/// Each variant provides specific context to facilitate debugging and
/// user-friendly reporting.
///
/// # Examples
///
/// ```rust
/// use hantone::error::{HanToneError, HanToneResult};
///
/// fn example() -> HanToneResult<()> {
///     Err(HanToneError::audio_processing("clipped input"))
/// }
/// ```
///
/// # Exit Codes
///
/// Each error variant maps to an exit code via `HanToneError::exit_code`.
#[derive(Error, Debug)]
pub enum HanToneError {
    /// I/O operation failed during file system access.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error due to invalid or missing settings.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error
        message: String,
    },

    /// The input audio is in a format the normalizer cannot convert.
    #[error("Unsupported audio format: {message}")]
    InputFormat {
        /// Detailed description of the format problem
        message: String,
    },

    /// The input audio contains no signal at all.
    #[error("Audio contains only silence")]
    AllSilence,

    /// A character outside the Hangul syllable block was handed to the
    /// codec.
    #[error("Not a Hangul syllable: U+{codepoint:04X}")]
    NotHangul {
        /// The offending codepoint
        codepoint: u32,
    },

    /// Audio processing error during analysis or format conversion.
    #[error("Audio processing error: {message}")]
    AudioProcessing {
        /// Description of the audio processing error
        message: String,
    },

    /// Feature extraction (pitch, formant, intensity) failed.
    ///
    /// Recoverable: callers degrade to empty contours and carry a warning.
    #[error("Feature extraction failed in {component}: {message}")]
    FeatureExtraction {
        /// Analyzer that failed (e.g. "pitch", "formant")
        component: String,
        /// Description of the failure
        message: String,
    },

    /// A single recognizer adapter failed.
    #[error("Recognizer '{engine_id}' failed: {source}")]
    Recognizer {
        /// Identifier of the failed engine
        engine_id: String,
        /// Underlying recognizer error
        #[source]
        source: crate::services::stt::RecognizeError,
    },

    /// Every registered recognizer failed; nothing usable was produced.
    #[error("All recognition engines failed ({} engines)", .failures.len())]
    AllEnginesFailed {
        /// Per-engine error descriptions, in registration order
        failures: Vec<(String, String)>,
    },

    /// Pipeline cancellation was requested by the caller.
    #[error("Processing cancelled")]
    CancelRequested,

    /// TextGrid serialization or parsing error.
    #[error("TextGrid error: {message}")]
    TextGrid {
        /// Description of the TextGrid problem
        message: String,
    },

    /// Result cache read/write error.
    #[error("Cache error: {message}")]
    Cache {
        /// Description of the cache problem
        message: String,
    },

    /// JSON serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Catch-all for internal invariant violations.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl HanToneError {
    /// Create a configuration error with the given message.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an input-format error with the given message.
    pub fn input_format<S: Into<String>>(message: S) -> Self {
        Self::InputFormat {
            message: message.into(),
        }
    }

    /// Create an audio processing error with the given message.
    pub fn audio_processing<S: Into<String>>(message: S) -> Self {
        Self::AudioProcessing {
            message: message.into(),
        }
    }

    /// Create a feature-extraction error for the given analyzer.
    pub fn feature_extraction<S: Into<String>, M: Into<String>>(component: S, message: M) -> Self {
        Self::FeatureExtraction {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a TextGrid error with the given message.
    pub fn textgrid<S: Into<String>>(message: S) -> Self {
        Self::TextGrid {
            message: message.into(),
        }
    }

    /// Create a cache error with the given message.
    pub fn cache<S: Into<String>>(message: S) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    /// Whether this error is fatal for a pipeline invocation.
    ///
    /// Non-fatal conditions are reported as warnings inside a
    /// [`PipelineResult`](crate::core::pipeline::PipelineResult) instead of
    /// crossing the pipeline boundary as `Err`.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::InputFormat { .. }
                | Self::AllSilence
                | Self::AllEnginesFailed { .. }
                | Self::CancelRequested
        )
    }

    /// Generate a user-friendly message suitable for terminal display.
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config { message } => {
                format!("Configuration problem: {message}\nCheck `hantone config show`.")
            }
            Self::InputFormat { message } => {
                format!("The input audio cannot be processed: {message}")
            }
            Self::AllSilence => {
                "The input audio contains only silence. Record again and retry.".to_string()
            }
            Self::AllEnginesFailed { failures } => {
                let mut msg = String::from("Speech recognition failed on every engine:\n");
                for (engine, err) in failures {
                    msg.push_str(&format!("  - {engine}: {err}\n"));
                }
                msg
            }
            Self::CancelRequested => "Processing was cancelled.".to_string(),
            other => other.to_string(),
        }
    }

    /// Map this error to a process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 2,
            Self::Config { .. } => 3,
            Self::InputFormat { .. } | Self::AllSilence | Self::NotHangul { .. } => 4,
            Self::AudioProcessing { .. } | Self::FeatureExtraction { .. } => 5,
            Self::Recognizer { .. } | Self::AllEnginesFailed { .. } => 6,
            Self::TextGrid { .. } => 7,
            Self::Cache { .. } | Self::Serialization(_) => 8,
            Self::CancelRequested => 130,
            Self::Internal(_) => 1,
        }
    }
}

/// Convenient result alias used throughout the crate.
pub type HanToneResult<T> = std::result::Result<T, HanToneError>;
