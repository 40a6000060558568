//! Engine registry: identifier-to-adapter construction and the Korean-tuned
//! base reliability weights used by the ensemble score.

use super::{RecognizeError, Recognizer, WhisperApiRecognizer};
use crate::config::SttConfig;
use crate::{Result, error::HanToneError};
use log::warn;
use std::sync::Arc;

/// Base reliability weight per engine, tuned for Korean speech.
///
/// Unknown identifiers get a conservative 0.5.
pub fn engine_base_weight(engine_id: &str) -> f32 {
    match engine_id {
        "whisper-large" => 1.0,
        "naver" => 0.95, // Korean-specialized
        "google" => 0.9,
        "azure" => 0.8,
        "whisper-base" => 0.7,
        _ => 0.5,
    }
}

/// Construct the recognizer adapter for `engine_id`.
///
/// Only the Whisper family ships as a production adapter; the remaining
/// identifiers are reserved for externally registered recognizers and fail
/// with `Unavailable` until one is plugged in.
pub fn create_recognizer(
    engine_id: &str,
    config: &SttConfig,
) -> std::result::Result<Arc<dyn Recognizer>, RecognizeError> {
    match engine_id {
        "whisper-large" => Ok(Arc::new(WhisperApiRecognizer::new(
            engine_id,
            &config.whisper.large_model,
            &config.whisper,
        )?)),
        "whisper-base" => Ok(Arc::new(WhisperApiRecognizer::new(
            engine_id,
            &config.whisper.base_model,
            &config.whisper,
        )?)),
        other => Err(RecognizeError::Unavailable(format!(
            "no adapter registered for engine '{other}'"
        ))),
    }
}

/// Build the engine list for the configured primary and fallbacks.
///
/// Engines that cannot be constructed are skipped with a warning; an empty
/// result is a configuration error.
pub fn build_engines(config: &SttConfig) -> Result<Vec<Arc<dyn Recognizer>>> {
    let mut ids: Vec<&str> = Vec::new();
    ids.push(config.primary.as_str());
    for fallback in &config.fallbacks {
        if !ids.contains(&fallback.as_str()) {
            ids.push(fallback.as_str());
        }
    }
    if !config.enable_multi_engine {
        ids.truncate(1);
    }

    let mut engines: Vec<Arc<dyn Recognizer>> = Vec::new();
    for id in ids {
        match create_recognizer(id, config) {
            Ok(engine) => engines.push(engine),
            Err(e) => warn!("Skipping engine '{id}': {e}"),
        }
    }
    if engines.is_empty() {
        return Err(HanToneError::config(
            "no usable STT engine; check stt.primary and credentials",
        ));
    }
    Ok(engines)
}
