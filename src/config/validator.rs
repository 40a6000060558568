//! Configuration validation: per-section range and consistency checks.

use super::Config;
use crate::{Result, error::HanToneError};

/// Validate every configuration section.
///
/// # Errors
///
/// Returns [`HanToneError::Config`] naming the first offending field.
pub fn validate_config(config: &Config) -> Result<()> {
    validate_audio(config)?;
    validate_analysis(config)?;
    validate_stt(config)?;
    validate_quality(config)?;
    validate_cache(config)?;
    Ok(())
}

fn validate_audio(config: &Config) -> Result<()> {
    let audio = &config.audio;
    if audio.target_sample_rate < 8000 || audio.target_sample_rate > 48000 {
        return Err(HanToneError::config(format!(
            "audio.target_sample_rate must be within 8000..=48000, got {}",
            audio.target_sample_rate
        )));
    }
    if !(-60.0..=0.0).contains(&audio.target_dbfs) {
        return Err(HanToneError::config(format!(
            "audio.target_dbfs must be within -60.0..=0.0, got {}",
            audio.target_dbfs
        )));
    }
    if !(1.5..=2.5).contains(&audio.enhancement.noise_beta) {
        return Err(HanToneError::config(format!(
            "audio.enhancement.noise_beta must be within 1.5..=2.5, got {}",
            audio.enhancement.noise_beta
        )));
    }
    Ok(())
}

fn validate_analysis(config: &Config) -> Result<()> {
    let analysis = &config.analysis;
    if analysis.pitch_floor <= 0.0 || analysis.pitch_floor >= analysis.pitch_ceiling {
        return Err(HanToneError::config(format!(
            "analysis.pitch_floor ({}) must be positive and below pitch_ceiling ({})",
            analysis.pitch_floor, analysis.pitch_ceiling
        )));
    }
    if analysis.time_step < 0.001 || analysis.time_step > 0.1 {
        return Err(HanToneError::config(format!(
            "analysis.time_step must be within 0.001..=0.1 seconds, got {}",
            analysis.time_step
        )));
    }
    if analysis.max_formants == 0 || analysis.max_formants > 6 {
        return Err(HanToneError::config(format!(
            "analysis.max_formants must be within 1..=6, got {}",
            analysis.max_formants
        )));
    }
    if !(0.0..1.0).contains(&analysis.voicing_threshold) {
        return Err(HanToneError::config(format!(
            "analysis.voicing_threshold must be within 0.0..1.0, got {}",
            analysis.voicing_threshold
        )));
    }
    Ok(())
}

fn validate_stt(config: &Config) -> Result<()> {
    let stt = &config.stt;
    if stt.primary.trim().is_empty() {
        return Err(HanToneError::config("stt.primary must not be empty"));
    }
    if stt.consensus_threshold < 2 {
        return Err(HanToneError::config(format!(
            "stt.consensus_threshold must be at least 2, got {}",
            stt.consensus_threshold
        )));
    }
    if !(0.0..=1.0).contains(&stt.confidence_threshold) {
        return Err(HanToneError::config(format!(
            "stt.confidence_threshold must be within 0.0..=1.0, got {}",
            stt.confidence_threshold
        )));
    }
    if stt.timeout_seconds == 0 {
        return Err(HanToneError::config("stt.timeout_seconds must be positive"));
    }
    if stt.language.trim().is_empty() {
        return Err(HanToneError::config("stt.language must not be empty"));
    }
    Ok(())
}

fn validate_quality(config: &Config) -> Result<()> {
    let quality = &config.quality;
    if !(0.0..=1.0).contains(&quality.quality_threshold) {
        return Err(HanToneError::config(format!(
            "quality.quality_threshold must be within 0.0..=1.0, got {}",
            quality.quality_threshold
        )));
    }
    if quality.max_reprocess_attempts > 10 {
        return Err(HanToneError::config(format!(
            "quality.max_reprocess_attempts must be at most 10, got {}",
            quality.max_reprocess_attempts
        )));
    }
    Ok(())
}

fn validate_cache(config: &Config) -> Result<()> {
    if config.cache.max_entries == 0 {
        return Err(HanToneError::config("cache.max_entries must be positive"));
    }
    Ok(())
}
