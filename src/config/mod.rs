//! Configuration management module for HanTone.
//!
//! Provides the typed configuration tree, the [`ConfigService`] abstraction
//! with production and test implementations, and per-section validation.
//!
//! # Key Components
//!
//! - [`Config`] - Main configuration structure containing all settings
//! - [`ConfigService`] - Service interface for configuration management
//! - [`ProductionConfigService`] - Production implementation with file I/O
//! - [`TestConfigService`] - Test implementation with controlled behavior
//! - [`TestConfigBuilder`] - Builder pattern for test configurations
//!
//! # Examples
//!
//! ```rust
//! use hantone::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! assert_eq!(config.audio.target_sample_rate, 16000);
//! assert_eq!(config.stt.primary, "whisper-large");
//! let toml_str = toml::to_string(&config)?;
//! assert!(toml_str.contains("[stt]"));
//! # Ok(())
//! # }
//! ```

use crate::services::audio::EqPreset;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod builder;
pub mod service;
pub mod test_service;
pub mod validator;

pub use builder::TestConfigBuilder;
pub use service::{ConfigService, ProductionConfigService};
pub use test_service::TestConfigService;
pub use validator::validate_config;

// ============================================================================
// Configuration Type Definitions
// ============================================================================

/// Full application configuration for HanTone.
///
/// Aggregates the audio front-end, acoustic analysis, speech recognition,
/// quality gating, cache, and general runtime sections.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Audio normalization and enhancement settings.
    pub audio: AudioConfig,
    /// Pitch/formant/intensity analysis settings.
    pub analysis: AnalysisConfig,
    /// Speech recognition and ensemble settings.
    pub stt: SttConfig,
    /// Quality validation and re-processing settings.
    pub quality: QualityConfig,
    /// Result cache settings.
    pub cache: CacheConfig,
    /// General runtime options.
    pub general: GeneralConfig,
    /// Optional file path from which the configuration was loaded.
    /// Runtime-only: a scalar after the section tables would not be valid
    /// TOML, so it never serializes.
    #[serde(skip)]
    pub loaded_from: Option<PathBuf>,
}

impl Config {
    /// Stable fingerprint of everything that affects pipeline output, used
    /// as the config half of cache keys. The cache section itself is
    /// excluded so tuning the cache never invalidates it.
    pub fn fingerprint(&self) -> String {
        format!(
            "sr={};dbfs={};silence={};pre={};nr={};beta={};eq={:?};comp={};\
             floor={};ceil={};step={};formants={};maxf={};voicing={};\
             primary={};fallbacks={:?};multi={};consensus={};conf={};timeout={};lang={};\
             qthresh={};attempts={}",
            self.audio.target_sample_rate,
            self.audio.target_dbfs,
            self.audio.silence_threshold_db,
            self.audio.enhancement.pre_emphasis,
            self.audio.enhancement.noise_reduction,
            self.audio.enhancement.noise_beta,
            self.audio.enhancement.eq_preset,
            self.audio.enhancement.compression,
            self.analysis.pitch_floor,
            self.analysis.pitch_ceiling,
            self.analysis.time_step,
            self.analysis.max_formants,
            self.analysis.max_formant_frequency,
            self.analysis.voicing_threshold,
            self.stt.primary,
            self.stt.fallbacks,
            self.stt.enable_multi_engine,
            self.stt.consensus_threshold,
            self.stt.confidence_threshold,
            self.stt.timeout_seconds,
            self.stt.language,
            self.quality.quality_threshold,
            self.quality.max_reprocess_attempts,
        )
    }
}

/// Audio normalization and enhancement settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AudioConfig {
    /// Output sample rate of the normalizer in Hz.
    pub target_sample_rate: u32,
    /// Loudness normalization target in dBFS.
    pub target_dbfs: f32,
    /// Silence gate used for reporting, in dB.
    pub silence_threshold_db: f32,
    /// Enhancement stage toggles and parameters.
    pub enhancement: EnhancementConfig,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000,
            target_dbfs: -20.0,
            silence_threshold_db: -40.0,
            enhancement: EnhancementConfig::default(),
        }
    }
}

/// Enhancement stage configuration.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct EnhancementConfig {
    /// Apply pre-emphasis before spectral processing.
    pub pre_emphasis: bool,
    /// Apply spectral-subtraction noise reduction.
    pub noise_reduction: bool,
    /// Over-subtraction factor, valid range 1.5–2.5.
    pub noise_beta: f32,
    /// Equalizer preset.
    pub eq_preset: EqPreset,
    /// Apply soft-knee compression with peak normalization.
    pub compression: bool,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            pre_emphasis: true,
            noise_reduction: true,
            noise_beta: 2.0,
            eq_preset: EqPreset::KoreanSpeech,
            compression: true,
        }
    }
}

/// Acoustic analysis settings shared by the pitch, formant, and intensity
/// analyzers.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// F0 tracker floor in Hz.
    pub pitch_floor: f32,
    /// F0 tracker ceiling in Hz.
    pub pitch_ceiling: f32,
    /// Frame step across analyzers, in seconds.
    pub time_step: f64,
    /// Maximum number of formants to track.
    pub max_formants: usize,
    /// Upper frequency bound for formant candidates, in Hz.
    pub max_formant_frequency: f32,
    /// Autocorrelation peak height above which a frame counts as voiced.
    pub voicing_threshold: f32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            pitch_floor: 75.0,
            pitch_ceiling: 600.0,
            time_step: 0.01,
            max_formants: 4,
            max_formant_frequency: 5500.0,
            voicing_threshold: 0.45,
        }
    }
}

/// Speech recognition and ensemble settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SttConfig {
    /// Adapter id to prefer when not running the ensemble.
    pub primary: String,
    /// Ordered fallback adapter ids.
    pub fallbacks: Vec<String>,
    /// Run every engine in parallel vs the primary alone.
    pub enable_multi_engine: bool,
    /// Minimum engines required in a consensus group.
    pub consensus_threshold: usize,
    /// Per-engine acceptance threshold on the ensemble score.
    pub confidence_threshold: f32,
    /// Shared recognition deadline in seconds.
    pub timeout_seconds: u64,
    /// Recognition language code.
    pub language: String,
    /// Whisper adapter settings.
    pub whisper: WhisperEngineConfig,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            primary: "whisper-large".to_string(),
            fallbacks: vec!["whisper-base".to_string()],
            enable_multi_engine: true,
            consensus_threshold: 2,
            confidence_threshold: 0.85,
            timeout_seconds: 60,
            language: "ko".to_string(),
            whisper: WhisperEngineConfig::default(),
        }
    }
}

/// Whisper HTTP adapter settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WhisperEngineConfig {
    /// API key; also settable via `HANTONE_STT__WHISPER__API_KEY`.
    pub api_key: Option<String>,
    /// API base URL.
    pub base_url: String,
    /// Model name used by the `whisper-large` engine id.
    pub large_model: String,
    /// Model name used by the `whisper-base` engine id.
    pub base_model: String,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
    /// Retries on transient request failure.
    pub max_retries: u32,
    /// Delay between retries in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for WhisperEngineConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            large_model: "whisper-1".to_string(),
            base_model: "whisper-1".to_string(),
            // Set generously; word-timestamp transcription of long clips is
            // slow on cold endpoints.
            timeout_seconds: 120,
            max_retries: 2,
            retry_delay_ms: 1000,
        }
    }
}

/// Quality validation and adaptive re-processing settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct QualityConfig {
    /// Pass threshold for the composite quality score.
    pub quality_threshold: f32,
    /// Maximum re-processing attempts after a failed validation.
    pub max_reprocess_attempts: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            quality_threshold: 0.95,
            max_reprocess_attempts: 3,
        }
    }
}

/// Result cache settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    /// Whether accepted results are cached at all.
    pub enabled: bool,
    /// Entry time-to-live in seconds.
    pub ttl_seconds: u64,
    /// Hard cap on in-memory entries (LRU beyond it).
    pub max_entries: usize,
    /// Optional persistence directory; one file per entry.
    pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_seconds: 3600,
            max_entries: 256,
            directory: None,
        }
    }
}

/// General runtime options.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GeneralConfig {
    /// Maximum concurrent pipeline invocations.
    pub max_concurrent_jobs: usize,
    /// Enable progress bar display in the CLI.
    pub enable_progress_bar: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: num_cpus::get().min(4),
            enable_progress_bar: true,
        }
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================
