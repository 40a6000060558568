//! Builder for test configurations.

use super::{Config, TestConfigService};
use crate::services::audio::EqPreset;
use std::path::PathBuf;

/// Fluent builder producing a [`TestConfigService`] for tests.
///
/// # Examples
///
/// ```rust
/// use hantone::config::TestConfigBuilder;
///
/// let service = TestConfigBuilder::new()
///     .with_quality_threshold(0.8)
///     .with_multi_engine(false)
///     .build_service();
/// ```
#[derive(Default)]
pub struct TestConfigBuilder {
    config: Config,
}

impl TestConfigBuilder {
    /// Start from the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the normalizer target sample rate.
    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.config.audio.target_sample_rate = sample_rate;
        self
    }

    /// Toggle all enhancement stages at once.
    pub fn with_enhancement(mut self, enabled: bool) -> Self {
        self.config.audio.enhancement.pre_emphasis = enabled;
        self.config.audio.enhancement.noise_reduction = enabled;
        self.config.audio.enhancement.compression = enabled;
        if !enabled {
            self.config.audio.enhancement.eq_preset = EqPreset::Flat;
        }
        self
    }

    /// Set the composite quality pass threshold.
    pub fn with_quality_threshold(mut self, threshold: f32) -> Self {
        self.config.quality.quality_threshold = threshold;
        self
    }

    /// Set the maximum re-processing attempts.
    pub fn with_max_reprocess_attempts(mut self, attempts: u32) -> Self {
        self.config.quality.max_reprocess_attempts = attempts;
        self
    }

    /// Enable or disable the multi-engine ensemble.
    pub fn with_multi_engine(mut self, enabled: bool) -> Self {
        self.config.stt.enable_multi_engine = enabled;
        self
    }

    /// Set the Whisper API key.
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.config.stt.whisper.api_key = Some(key.to_string());
        self
    }

    /// Set the Whisper API base URL (pointing at a mock server in tests).
    pub fn with_stt_base_url(mut self, url: &str) -> Self {
        self.config.stt.whisper.base_url = url.to_string();
        self
    }

    /// Set the cache persistence directory.
    pub fn with_cache_directory(mut self, directory: PathBuf) -> Self {
        self.config.cache.directory = Some(directory);
        self
    }

    /// Disable the result cache entirely.
    pub fn without_cache(mut self) -> Self {
        self.config.cache.enabled = false;
        self
    }

    /// Finish building, returning the raw configuration.
    pub fn build_config(self) -> Config {
        self.config
    }

    /// Finish building, returning a test service wrapping the configuration.
    pub fn build_service(self) -> TestConfigService {
        TestConfigService::new(self.config)
    }
}
