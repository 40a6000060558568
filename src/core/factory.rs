//! Component factory for creating configured instances of core components.
//!
//! Centralizes construction with configuration injection, so individual
//! components never read global state.

use crate::config::{Config, ConfigService};
use crate::core::cache::ResultCache;
use crate::core::pipeline::PipelineController;
use crate::core::quality::QualityValidator;
use crate::core::segment::BoundarySegmenter;
use crate::services::audio::{AudioEnhancer, AudioNormalizer, FormantAnalyzer, PitchAnalyzer};
use crate::services::stt::{EnsembleCoordinator, Recognizer, registry};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;

/// Factory wiring configuration into components.
///
/// # Examples
///
/// ```rust
/// use hantone::config::TestConfigBuilder;
/// use hantone::core::ComponentFactory;
///
/// # fn main() -> hantone::Result<()> {
/// let service = TestConfigBuilder::new().build_service();
/// let factory = ComponentFactory::new(&service)?;
/// let _normalizer = factory.create_normalizer();
/// let _pitch = factory.create_pitch_analyzer();
/// # Ok(())
/// # }
/// ```
pub struct ComponentFactory {
    config: Config,
}

impl ComponentFactory {
    /// Create a factory from a configuration service.
    pub fn new(config_service: &dyn ConfigService) -> Result<Self> {
        Ok(Self {
            config: config_service.get_config()?,
        })
    }

    /// Create a factory from an already-loaded configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// The configuration this factory injects.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Audio normalizer (C2).
    pub fn create_normalizer(&self) -> AudioNormalizer {
        AudioNormalizer::new(&self.config.audio)
    }

    /// Audio enhancer (C3) with the configured stages.
    pub fn create_enhancer(&self) -> AudioEnhancer {
        AudioEnhancer::new(self.config.audio.enhancement.clone())
    }

    /// Pitch analyzer (C4).
    pub fn create_pitch_analyzer(&self) -> PitchAnalyzer {
        PitchAnalyzer::new(&self.config.analysis)
    }

    /// Formant analyzer (C5).
    pub fn create_formant_analyzer(&self) -> FormantAnalyzer {
        FormantAnalyzer::new(&self.config.analysis)
    }

    /// Boundary-detection segmenter (C9).
    pub fn create_boundary_segmenter(&self) -> BoundarySegmenter {
        BoundarySegmenter::new(&self.config.analysis)
    }

    /// Quality validator (C11).
    pub fn create_quality_validator(&self) -> QualityValidator {
        QualityValidator::new(&self.config.quality)
    }

    /// Result cache (C14) honoring the cache section.
    pub fn create_result_cache(&self) -> Arc<ResultCache> {
        Arc::new(ResultCache::new(
            Duration::from_secs(self.config.cache.ttl_seconds),
            self.config.cache.max_entries,
            self.config.cache.directory.clone(),
        ))
    }

    /// Recognizer engines for the configured primary and fallbacks.
    ///
    /// # Errors
    ///
    /// Fails when no configured engine can be constructed.
    pub fn create_engines(&self) -> Result<Vec<Arc<dyn Recognizer>>> {
        registry::build_engines(&self.config.stt)
    }

    /// Ensemble coordinator (C10) over the configured engines.
    pub fn create_ensemble(&self) -> Result<EnsembleCoordinator> {
        Ok(EnsembleCoordinator::new(
            self.create_engines()?,
            self.config.stt.confidence_threshold,
            self.config.stt.consensus_threshold,
        ))
    }

    /// The full adaptive pipeline controller (C12).
    pub fn create_pipeline(&self) -> Result<PipelineController> {
        let engines = self.create_engines()?;
        Ok(self.create_pipeline_with_engines(engines))
    }

    /// Pipeline controller over externally supplied engines; tests inject
    /// scripted recognizers through this.
    pub fn create_pipeline_with_engines(
        &self,
        engines: Vec<Arc<dyn Recognizer>>,
    ) -> PipelineController {
        PipelineController::new(self.config.clone(), engines, self.create_result_cache())
    }
}
