//! Adaptive pipeline controller.
//!
//! Drives the `Preprocess -> Transcribe -> Segment -> Validate` loop, and on
//! a failed validation selects the best untried re-processing strategy for
//! the validator's hint, up to the configured attempt limit. Accepted
//! results are inserted into the result cache.

use super::result::{PipelineResult, Warning};
use super::strategy::{ReprocessingStrategy, select_strategy};
use crate::config::Config;
use crate::core::cache::{CacheKey, ResultCache};
use crate::core::quality::{QualityAssessment, QualityValidator};
use crate::core::segment::{BoundarySegmenter, Syllable, SyllableAligner};
use crate::core::telemetry::{StageOutcome, TelemetrySink};
use crate::core::hangul;
use crate::services::audio::{
    AudioBuffer, AudioEnhancer, AudioNormalizer, FormantAnalyzer, PitchAnalyzer,
    VoiceStartDetector, intensity_contour,
};
use crate::services::stt::{
    EnsembleCoordinator, EnsembleResult, RecognizeOptions, Recognizer,
};
use crate::{Result, error::HanToneError};
use log::{debug, info, warn};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Cooperative cancellation flag shared with the caller.
///
/// The controller checks it between stages; in-flight recognizer calls are
/// bounded by their own deadline and abandoned.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One pipeline invocation request.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Raw input audio
    pub audio: AudioBuffer,
    /// Expected transcript for pronunciation assessment, when known
    pub reference_text: Option<String>,
}

/// The adaptive pipeline controller.
pub struct PipelineController {
    config: Config,
    normalizer: AudioNormalizer,
    pitch_analyzer: PitchAnalyzer,
    formant_analyzer: FormantAnalyzer,
    boundary_segmenter: BoundarySegmenter,
    validator: QualityValidator,
    coordinator: EnsembleCoordinator,
    cache: Arc<ResultCache>,
    /// Bounds concurrent invocations; excess callers queue FIFO.
    job_gate: Arc<Semaphore>,
}

impl PipelineController {
    /// Build a controller over pre-constructed recognizer engines.
    pub fn new(config: Config, engines: Vec<Arc<dyn Recognizer>>, cache: Arc<ResultCache>) -> Self {
        let coordinator = EnsembleCoordinator::new(
            engines,
            config.stt.confidence_threshold,
            config.stt.consensus_threshold,
        );
        Self {
            normalizer: AudioNormalizer::new(&config.audio),
            pitch_analyzer: PitchAnalyzer::new(&config.analysis),
            formant_analyzer: FormantAnalyzer::new(&config.analysis),
            boundary_segmenter: BoundarySegmenter::new(&config.analysis),
            validator: QualityValidator::new(&config.quality),
            coordinator,
            cache,
            job_gate: Arc::new(Semaphore::new(config.general.max_concurrent_jobs.max(1))),
            config,
        }
    }

    /// Run the full pipeline for one request.
    ///
    /// Every non-fatal path returns a [`PipelineResult`] carrying warnings;
    /// fatal conditions (`InputFormat`, `AllSilence`, `AllEnginesFailed`,
    /// `CancelRequested`) surface as `Err`.
    pub async fn run(&self, request: &PipelineRequest, cancel: &CancelFlag) -> Result<PipelineResult> {
        let _job_permit = self
            .job_gate
            .acquire()
            .await
            .map_err(|_| HanToneError::Internal("job gate closed".into()))?;
        let started = Instant::now();
        let telemetry = TelemetrySink::new("pipeline");

        let cache_key = CacheKey::compute(&request.audio, &self.config.fingerprint());
        if self.config.cache.enabled {
            if let Some(mut cached) = self.cache.get(&cache_key).await {
                info!("Pipeline served from cache");
                cached.stages_executed.push("cache".to_string());
                return Ok(cached);
            }
        }

        let mut tried: HashSet<&'static str> = HashSet::new();
        let mut strategy: Option<&'static ReprocessingStrategy> = None;
        let mut best: Option<(PipelineResult, f32)> = None;
        let max_attempts = self.config.quality.max_reprocess_attempts;

        for attempt in 0..=max_attempts {
            if cancel.is_cancelled() {
                return Err(HanToneError::CancelRequested);
            }
            if let Some(active) = strategy {
                info!("Attempt {}: applying strategy {}", attempt + 1, active.name);
            }

            let mut outcome = self
                .run_attempt(request, strategy, attempt, &telemetry, cancel)
                .await?;

            let passed = outcome.assessment.passed;
            let score = outcome.assessment.metrics.overall;
            if let Some(active) = strategy {
                outcome.result.stages_executed.push(active.name.to_string());
            }
            outcome.result.reprocess_attempts = attempt;

            if passed {
                let mut result = outcome.result;
                result.total_duration_ms = started.elapsed().as_millis() as u64;
                result.trace = Some(telemetry.finish());
                if self.config.cache.enabled {
                    if let Err(e) = self.cache.insert(cache_key, result.clone()).await {
                        warn!("Result caching failed: {e}");
                    }
                }
                info!(
                    "Pipeline accepted after {} attempt(s), overall {:.3}",
                    attempt + 1,
                    score
                );
                return Ok(result);
            }

            debug!(
                "Attempt {} below threshold: {:.3} (hint {:?})",
                attempt + 1,
                score,
                outcome.assessment.hint
            );
            let hint = outcome.assessment.hint;
            if best.as_ref().is_none_or(|(_, s)| score > *s) {
                best = Some((outcome.result, score));
            }

            if attempt == max_attempts {
                break;
            }
            strategy = select_strategy(hint, &tried);
            match strategy {
                Some(next) => {
                    tried.insert(next.name);
                }
                None => {
                    debug!("No untried strategy targets {hint:?}, stopping");
                    break;
                }
            }
        }

        let (mut result, score) = best.expect("at least one attempt ran");
        result.warnings.push(Warning::QualityBelowThreshold { score });
        result.total_duration_ms = started.elapsed().as_millis() as u64;
        result.trace = Some(telemetry.finish());
        warn!("Pipeline exhausted attempts, returning best ({score:.3})");
        // Below-threshold results are deliberately not cached.
        Ok(result)
    }

    async fn run_attempt(
        &self,
        request: &PipelineRequest,
        strategy: Option<&ReprocessingStrategy>,
        attempt: u32,
        telemetry: &TelemetrySink,
        cancel: &CancelFlag,
    ) -> Result<AttemptOutcome> {
        let mut warnings = Vec::new();
        let mut stages = Vec::new();

        // -- Preprocess ------------------------------------------------
        let stage_start = Instant::now();
        let normalized = self.normalizer.normalize(&request.audio)?;
        let time_ratio = normalized.time_ratio;
        let enhanced = self.build_enhancer(strategy).enhance(&normalized.audio)?;
        telemetry.record(
            "preprocess",
            "normalizer+enhancer",
            stage_start.elapsed().as_millis() as u64,
            StageOutcome::Ok,
            vec![("attempt".into(), (attempt + 1).to_string())],
        );
        stages.push("preprocess".to_string());

        if cancel.is_cancelled() {
            return Err(HanToneError::CancelRequested);
        }

        // -- Features --------------------------------------------------
        let stage_start = Instant::now();
        let pitch = self.pitch_analyzer.analyze(&enhanced);
        let formants = self.formant_analyzer.analyze(&enhanced);
        let intensity = intensity_contour(&enhanced, self.config.analysis.time_step);
        let features_outcome = if pitch.contour.points.is_empty() {
            warnings.push(Warning::InputTooShort);
            StageOutcome::Degraded
        } else {
            StageOutcome::Ok
        };
        if pitch.contour.points.is_empty() {
            warnings.push(Warning::FeatureExtraction {
                component: "pitch".into(),
            });
        }
        telemetry.record(
            "features",
            "pitch+formant",
            stage_start.elapsed().as_millis() as u64,
            features_outcome,
            Vec::new(),
        );
        stages.push("features".to_string());

        if cancel.is_cancelled() {
            return Err(HanToneError::CancelRequested);
        }

        // -- Transcribe ------------------------------------------------
        let stage_start = Instant::now();
        let ensemble = self.transcribe(&enhanced, strategy).await?;
        for engine in &ensemble.engines {
            if let Some(error) = &engine.error {
                warnings.push(Warning::EngineFailed {
                    engine_id: engine.engine_id.clone(),
                    error_kind: error.kind().to_string(),
                });
            }
        }
        telemetry.record(
            "transcribe",
            "ensemble",
            stage_start.elapsed().as_millis() as u64,
            StageOutcome::Ok,
            vec![("selected".into(), ensemble.selected_engine.clone())],
        );
        stages.push("transcribe".to_string());

        // -- Segment ---------------------------------------------------
        let stage_start = Instant::now();
        let target_text = request
            .reference_text
            .clone()
            .unwrap_or_else(|| ensemble.transcript.text.clone());
        let segments = self.segment(&enhanced, &ensemble, &target_text, &mut warnings);
        telemetry.record(
            "segment",
            "aligner",
            stage_start.elapsed().as_millis() as u64,
            if segments.is_empty() {
                StageOutcome::Degraded
            } else {
                StageOutcome::Ok
            },
            vec![("syllables".into(), segments.len().to_string())],
        );
        stages.push("segment".to_string());

        // -- Validate --------------------------------------------------
        let stage_start = Instant::now();
        let assessment = self.validator.assess(
            &ensemble.transcript.text,
            &target_text,
            enhanced.duration_seconds(),
            ensemble.confidence,
        );
        telemetry.record(
            "validate",
            "quality",
            stage_start.elapsed().as_millis() as u64,
            if assessment.passed {
                StageOutcome::Ok
            } else {
                StageOutcome::Degraded
            },
            vec![(
                "overall".into(),
                format!("{:.3}", assessment.metrics.overall),
            )],
        );
        stages.push("validate".to_string());

        let achieved_accuracy = request
            .reference_text
            .as_ref()
            .map(|_| assessment.metrics.syllable_accuracy);

        let result = PipelineResult {
            final_text: ensemble.transcript.text.clone(),
            confidence: ensemble.confidence,
            achieved_accuracy,
            segments,
            pitch,
            formants,
            intensity,
            time_ratio,
            transcript: ensemble.transcript,
            engines: ensemble.engines,
            quality: assessment.metrics,
            stages_executed: stages,
            reprocess_attempts: attempt,
            total_duration_ms: 0,
            warnings,
            trace: None,
        };
        Ok(AttemptOutcome { result, assessment })
    }

    fn build_enhancer(&self, strategy: Option<&ReprocessingStrategy>) -> AudioEnhancer {
        let mut enhancement = self.config.audio.enhancement.clone();
        if let Some(strategy) = strategy {
            if let Some(beta) = strategy.audio.noise_beta {
                enhancement.noise_beta = beta;
                enhancement.noise_reduction = true;
            }
            if let Some(preset) = strategy.audio.eq_preset {
                enhancement.eq_preset = preset;
            }
            if strategy.audio.extra_compression {
                enhancement.compression = true;
            }
        }
        AudioEnhancer::new(enhancement)
    }

    async fn transcribe(
        &self,
        audio: &AudioBuffer,
        strategy: Option<&ReprocessingStrategy>,
    ) -> Result<EnsembleResult> {
        let mut opts = RecognizeOptions {
            language: self.config.stt.language.clone(),
            want_word_timestamps: true,
            deadline: Duration::from_secs(self.config.stt.timeout_seconds),
            ..RecognizeOptions::default()
        };
        let mut require_consensus = false;
        if let Some(strategy) = strategy {
            opts.temperature = strategy.stt.temperature;
            opts.beam_size = strategy.stt.beam_size;
            require_consensus = strategy.stt.require_consensus;
        }
        self.coordinator
            .transcribe(audio, &opts, require_consensus)
            .await
    }

    /// Syllable segmentation: aligner over word timestamps when available,
    /// boundary detection otherwise.
    fn segment(
        &self,
        audio: &AudioBuffer,
        ensemble: &EnsembleResult,
        target_text: &str,
        warnings: &mut Vec<Warning>,
    ) -> Vec<Syllable> {
        let labels = hangul::syllables(target_text);
        if labels.is_empty() {
            debug!("Target text has no Hangul syllables, skipping segmentation");
            return Vec::new();
        }

        let words = &ensemble.transcript.words;
        if words.is_empty() {
            debug!("No word timestamps, using boundary-detection segmenter");
            return self.boundary_segmenter.segment(audio, &labels);
        }

        let voice_start = VoiceStartDetector::detect(audio, words);
        let alignment = SyllableAligner::align(target_text, words, voice_start);
        if let Some(mismatch) = alignment.count_mismatch {
            warnings.push(Warning::SyllableCountMismatch {
                expected: mismatch.expected,
                aligned: mismatch.aligned,
            });
        }
        if alignment.syllables.is_empty() {
            debug!("Alignment produced nothing, falling back to boundary detection");
            return self.boundary_segmenter.segment(audio, &labels);
        }
        alignment.syllables
    }
}

struct AttemptOutcome {
    result: PipelineResult,
    assessment: QualityAssessment,
}
