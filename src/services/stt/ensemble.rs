//! Ensemble STT coordination: parallel fan-out over registered recognizers,
//! Korean-specific confidence scoring, and consensus-based selection.
//!
//! The coordinator never fails while at least one engine produced usable
//! text; only a full wipe-out surfaces as [`HanToneError::AllEnginesFailed`].

use super::{RecognizeError, RecognizeOptions, Recognizer, TranscriptionResult};
use crate::core::quality::korean_text_quality;
use crate::core::similarity::consensus_similarity;
use crate::services::audio::AudioBuffer;
use crate::{Result, error::HanToneError};
use futures::future::join_all;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::time::timeout;

/// Hard cap on concurrently running recognizer calls.
const MAX_CONCURRENT_ADAPTERS: usize = 8;
/// Weight of the per-engine base reliability in the score.
const WEIGHT_BASE: f32 = 0.4;
/// Weight of the engine-reported confidence.
const WEIGHT_RAW: f32 = 0.3;
/// Weight of the Korean text-quality factor.
const WEIGHT_KOREAN: f32 = 0.2;
/// Weight of the timestamp-completeness factor.
const WEIGHT_TIMESTAMPS: f32 = 0.1;
/// Timestamp factor when word timings are present / absent.
const TIMESTAMP_FACTOR_PRESENT: f32 = 0.9;
const TIMESTAMP_FACTOR_ABSENT: f32 = 0.6;
/// Raw-confidence stand-in for engines that expose none.
const UNKNOWN_CONFIDENCE_ESTIMATE: f32 = 0.5;
/// Texts at least this similar land in the same consensus group.
const CONSENSUS_SIMILARITY: f32 = 0.8;
/// Penalty applied when neither the confidence rule nor consensus decided.
const NO_CONSENSUS_PENALTY: f32 = 0.8;

/// Summary of a single engine's contribution to the ensemble.
///
/// Invariant: `error.is_some()` exactly when `text` is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineResult {
    pub engine_id: String,
    pub text: String,
    /// Engine-reported confidence; `None` when the engine exposes none
    pub raw_confidence: Option<f32>,
    /// Korean-weighted ensemble score in `[0, 1]`
    pub score: f32,
    pub processing_time_ms: u64,
    /// Whether word-level timestamps were returned
    pub has_word_timestamps: bool,
    pub error: Option<RecognizeError>,
}

/// Outcome of one ensemble invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleResult {
    /// The winning transcript; always one produced by a successful engine
    pub transcript: TranscriptionResult,
    /// Combined confidence over successful engines
    pub confidence: f32,
    /// Identifier of the winning engine
    pub selected_engine: String,
    /// Share of successful engines that agreed with the winner
    pub consensus_score: f32,
    /// Per-engine breakdown, in registration order
    pub engines: Vec<EngineResult>,
}

/// Runs every registered recognizer in parallel and selects a winner.
pub struct EnsembleCoordinator {
    engines: Vec<Arc<dyn Recognizer>>,
    confidence_threshold: f32,
    consensus_threshold: usize,
}

impl EnsembleCoordinator {
    /// Create a coordinator over `engines`, in registration order.
    pub fn new(
        engines: Vec<Arc<dyn Recognizer>>,
        confidence_threshold: f32,
        consensus_threshold: usize,
    ) -> Self {
        Self {
            engines,
            confidence_threshold,
            consensus_threshold: consensus_threshold.max(2),
        }
    }

    /// Number of registered engines.
    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Fan out to every engine and select a winner.
    ///
    /// When `require_consensus` is set (the strengthened-consensus
    /// re-processing strategy), the high-confidence shortcut is skipped and
    /// a consensus group is required before any single result wins outright.
    ///
    /// # Errors
    ///
    /// [`HanToneError::AllEnginesFailed`] when no engine produced non-empty
    /// text, carrying each engine's error kind.
    pub async fn transcribe(
        &self,
        audio: &AudioBuffer,
        opts: &RecognizeOptions,
        require_consensus: bool,
    ) -> Result<EnsembleResult> {
        if self.engines.is_empty() {
            return Err(HanToneError::AllEnginesFailed { failures: vec![] });
        }
        debug!(
            "Ensemble fan-out: {} engines, deadline {:?}",
            self.engines.len(),
            opts.deadline
        );

        let raw_results = self.fan_out(audio, opts).await;
        let (engines, transcripts) = self.score_results(raw_results);
        self.select(engines, transcripts, require_consensus)
    }

    /// Run all engines in parallel under a shared deadline, preserving
    /// registration order in the output.
    async fn fan_out(
        &self,
        audio: &AudioBuffer,
        opts: &RecognizeOptions,
    ) -> Vec<(String, std::result::Result<TranscriptionResult, RecognizeError>, u64)> {
        let semaphore = Arc::new(Semaphore::new(
            self.engines.len().min(MAX_CONCURRENT_ADAPTERS),
        ));

        let mut handles = Vec::with_capacity(self.engines.len());
        for engine in &self.engines {
            let engine = Arc::clone(engine);
            let audio = audio.clone();
            let opts = opts.clone();
            let semaphore = Arc::clone(&semaphore);
            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let started = Instant::now();
                let outcome = match timeout(opts.deadline, engine.recognize(&audio, &opts)).await {
                    Ok(result) => result,
                    Err(_) => Err(RecognizeError::Timeout {
                        seconds: opts.deadline.as_secs(),
                    }),
                };
                let elapsed = started.elapsed().as_millis() as u64;
                (engine.id().to_string(), outcome, elapsed)
            }));
        }

        let joined = join_all(handles).await;
        self.engines
            .iter()
            .zip(joined)
            .map(|(engine, outcome)| match outcome {
                Ok(entry) => entry,
                Err(join_error) => {
                    warn!("Recognizer task for {} panicked: {join_error}", engine.id());
                    (
                        engine.id().to_string(),
                        Err(RecognizeError::Unavailable(format!(
                            "task failure: {join_error}"
                        ))),
                        0,
                    )
                }
            })
            .collect()
    }

    /// Apply the Korean-specific confidence formula to each outcome.
    fn score_results(
        &self,
        raw: Vec<(String, std::result::Result<TranscriptionResult, RecognizeError>, u64)>,
    ) -> (Vec<EngineResult>, Vec<Option<TranscriptionResult>>) {
        let mut engines = Vec::with_capacity(raw.len());
        let mut transcripts = Vec::with_capacity(raw.len());

        for (engine_id, outcome, elapsed_ms) in raw {
            match outcome {
                Ok(transcript) if !transcript.text.trim().is_empty() => {
                    let has_words = !transcript.words.is_empty();
                    let score = score_engine(
                        &engine_id,
                        transcript.confidence,
                        &transcript.text,
                        has_words,
                    );
                    debug!(
                        "Engine {engine_id}: '{}' score {:.3} ({elapsed_ms} ms)",
                        transcript.text, score
                    );
                    engines.push(EngineResult {
                        engine_id,
                        text: transcript.text.clone(),
                        raw_confidence: transcript.confidence,
                        score,
                        processing_time_ms: elapsed_ms,
                        has_word_timestamps: has_words,
                        error: None,
                    });
                    transcripts.push(Some(transcript));
                }
                Ok(_) => {
                    // Empty text counts as a failure; keep the invariant
                    // error.is_some() <=> text.is_empty().
                    engines.push(EngineResult {
                        engine_id,
                        text: String::new(),
                        raw_confidence: None,
                        score: 0.0,
                        processing_time_ms: elapsed_ms,
                        has_word_timestamps: false,
                        error: Some(RecognizeError::Malformed("empty transcript".into())),
                    });
                    transcripts.push(None);
                }
                Err(error) => {
                    warn!("Engine {engine_id} failed: {error}");
                    engines.push(EngineResult {
                        engine_id,
                        text: String::new(),
                        raw_confidence: None,
                        score: 0.0,
                        processing_time_ms: elapsed_ms,
                        has_word_timestamps: false,
                        error: Some(error),
                    });
                    transcripts.push(None);
                }
            }
        }
        (engines, transcripts)
    }

    /// Winner selection: high confidence, then consensus, then penalized
    /// best-effort.
    fn select(
        &self,
        engines: Vec<EngineResult>,
        transcripts: Vec<Option<TranscriptionResult>>,
        require_consensus: bool,
    ) -> Result<EnsembleResult> {
        let successful: Vec<usize> = engines
            .iter()
            .enumerate()
            .filter(|(_, e)| e.error.is_none())
            .map(|(i, _)| i)
            .collect();

        if successful.is_empty() {
            return Err(HanToneError::AllEnginesFailed {
                failures: engines
                    .iter()
                    .map(|e| {
                        (
                            e.engine_id.clone(),
                            e.error
                                .as_ref()
                                .map(|err| err.to_string())
                                .unwrap_or_else(|| "unknown".into()),
                        )
                    })
                    .collect(),
            });
        }

        let combined = combined_confidence(&engines, &successful);

        // Rule 1: any engine clears the confidence threshold outright.
        if !require_consensus {
            let best_high = successful
                .iter()
                .copied()
                .filter(|&i| engines[i].score >= self.confidence_threshold)
                .max_by(|&a, &b| {
                    engines[a]
                        .score
                        .partial_cmp(&engines[b].score)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
            if let Some(winner) = best_high {
                debug!(
                    "High-confidence selection: {} ({:.3})",
                    engines[winner].engine_id, engines[winner].score
                );
                return Ok(self.build_result(engines, transcripts, winner, combined, 1.0));
            }
        }

        // Rule 2: consensus groups over normalized similarity.
        if let Some((winner, group_size)) = self.find_consensus(&engines, &successful) {
            let consensus_score = group_size as f32 / successful.len() as f32;
            debug!(
                "Consensus selection: {} ({} of {} engines agree)",
                engines[winner].engine_id,
                group_size,
                successful.len()
            );
            return Ok(self.build_result(engines, transcripts, winner, combined, consensus_score));
        }

        // Rule 3: best single result, penalized for lack of agreement.
        let winner = *successful
            .iter()
            .max_by(|&&a, &&b| {
                engines[a]
                    .score
                    .partial_cmp(&engines[b].score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .expect("successful is non-empty");
        debug!(
            "Fallback selection: {} with penalty",
            engines[winner].engine_id
        );
        Ok(self.build_result(
            engines,
            transcripts,
            winner,
            combined * NO_CONSENSUS_PENALTY,
            0.5,
        ))
    }

    /// Cluster successful texts by pairwise similarity; return the
    /// highest-scoring member of the largest sufficient group.
    fn find_consensus(
        &self,
        engines: &[EngineResult],
        successful: &[usize],
    ) -> Option<(usize, usize)> {
        if successful.len() < self.consensus_threshold {
            return None;
        }

        // Greedy grouping keyed by the first member's text.
        let mut groups: Vec<Vec<usize>> = Vec::new();
        for &index in successful {
            let mut best_group: Option<(usize, f32)> = None;
            for (g, group) in groups.iter().enumerate() {
                let representative = &engines[group[0]].text;
                let similarity = consensus_similarity(&engines[index].text, representative);
                if similarity >= CONSENSUS_SIMILARITY
                    && best_group.is_none_or(|(_, s)| similarity > s)
                {
                    best_group = Some((g, similarity));
                }
            }
            match best_group {
                Some((g, _)) => groups[g].push(index),
                None => groups.push(vec![index]),
            }
        }

        let largest = groups
            .into_iter()
            .filter(|g| g.len() >= self.consensus_threshold)
            .max_by_key(|g| g.len())?;
        let group_size = largest.len();
        let winner = largest.into_iter().max_by(|&a, &b| {
            engines[a]
                .score
                .partial_cmp(&engines[b].score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })?;
        Some((winner, group_size))
    }

    fn build_result(
        &self,
        engines: Vec<EngineResult>,
        mut transcripts: Vec<Option<TranscriptionResult>>,
        winner: usize,
        confidence: f32,
        consensus_score: f32,
    ) -> EnsembleResult {
        let transcript = transcripts[winner]
            .take()
            .expect("winner index always refers to a successful engine");
        EnsembleResult {
            selected_engine: engines[winner].engine_id.clone(),
            transcript,
            confidence: confidence.clamp(0.0, 1.0),
            consensus_score,
            engines,
        }
    }
}

/// The Korean-weighted per-engine score.
pub fn score_engine(
    engine_id: &str,
    raw_confidence: Option<f32>,
    text: &str,
    has_word_timestamps: bool,
) -> f32 {
    let base = super::registry::engine_base_weight(engine_id);
    let raw = raw_confidence.unwrap_or(UNKNOWN_CONFIDENCE_ESTIMATE);
    let korean = korean_text_quality(text);
    let timestamps = if has_word_timestamps {
        TIMESTAMP_FACTOR_PRESENT
    } else {
        TIMESTAMP_FACTOR_ABSENT
    };
    (WEIGHT_BASE * base + WEIGHT_RAW * raw + WEIGHT_KOREAN * korean + WEIGHT_TIMESTAMPS * timestamps)
        .clamp(0.0, 1.0)
}

/// Weighted average of engine scores with weights `score^2`.
fn combined_confidence(engines: &[EngineResult], successful: &[usize]) -> f32 {
    let mut numerator = 0.0f32;
    let mut denominator = 0.0f32;
    for &i in successful {
        let score = engines[i].score;
        numerator += score * score * score;
        denominator += score * score;
    }
    if denominator <= 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}
