//! Energy/pitch-change boundary detection, the fallback segmenter used when
//! a recognizer produced no word timestamps.
//!
//! Candidate boundaries come from two feature streams: local maxima of the
//! intensity first-difference above the 70th percentile, and frame-to-frame
//! pitch movement beyond one semitone. Candidates are merged, clamped to the
//! valid-speech span, and fitted to the target syllable count.

use super::Syllable;
use crate::config::AnalysisConfig;
use crate::services::audio::{AudioBuffer, IntensityContour, PitchAnalyzer, intensity_contour};
use log::{debug, warn};

/// Confidence assigned to boundary-derived syllables.
const BOUNDARY_CONFIDENCE: f32 = 0.6;
/// Percentile of intensity change that counts as a boundary candidate.
const ENERGY_PERCENTILE: f32 = 70.0;
/// Minimum semitone movement that counts as a pitch boundary.
const PITCH_SEMITONE_THRESHOLD: f32 = 1.0;
/// Fraction of the mean positive intensity used as the speech threshold.
const SPEECH_THRESHOLD_RATIO: f32 = 0.25;
/// Margin applied by the last-resort equal division, in seconds.
const FALLBACK_EDGE_MARGIN: f64 = 0.1;

/// Boundary-detection segmenter.
pub struct BoundarySegmenter {
    pitch_analyzer: PitchAnalyzer,
    time_step: f64,
}

impl BoundarySegmenter {
    /// Create a segmenter from the analysis configuration section.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            pitch_analyzer: PitchAnalyzer::new(config),
            time_step: config.time_step,
        }
    }

    /// Segment `audio` into one interval per label.
    ///
    /// Never fails: when feature extraction yields nothing usable the
    /// valid-speech span (or, failing that, the whole duration with small
    /// edge margins) is divided equally.
    pub fn segment(&self, audio: &AudioBuffer, labels: &[char]) -> Vec<Syllable> {
        if labels.is_empty() {
            return Vec::new();
        }
        let duration = audio.duration_seconds();

        let intensity = intensity_contour(audio, self.time_step);
        let Some((speech_start, speech_end)) = self.valid_speech_span(&intensity, duration) else {
            warn!("No speech span found, using equal division with edge margins");
            let start = FALLBACK_EDGE_MARGIN.min(duration / 4.0);
            let end = (duration - FALLBACK_EDGE_MARGIN).max(start + duration / 2.0);
            return equal_division(start, end.min(duration), labels);
        };
        debug!(
            "Valid speech span: {:.3}s ~ {:.3}s of {:.3}s",
            speech_start, speech_end, duration
        );

        let mut candidates = self.energy_boundaries(&intensity, speech_start, speech_end);
        candidates.extend(self.pitch_boundaries(audio, speech_start, speech_end));
        candidates.retain(|&t| t > speech_start && t < speech_end);
        candidates.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        candidates.dedup_by(|a, b| (*a - *b).abs() < 1e-6);

        let mut boundaries = Vec::with_capacity(candidates.len() + 2);
        boundaries.push(speech_start);
        boundaries.extend(candidates);
        boundaries.push(speech_end);

        let boundaries = fit_to_target(boundaries, labels.len());
        labels
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Syllable::new(c, boundaries[i], boundaries[i + 1], BOUNDARY_CONFIDENCE)
            })
            .collect()
    }

    /// First and last frame above the speech threshold, as times.
    fn valid_speech_span(
        &self,
        intensity: &IntensityContour,
        duration: f64,
    ) -> Option<(f64, f64)> {
        let mean = intensity.positive_mean()?;
        let threshold = mean * SPEECH_THRESHOLD_RATIO;
        let first = intensity.values.iter().position(|&v| v > threshold)?;
        let last = intensity.values.iter().rposition(|&v| v > threshold)?;
        if first >= last {
            return None;
        }
        let start = intensity.time_at(first);
        let end = (intensity.time_at(last + 1)).min(duration);
        (end - start > 0.0).then_some((start, end))
    }

    /// Local maxima of the absolute intensity first-difference above the
    /// 70th percentile.
    fn energy_boundaries(
        &self,
        intensity: &IntensityContour,
        start: f64,
        end: f64,
    ) -> Vec<f64> {
        let in_span: Vec<(usize, f32)> = intensity
            .values
            .iter()
            .enumerate()
            .filter(|(i, _)| {
                let t = intensity.time_at(*i);
                t >= start && t <= end
            })
            .map(|(i, &v)| (i, v))
            .collect();
        if in_span.len() < 10 {
            return Vec::new();
        }

        let diffs: Vec<f32> = in_span
            .windows(2)
            .map(|pair| (pair[1].1 - pair[0].1).abs())
            .collect();
        let threshold = crate::services::audio::dsp::percentile(&diffs, ENERGY_PERCENTILE);

        let mut boundaries = Vec::new();
        for i in 1..diffs.len() - 1 {
            if diffs[i] > threshold && diffs[i] > diffs[i - 1] && diffs[i] > diffs[i + 1] {
                boundaries.push(intensity.time_at(in_span[i].0));
            }
        }
        debug!("Energy boundaries: {}", boundaries.len());
        boundaries
    }

    /// Frames where the pitch moves more than one semitone
    /// (`12 * log2(f / 440) + 69`).
    fn pitch_boundaries(&self, audio: &AudioBuffer, start: f64, end: f64) -> Vec<f64> {
        let analysis = self.pitch_analyzer.analyze(audio);
        let voiced: Vec<(f64, f32)> = analysis
            .contour
            .points
            .iter()
            .filter(|p| p.frequency > 0.0 && p.time >= start && p.time <= end)
            .map(|p| (p.time, 12.0 * (p.frequency / 440.0).log2() + 69.0))
            .collect();
        if voiced.len() < 5 {
            return Vec::new();
        }

        let mut boundaries = Vec::new();
        for pair in voiced.windows(2) {
            if (pair[1].1 - pair[0].1).abs() > PITCH_SEMITONE_THRESHOLD {
                boundaries.push(pair[1].0);
            }
        }
        debug!("Pitch boundaries: {}", boundaries.len());
        boundaries
    }
}

/// Adjust a sorted boundary list to exactly `target + 1` entries.
///
/// Surplus boundaries are thinned to a uniformly spaced subset (keeping the
/// endpoints); missing boundaries are created by splitting the longest gap
/// at its midpoint.
fn fit_to_target(boundaries: Vec<f64>, target: usize) -> Vec<f64> {
    let needed = target + 1;
    let mut result = boundaries;

    if result.len() > needed {
        let interior = &result[1..result.len() - 1];
        let mut selected = Vec::with_capacity(needed);
        selected.push(result[0]);
        if needed > 2 {
            let step = interior.len() as f64 / (needed - 2) as f64;
            for i in 0..needed - 2 {
                let idx = (i as f64 * step) as usize;
                selected.push(interior[idx.min(interior.len() - 1)]);
            }
        }
        selected.push(result[result.len() - 1]);
        selected.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        selected.dedup_by(|a, b| (*a - *b).abs() < 1e-9);
        result = selected;
    }

    while result.len() < needed {
        let (mut widest, mut width) = (0usize, 0.0f64);
        for i in 0..result.len() - 1 {
            let gap = result[i + 1] - result[i];
            if gap > width {
                width = gap;
                widest = i;
            }
        }
        let midpoint = (result[widest] + result[widest + 1]) / 2.0;
        result.insert(widest + 1, midpoint);
    }

    // Deduplication above can undershoot; rebuild by equal division then.
    if result.len() != needed {
        return equal_boundaries(result[0], result[result.len() - 1], target);
    }
    result
}

fn equal_boundaries(start: f64, end: f64, target: usize) -> Vec<f64> {
    (0..=target)
        .map(|i| start + (end - start) * i as f64 / target as f64)
        .collect()
}

fn equal_division(start: f64, end: f64, labels: &[char]) -> Vec<Syllable> {
    let boundaries = equal_boundaries(start, end, labels.len());
    labels
        .iter()
        .enumerate()
        .map(|(i, &c)| Syllable::new(c, boundaries[i], boundaries[i + 1], BOUNDARY_CONFIDENCE))
        .collect()
}
