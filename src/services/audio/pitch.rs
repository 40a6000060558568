//! Pitch analysis: autocorrelation F0 tracking, voiced-frame statistics,
//! jitter/shimmer/HNR voice-quality measures, and a gender estimate.
//!
//! The tracker follows the classic autocorrelation formulation: per frame,
//! the normalized autocorrelation is searched inside the configured period
//! range and the peak height doubles as the voicing strength.

use super::{AudioBuffer, dsp};
use crate::config::AnalysisConfig;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// A single frame of the pitch contour. `frequency == 0` marks an unvoiced
/// frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PitchPoint {
    /// Frame time in seconds
    pub time: f64,
    /// Fundamental frequency in Hz, 0 when unvoiced
    pub frequency: f32,
    /// Voicing strength in `[0, 1]`
    pub strength: f32,
}

/// Ordered pitch contour at a fixed time step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PitchContour {
    /// Frame step in seconds
    pub time_step: f64,
    /// Frames in time order
    pub points: Vec<PitchPoint>,
}

impl PitchContour {
    /// Frequencies of voiced frames only.
    pub fn voiced_frequencies(&self) -> Vec<f32> {
        self.points
            .iter()
            .filter(|p| p.frequency > 0.0)
            .map(|p| p.frequency)
            .collect()
    }

    /// Fraction of frames that are voiced.
    pub fn voiced_ratio(&self) -> f32 {
        if self.points.is_empty() {
            return 0.0;
        }
        self.points.iter().filter(|p| p.frequency > 0.0).count() as f32
            / self.points.len() as f32
    }
}

/// Descriptive statistics over voiced frames.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PitchStatistics {
    pub mean: f32,
    pub median: f32,
    pub std_dev: f32,
    pub min: f32,
    pub max: f32,
    pub range: f32,
    pub q25: f32,
    pub q75: f32,
    pub iqr: f32,
}

/// Speaker gender estimate from mean voiced F0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Child,
    Unknown,
}

impl Gender {
    /// Threshold rule: `<140 Hz` male, `<200` female, `<300` child,
    /// `>=300` female.
    pub fn from_mean_f0(mean: f32) -> Gender {
        if mean < 140.0 {
            Gender::Male
        } else if mean < 200.0 {
            Gender::Female
        } else if mean < 300.0 {
            Gender::Child
        } else {
            Gender::Female
        }
    }
}

/// Complete pitch analysis output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PitchAnalysis {
    pub contour: PitchContour,
    /// `None` when no frame was voiced
    pub statistics: Option<PitchStatistics>,
    pub gender: Gender,
    /// Local jitter as a percentage of the mean period
    pub jitter_percent: f32,
    /// Local shimmer as a percentage of the mean amplitude
    pub shimmer_percent: f32,
    /// Mean harmonics-to-noise ratio over voiced frames, in dB
    pub hnr_db: f32,
}

impl PitchAnalysis {
    /// An empty analysis, returned when the input is too short to frame.
    pub fn empty(time_step: f64) -> Self {
        Self {
            contour: PitchContour {
                time_step,
                points: Vec::new(),
            },
            statistics: None,
            gender: Gender::Unknown,
            jitter_percent: 0.0,
            shimmer_percent: 0.0,
            hnr_db: 0.0,
        }
    }
}

/// Autocorrelation-based pitch analyzer.
pub struct PitchAnalyzer {
    floor_hz: f32,
    ceiling_hz: f32,
    time_step: f64,
    voicing_threshold: f32,
}

impl PitchAnalyzer {
    /// Create an analyzer from the analysis configuration section.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            floor_hz: config.pitch_floor,
            ceiling_hz: config.pitch_ceiling,
            time_step: config.time_step,
            voicing_threshold: config.voicing_threshold,
        }
    }

    /// Analyze a buffer. Never fails: inputs shorter than one analysis
    /// window produce an empty contour.
    pub fn analyze(&self, audio: &AudioBuffer) -> PitchAnalysis {
        let mono = audio.to_mono();
        let samples = mono.samples();
        let sr = mono.sample_rate() as f32;

        // Window must hold at least two periods of the pitch floor.
        let window = ((2.5 * sr / self.floor_hz) as usize).max(64);
        let hop = ((self.time_step * sr as f64) as usize).max(1);
        if samples.len() < window {
            warn!(
                "Input too short for pitch analysis: {} samples < window {}",
                samples.len(),
                window
            );
            return PitchAnalysis::empty(self.time_step);
        }

        let min_lag = (sr / self.ceiling_hz).floor() as usize;
        let max_lag = (sr / self.floor_hz).ceil() as usize;
        let frame_count = (samples.len() - window) / hop + 1;

        let mut points = Vec::with_capacity(frame_count);
        let mut frame_amplitudes = Vec::with_capacity(frame_count);
        for f in 0..frame_count {
            let offset = f * hop;
            let frame = &samples[offset..offset + window];
            let time = offset as f64 / sr as f64;
            let (frequency, strength) = self.track_frame(frame, sr, min_lag, max_lag);
            points.push(PitchPoint {
                time,
                frequency,
                strength,
            });
            frame_amplitudes.push(dsp::rms(frame));
        }

        let contour = PitchContour {
            time_step: self.time_step,
            points,
        };
        let voiced = contour.voiced_frequencies();
        debug!(
            "Pitch analysis: {} frames, {:.1}% voiced",
            contour.points.len(),
            contour.voiced_ratio() * 100.0
        );

        let statistics = statistics(&voiced);
        let gender = match &statistics {
            Some(stats) => Gender::from_mean_f0(stats.mean),
            None => Gender::Unknown,
        };
        let (jitter, shimmer) = perturbation(&contour, &frame_amplitudes);
        let hnr = mean_hnr(&contour);

        PitchAnalysis {
            contour,
            statistics,
            gender,
            jitter_percent: jitter,
            shimmer_percent: shimmer,
            hnr_db: hnr,
        }
    }

    /// Normalized autocorrelation peak search with parabolic refinement.
    fn track_frame(&self, frame: &[f32], sr: f32, min_lag: usize, max_lag: usize) -> (f32, f32) {
        let mean = frame.iter().sum::<f32>() / frame.len() as f32;
        let centered: Vec<f32> = frame.iter().map(|&s| s - mean).collect();
        let energy: f32 = centered.iter().map(|&s| s * s).sum();
        if energy < 1e-9 {
            return (0.0, 0.0);
        }

        let max_lag = max_lag.min(frame.len() - 1);
        let mut best_lag = 0usize;
        let mut best_r = 0.0f32;
        let mut correlations = vec![0.0f32; max_lag + 1];
        for lag in min_lag..=max_lag {
            let mut sum = 0.0f32;
            for i in 0..frame.len() - lag {
                sum += centered[i] * centered[i + lag];
            }
            let r = sum / energy;
            correlations[lag] = r;
            if r > best_r {
                best_r = r;
                best_lag = lag;
            }
        }

        if best_lag == 0 || best_r < self.voicing_threshold {
            return (0.0, best_r.clamp(0.0, 1.0));
        }

        // Parabolic interpolation around the peak for sub-sample period.
        let refined_lag = if best_lag > min_lag && best_lag < max_lag {
            let left = correlations[best_lag - 1];
            let right = correlations[best_lag + 1];
            let denom = left - 2.0 * best_r + right;
            if denom.abs() > 1e-9 {
                best_lag as f32 + 0.5 * (left - right) / denom
            } else {
                best_lag as f32
            }
        } else {
            best_lag as f32
        };

        let frequency = sr / refined_lag;
        if frequency < self.floor_hz || frequency > self.ceiling_hz {
            return (0.0, best_r.clamp(0.0, 1.0));
        }
        (frequency, best_r.clamp(0.0, 1.0))
    }
}

fn statistics(voiced: &[f32]) -> Option<PitchStatistics> {
    if voiced.is_empty() {
        return None;
    }
    let mean = voiced.iter().sum::<f32>() / voiced.len() as f32;
    let variance =
        voiced.iter().map(|&f| (f - mean) * (f - mean)).sum::<f32>() / voiced.len() as f32;
    let min = voiced.iter().cloned().fold(f32::INFINITY, f32::min);
    let max = voiced.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
    let q25 = dsp::percentile(voiced, 25.0);
    let q75 = dsp::percentile(voiced, 75.0);
    Some(PitchStatistics {
        mean,
        median: dsp::percentile(voiced, 50.0),
        std_dev: variance.sqrt(),
        min,
        max,
        range: max - min,
        q25,
        q75,
        iqr: q75 - q25,
    })
}

/// Jitter and shimmer from consecutive voiced frames: mean absolute
/// period-to-period (amplitude-to-amplitude) difference over the mean, as
/// percentages.
fn perturbation(contour: &PitchContour, amplitudes: &[f32]) -> (f32, f32) {
    let mut periods = Vec::new();
    let mut voiced_amplitudes = Vec::new();
    for (point, &amp) in contour.points.iter().zip(amplitudes) {
        if point.frequency > 0.0 {
            periods.push(1.0 / point.frequency);
            voiced_amplitudes.push(amp);
        }
    }
    (relative_perturbation(&periods), relative_perturbation(&voiced_amplitudes))
}

fn relative_perturbation(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    if mean <= 0.0 {
        return 0.0;
    }
    let diff_sum: f32 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
    let mean_diff = diff_sum / (values.len() - 1) as f32;
    mean_diff / mean * 100.0
}

/// Mean HNR across voiced frames from the autocorrelation peak height:
/// `10 * log10(r / (1 - r))`. Peaks are kept just below 1 so a clean
/// periodic signal reports a large finite ratio instead of dropping out.
fn mean_hnr(contour: &PitchContour) -> f32 {
    let values: Vec<f32> = contour
        .points
        .iter()
        .filter(|p| p.frequency > 0.0 && p.strength > 0.0)
        .map(|p| {
            let r = p.strength.min(0.9999);
            10.0 * (r / (1.0 - r)).log10()
        })
        .collect();
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f32>() / values.len() as f32
}
