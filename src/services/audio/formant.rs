//! Formant analysis via Burg LPC.
//!
//! Per 25 ms frame at a 10 ms step: pre-emphasis from 50 Hz, Gaussian-like
//! windowing, a Burg-method LPC fit, and formant candidates from the roots
//! of the prediction polynomial. The vowel-space area is the convex-hull
//! area over (F1, F2).

use super::{AudioBuffer, dsp};
use crate::config::AnalysisConfig;
use log::debug;
use serde::{Deserialize, Serialize};

/// Analysis window length in seconds.
const WINDOW_SECONDS: f64 = 0.025;
/// Pre-emphasis reference frequency in Hz.
const PRE_EMPHASIS_FROM_HZ: f32 = 50.0;
/// Formant candidates with a wider bandwidth are rejected.
const MAX_BANDWIDTH_HZ: f32 = 400.0;
/// Candidates below this frequency are LPC artifacts, not formants.
const MIN_FORMANT_HZ: f32 = 90.0;
/// Frames quieter than this RMS are skipped entirely.
const FRAME_ENERGY_FLOOR: f32 = 0.01;

/// Formant frequencies of one frame. `f4` is absent when fewer than four
/// candidates survive bandwidth rejection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FormantPoint {
    /// Frame time in seconds
    pub time: f64,
    pub f1: f32,
    pub f2: f32,
    pub f3: f32,
    pub f4: Option<f32>,
}

/// Formant track plus the vowel-space summary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormantAnalysis {
    /// Frames where at least F1–F3 were found, in time order
    pub points: Vec<FormantPoint>,
    /// Convex-hull area over (F1, F2), in Hz²
    pub vowel_space_area: f32,
}

/// Burg-LPC formant analyzer.
pub struct FormantAnalyzer {
    max_formants: usize,
    max_frequency: f32,
    time_step: f64,
}

impl FormantAnalyzer {
    /// Create an analyzer from the analysis configuration section.
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            max_formants: config.max_formants,
            max_frequency: config.max_formant_frequency,
            time_step: config.time_step,
        }
    }

    /// Analyze a buffer. Never fails: inputs shorter than one window
    /// produce an empty track.
    pub fn analyze(&self, audio: &AudioBuffer) -> FormantAnalysis {
        let mono = audio.to_mono();
        let sr = mono.sample_rate() as f32;
        let samples = pre_emphasize_from(mono.samples(), sr, PRE_EMPHASIS_FROM_HZ);

        let window = (WINDOW_SECONDS * sr as f64) as usize;
        let hop = ((self.time_step * sr as f64) as usize).max(1);
        if window == 0 || samples.len() < window {
            return FormantAnalysis::default();
        }

        let order = 2 * self.max_formants + 2;
        let taper = dsp::hann_window(window);
        let frame_count = (samples.len() - window) / hop + 1;

        let mut points = Vec::new();
        for f in 0..frame_count {
            let offset = f * hop;
            let frame: Vec<f32> = samples[offset..offset + window]
                .iter()
                .zip(&taper)
                .map(|(&s, &w)| s * w)
                .collect();
            if dsp::rms(&frame) < FRAME_ENERGY_FLOOR {
                continue;
            }

            let Some(lpc) = burg(&frame, order) else {
                continue;
            };
            let mut formants = formants_from_lpc(&lpc, sr, self.max_frequency);
            formants.truncate(self.max_formants);
            if formants.len() >= 3 {
                points.push(FormantPoint {
                    time: offset as f64 / sr as f64,
                    f1: formants[0],
                    f2: formants[1],
                    f3: formants[2],
                    f4: formants.get(3).copied(),
                });
            }
        }

        let vowel_space_area = convex_hull_area(
            &points
                .iter()
                .map(|p| (p.f1 as f64, p.f2 as f64))
                .collect::<Vec<_>>(),
        ) as f32;
        debug!(
            "Formant analysis: {} frames, vowel space {:.0} Hz^2",
            points.len(),
            vowel_space_area
        );

        FormantAnalysis {
            points,
            vowel_space_area,
        }
    }
}

/// Pre-emphasis with the coefficient tied to a reference frequency:
/// `alpha = exp(-2*pi*f_ref / sr)`.
fn pre_emphasize_from(samples: &[f32], sr: f32, from_hz: f32) -> Vec<f32> {
    let alpha = (-2.0 * std::f32::consts::PI * from_hz / sr).exp();
    let mut output = Vec::with_capacity(samples.len());
    let mut previous = 0.0f32;
    for &s in samples {
        output.push(s - alpha * previous);
        previous = s;
    }
    output
}

/// Burg's method for LPC coefficients of the given order.
///
/// Returns the prediction polynomial `a[0..=order]` with `a[0] == 1`, or
/// `None` for degenerate frames.
fn burg(frame: &[f32], order: usize) -> Option<Vec<f64>> {
    let n = frame.len();
    if n <= order + 1 {
        return None;
    }

    let mut f: Vec<f64> = frame.iter().map(|&s| s as f64).collect();
    let mut b = f.clone();
    let mut a = vec![0.0f64; order + 1];
    a[0] = 1.0;
    let mut dk: f64 = f.iter().map(|&x| 2.0 * x * x).sum::<f64>() - f[0] * f[0] - b[n - 1] * b[n - 1];
    if dk <= 0.0 {
        return None;
    }

    for k in 0..order {
        let mut numerator = 0.0f64;
        for i in 0..n - k - 1 {
            numerator += f[i + k + 1] * b[i];
        }
        let mu = -2.0 * numerator / dk;
        if !mu.is_finite() {
            return None;
        }

        // Update the polynomial with the new reflection coefficient.
        for i in 0..=(k + 1) / 2 {
            let t1 = a[i] + mu * a[k + 1 - i];
            let t2 = a[k + 1 - i] + mu * a[i];
            a[i] = t1;
            a[k + 1 - i] = t2;
        }

        // Update forward and backward prediction errors.
        for i in 0..n - k - 1 {
            let t1 = f[i + k + 1] + mu * b[i];
            let t2 = b[i] + mu * f[i + k + 1];
            f[i + k + 1] = t1;
            b[i] = t2;
        }

        dk = (1.0 - mu * mu) * dk - f[k + 1] * f[k + 1] - b[n - k - 2] * b[n - k - 2];
        if dk <= 0.0 {
            return None;
        }
    }
    Some(a)
}

/// Formant frequencies from the roots of the LPC polynomial, ascending,
/// bandwidth-filtered.
fn formants_from_lpc(lpc: &[f64], sr: f32, max_frequency: f32) -> Vec<f32> {
    let roots = polynomial_roots(lpc);
    let nyquist = sr as f64 / 2.0;
    let mut formants: Vec<(f32, f32)> = Vec::new();

    for root in roots {
        if root.im <= 0.0 {
            continue; // keep one of each conjugate pair
        }
        let radius = (root.re * root.re + root.im * root.im).sqrt();
        if radius <= 0.0 || radius >= 1.0 {
            continue;
        }
        let angle = root.im.atan2(root.re);
        let frequency = (angle * sr as f64 / (2.0 * std::f64::consts::PI)) as f32;
        let bandwidth = (-(sr as f64 / std::f64::consts::PI) * radius.ln()) as f32;
        if frequency > MIN_FORMANT_HZ
            && (frequency as f64) < nyquist
            && frequency < max_frequency
            && bandwidth < MAX_BANDWIDTH_HZ
        {
            formants.push((frequency, bandwidth));
        }
    }
    formants.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    formants.into_iter().map(|(f, _)| f).collect()
}

#[derive(Debug, Clone, Copy)]
struct ComplexRoot {
    re: f64,
    im: f64,
}

/// Durand-Kerner root finder for the reversed LPC polynomial.
///
/// The polynomial arrives as `a[0] + a[1] z^-1 + ...`; roots are found for
/// `z^order + a[1] z^(order-1) + ... + a[order]`.
fn polynomial_roots(coefficients: &[f64]) -> Vec<ComplexRoot> {
    let order = coefficients.len() - 1;
    if order == 0 {
        return Vec::new();
    }

    // Initial guesses spread on a spiral inside the unit circle.
    let mut roots: Vec<(f64, f64)> = (0..order)
        .map(|i| {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / order as f64 + 0.4;
            (0.9 * angle.cos(), 0.9 * angle.sin())
        })
        .collect();

    let eval = |re: f64, im: f64| -> (f64, f64) {
        // Horner evaluation of sum a[k] * z^(order-k).
        let (mut vr, mut vi) = (coefficients[0], 0.0);
        for &c in &coefficients[1..] {
            let nr = vr * re - vi * im + c;
            let ni = vr * im + vi * re;
            vr = nr;
            vi = ni;
        }
        (vr, vi)
    };

    for _ in 0..100 {
        let mut max_delta = 0.0f64;
        for i in 0..order {
            let (zr, zi) = roots[i];
            let (pr, pi) = eval(zr, zi);

            // Denominator: product of (z_i - z_j) over j != i.
            let (mut dr, mut di) = (1.0f64, 0.0f64);
            for j in 0..order {
                if i == j {
                    continue;
                }
                let (qr, qi) = (zr - roots[j].0, zi - roots[j].1);
                let nr = dr * qr - di * qi;
                let ni = dr * qi + di * qr;
                dr = nr;
                di = ni;
            }
            let denom = dr * dr + di * di;
            if denom < 1e-18 {
                continue;
            }
            let cr = (pr * dr + pi * di) / denom;
            let ci = (pi * dr - pr * di) / denom;
            roots[i] = (zr - cr, zi - ci);
            max_delta = max_delta.max(cr.abs() + ci.abs());
        }
        if max_delta < 1e-10 {
            break;
        }
    }

    roots
        .into_iter()
        .map(|(re, im)| ComplexRoot { re, im })
        .collect()
}

/// Convex-hull area over 2D points (Andrew's monotone chain + shoelace).
fn convex_hull_area(points: &[(f64, f64)]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sorted: Vec<(f64, f64)> = points.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted.dedup();
    if sorted.len() < 3 {
        return 0.0;
    }

    let cross = |o: (f64, f64), a: (f64, f64), b: (f64, f64)| -> f64 {
        (a.0 - o.0) * (b.1 - o.1) - (a.1 - o.1) * (b.0 - o.0)
    };

    let mut hull: Vec<(f64, f64)> = Vec::with_capacity(sorted.len() * 2);
    for &p in &sorted {
        while hull.len() >= 2 && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(p);
    }
    let lower_len = hull.len() + 1;
    for &p in sorted.iter().rev() {
        while hull.len() >= lower_len && cross(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
        {
            hull.pop();
        }
        hull.push(p);
    }
    hull.pop();

    let mut area = 0.0;
    for i in 0..hull.len() {
        let (x1, y1) = hull[i];
        let (x2, y2) = hull[(i + 1) % hull.len()];
        area += x1 * y2 - x2 * y1;
    }
    area.abs() / 2.0
}
