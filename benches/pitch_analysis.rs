//! Pitch extraction throughput over typical utterance lengths.

use criterion::{Criterion, criterion_group, criterion_main};
use hantone::config::AnalysisConfig;
use hantone::services::audio::{AudioBuffer, PitchAnalyzer};
use std::hint::black_box;

fn utterance(seconds: f64) -> AudioBuffer {
    let sr = 16000u32;
    let samples: Vec<f32> = (0..(sr as f64 * seconds) as usize)
        .map(|i| {
            let t = i as f32 / sr as f32;
            // Slowly gliding F0 around 180 Hz, speech-like amplitude.
            let f0 = 180.0 + 20.0 * (2.0 * std::f32::consts::PI * 0.8 * t).sin();
            (2.0 * std::f32::consts::PI * f0 * t).sin() * 0.4
        })
        .collect();
    AudioBuffer::mono(samples, sr).unwrap()
}

fn bench_pitch_analysis(c: &mut Criterion) {
    let analyzer = PitchAnalyzer::new(&AnalysisConfig::default());
    let mut group = c.benchmark_group("pitch_analysis");

    for seconds in [1.0, 3.0, 10.0] {
        let audio = utterance(seconds);
        group.bench_function(format!("{seconds}s"), |b| {
            b.iter(|| black_box(analyzer.analyze(black_box(&audio))))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pitch_analysis);
criterion_main!(benches);
