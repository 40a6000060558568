//! Shared helpers for integration tests: synthetic PCM generators and
//! scripted recognizer engines.

#![allow(dead_code)]

use async_trait::async_trait;
use hantone::services::audio::AudioBuffer;
use hantone::services::stt::{
    RecognizeError, RecognizeOptions, Recognizer, TranscriptionResult, WordAlignment,
};
use std::sync::{Arc, Mutex};

/// A steady sine tone.
pub fn tone(sr: u32, seconds: f64, freq: f32, amplitude: f32) -> AudioBuffer {
    let samples: Vec<f32> = (0..(sr as f64 * seconds) as usize)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin() * amplitude)
        .collect();
    AudioBuffer::mono(samples, sr).unwrap()
}

/// Leading silence followed by a tone.
pub fn silence_then_tone(sr: u32, silence_s: f64, tone_s: f64) -> AudioBuffer {
    let mut samples = vec![0.0f32; (sr as f64 * silence_s) as usize];
    samples.extend(
        (0..(sr as f64 * tone_s) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * 190.0 * i as f32 / sr as f32).sin() * 0.5),
    );
    AudioBuffer::mono(samples, sr).unwrap()
}

/// Voiced bursts separated by dips, a crude multi-syllable utterance.
pub fn burst_train(sr: u32, bursts: usize, burst_s: f64, gap_s: f64) -> AudioBuffer {
    let mut samples = vec![0.0f32; (sr as f64 * 0.1) as usize];
    for b in 0..bursts {
        let freq = 150.0 + 25.0 * b as f32;
        for i in 0..(sr as f64 * burst_s) as usize {
            samples.push((2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin() * 0.5);
        }
        samples.extend(vec![0.0f32; (sr as f64 * gap_s) as usize]);
    }
    AudioBuffer::mono(samples, sr).unwrap()
}

/// One scripted recognizer response.
#[derive(Clone)]
pub struct ScriptedResponse {
    pub text: String,
    pub confidence: Option<f32>,
    pub words: Vec<WordAlignment>,
}

impl ScriptedResponse {
    pub fn plain(text: &str, confidence: f32) -> Self {
        Self {
            text: text.to_string(),
            confidence: Some(confidence),
            words: Vec::new(),
        }
    }

    pub fn with_words(text: &str, confidence: f32, words: &[(&str, f64, f64)]) -> Self {
        Self {
            text: text.to_string(),
            confidence: Some(confidence),
            words: words
                .iter()
                .map(|(w, start, end)| WordAlignment {
                    word: w.to_string(),
                    start: *start,
                    end: *end,
                    confidence: None,
                })
                .collect(),
        }
    }
}

/// Recognizer that replays a scripted sequence of outcomes; the last entry
/// repeats once the script is exhausted.
pub struct ScriptedRecognizer {
    id: String,
    script: Mutex<Vec<Result<ScriptedResponse, RecognizeError>>>,
    calls: Mutex<usize>,
}

impl ScriptedRecognizer {
    pub fn new(id: &str, script: Vec<Result<ScriptedResponse, RecognizeError>>) -> Arc<Self> {
        assert!(!script.is_empty(), "script must not be empty");
        Arc::new(Self {
            id: id.to_string(),
            script: Mutex::new(script),
            calls: Mutex::new(0),
        })
    }

    /// Always returns the same response.
    pub fn constant(id: &str, response: ScriptedResponse) -> Arc<Self> {
        Self::new(id, vec![Ok(response)])
    }

    /// Always fails with the same error.
    pub fn failing(id: &str, error: RecognizeError) -> Arc<Self> {
        Self::new(id, vec![Err(error)])
    }

    /// Number of recognize calls served so far.
    pub fn call_count(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Recognizer for ScriptedRecognizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn language_codes(&self) -> &[&str] {
        &["ko"]
    }

    async fn recognize(
        &self,
        _audio: &AudioBuffer,
        opts: &RecognizeOptions,
    ) -> Result<TranscriptionResult, RecognizeError> {
        let mut calls = self.calls.lock().unwrap();
        let index = *calls;
        *calls += 1;
        drop(calls);

        let script = self.script.lock().unwrap();
        let entry = script
            .get(index)
            .unwrap_or_else(|| script.last().unwrap())
            .clone();
        match entry {
            Ok(response) => Ok(TranscriptionResult {
                text: response.text,
                language: opts.language.clone(),
                confidence: response.confidence,
                words: response.words,
                segments: Vec::new(),
                engine_id: self.id.clone(),
            }),
            Err(error) => Err(error),
        }
    }
}
