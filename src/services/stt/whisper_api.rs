//! OpenAI-compatible Whisper API recognizer adapter.
//!
//! Uploads the audio buffer as an in-memory WAV and requests `verbose_json`
//! with word-level timestamp granularity. HTTP failures are mapped onto the
//! common [`RecognizeError`] taxonomy; transient failures are retried with
//! exponential backoff.

use super::retry::RetryPolicy;
use super::{
    RecognizeError, RecognizeOptions, Recognizer, SentenceSegment, TranscriptionResult,
    WordAlignment,
};
use crate::config::WhisperEngineConfig;
use crate::services::audio::AudioBuffer;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::io::Cursor;
use std::time::Duration;

/// Languages the Whisper endpoint is exercised with here.
const LANGUAGES: [&str; 2] = ["ko", "en"];

/// Whisper HTTP adapter.
pub struct WhisperApiRecognizer {
    id: String,
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryPolicy,
}

impl WhisperApiRecognizer {
    /// Create an adapter for one Whisper model variant.
    ///
    /// `id` is the ensemble-facing engine identifier (e.g. `whisper-large`);
    /// `model` the API-side model name.
    pub fn new(id: &str, model: &str, config: &WhisperEngineConfig) -> Result<Self, RecognizeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| RecognizeError::Unavailable(format!("HTTP client setup: {e}")))?;

        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| RecognizeError::AuthFailed("missing API key".into()))?;

        Ok(Self {
            id: id.to_string(),
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            retry: RetryPolicy::new(config.max_retries, config.retry_delay_ms),
        })
    }

    /// Encode the buffer as a 16-bit PCM WAV in memory.
    fn encode_wav(audio: &AudioBuffer) -> Result<Vec<u8>, RecognizeError> {
        let mono = audio.to_mono();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: mono.sample_rate(),
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)
                .map_err(|e| RecognizeError::Malformed(format!("WAV encoding: {e}")))?;
            for &s in mono.samples() {
                let value = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                writer
                    .write_sample(value)
                    .map_err(|e| RecognizeError::Malformed(format!("WAV encoding: {e}")))?;
            }
            writer
                .finalize()
                .map_err(|e| RecognizeError::Malformed(format!("WAV encoding: {e}")))?;
        }
        Ok(cursor.into_inner())
    }

    async fn try_recognize(
        &self,
        wav_bytes: Vec<u8>,
        opts: &RecognizeOptions,
    ) -> Result<TranscriptionResult, RecognizeError> {
        let mut form = Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .part(
                "file",
                Part::bytes(wav_bytes)
                    .file_name("audio.wav")
                    .mime_str("audio/wav")
                    .map_err(|e| RecognizeError::Malformed(format!("multipart: {e}")))?,
            );
        if opts.want_word_timestamps {
            form = form
                .text("timestamp_granularities[]", "word")
                .text("timestamp_granularities[]", "segment");
        }
        if opts.language != "auto" {
            form = form.text("language", opts.language.clone());
        }
        if let Some(temperature) = opts.temperature {
            form = form.text("temperature", temperature.to_string());
        }
        if let Some(prompt) = &opts.initial_prompt {
            form = form.text("prompt", prompt.clone());
        }

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RecognizeError::Timeout {
                        seconds: opts.deadline.as_secs(),
                    }
                } else if e.is_connect() {
                    RecognizeError::Unavailable(e.to_string())
                } else {
                    RecognizeError::Transient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => RecognizeError::AuthFailed(format!("{status}: {body}")),
                408 | 429 | 500..=599 => RecognizeError::Transient(format!("{status}: {body}")),
                _ => RecognizeError::Malformed(format!("{status}: {body}")),
            });
        }

        let payload: WhisperResponse = response
            .json()
            .await
            .map_err(|e| RecognizeError::Malformed(format!("response parsing: {e}")))?;
        Ok(self.into_transcription(payload, &opts.language))
    }

    fn into_transcription(&self, payload: WhisperResponse, language: &str) -> TranscriptionResult {
        let mut words: Vec<WordAlignment> = payload
            .words
            .unwrap_or_default()
            .into_iter()
            .map(|w| WordAlignment {
                word: w.word,
                start: w.start,
                end: w.end,
                confidence: None,
            })
            .collect();
        // Guard the sortedness invariant; some deployments emit unsorted
        // word lists for overlapping segments.
        words.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

        let segments = payload
            .segments
            .unwrap_or_default()
            .into_iter()
            .map(|s| SentenceSegment {
                text: s.text.trim().to_string(),
                start: s.start,
                end: s.end,
            })
            .collect();

        TranscriptionResult {
            text: payload.text.trim().to_string(),
            language: payload.language.unwrap_or_else(|| language.to_string()),
            // The Whisper API exposes no utterance confidence.
            confidence: None,
            words,
            segments,
            engine_id: self.id.clone(),
        }
    }
}

#[async_trait]
impl Recognizer for WhisperApiRecognizer {
    fn id(&self) -> &str {
        &self.id
    }

    fn language_codes(&self) -> &[&str] {
        &LANGUAGES
    }

    async fn recognize(
        &self,
        audio: &AudioBuffer,
        opts: &RecognizeOptions,
    ) -> Result<TranscriptionResult, RecognizeError> {
        debug!(
            "Whisper recognize: engine={}, model={}, {:.2}s of audio",
            self.id,
            self.model,
            audio.duration_seconds()
        );
        let wav_bytes = Self::encode_wav(audio)?;

        let result = self
            .retry
            .run(|| self.try_recognize(wav_bytes.clone(), opts))
            .await;
        if let Err(e) = &result {
            warn!("Whisper engine {} failed: {e}", self.id);
        }
        result
    }
}

/// Whisper API response payload (`verbose_json`).
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
    language: Option<String>,
    segments: Option<Vec<WhisperSegment>>,
    words: Option<Vec<WhisperWord>>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    start: f64,
    end: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WhisperEngineConfig;

    fn engine_config(key: Option<&str>) -> WhisperEngineConfig {
        WhisperEngineConfig {
            api_key: key.map(str::to_string),
            ..WhisperEngineConfig::default()
        }
    }

    #[test]
    fn creation_requires_api_key() {
        let err = WhisperApiRecognizer::new("whisper-large", "whisper-1", &engine_config(None));
        assert!(matches!(err, Err(RecognizeError::AuthFailed(_))));

        let ok = WhisperApiRecognizer::new("whisper-large", "whisper-1", &engine_config(Some("k")));
        assert!(ok.is_ok());
    }

    #[test]
    fn wav_encoding_produces_riff_header() {
        let audio = AudioBuffer::mono(vec![0.0, 0.5, -0.5, 0.25], 16000).unwrap();
        let bytes = WhisperApiRecognizer::encode_wav(&audio).unwrap();
        assert_eq!(&bytes[..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
    }

    #[test]
    fn transcription_mapping_trims_and_sorts() {
        let recognizer =
            WhisperApiRecognizer::new("whisper-large", "whisper-1", &engine_config(Some("k")))
                .unwrap();
        let payload = WhisperResponse {
            text: "  안녕하세요 ".to_string(),
            language: Some("ko".to_string()),
            segments: Some(vec![WhisperSegment {
                start: 0.0,
                end: 1.1,
                text: " 안녕하세요 ".to_string(),
            }]),
            words: Some(vec![
                WhisperWord {
                    word: "하세요".to_string(),
                    start: 0.55,
                    end: 1.1,
                },
                WhisperWord {
                    word: "안녕".to_string(),
                    start: 0.1,
                    end: 0.5,
                },
            ]),
        };
        let result = recognizer.into_transcription(payload, "ko");
        assert_eq!(result.text, "안녕하세요");
        assert_eq!(result.confidence, None, "Whisper exposes no confidence");
        assert_eq!(result.words[0].word, "안녕");
        assert!(result.words[0].start <= result.words[1].start);
    }
}
