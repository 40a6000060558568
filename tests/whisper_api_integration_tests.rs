//! Whisper HTTP adapter tests against a mock server.

mod common;

use common::tone;
use hantone::config::WhisperEngineConfig;
use hantone::services::stt::{
    RecognizeError, RecognizeOptions, Recognizer, WhisperApiRecognizer,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn engine_config(base_url: &str) -> WhisperEngineConfig {
    WhisperEngineConfig {
        api_key: Some("test-key".into()),
        base_url: base_url.to_string(),
        max_retries: 1,
        retry_delay_ms: 10,
        timeout_seconds: 5,
        ..WhisperEngineConfig::default()
    }
}

#[tokio::test]
async fn successful_transcription_with_word_timestamps() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": "안녕하세요",
            "language": "ko",
            "segments": [{"start": 0.0, "end": 1.1, "text": " 안녕하세요"}],
            "words": [
                {"word": "안녕", "start": 0.1, "end": 0.5},
                {"word": "하세요", "start": 0.55, "end": 1.1}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let recognizer =
        WhisperApiRecognizer::new("whisper-large", "whisper-1", &engine_config(&server.uri()))
            .unwrap();
    let result = recognizer
        .recognize(&tone(16000, 1.2, 200.0, 0.4), &RecognizeOptions::default())
        .await
        .unwrap();

    assert_eq!(result.text, "안녕하세요");
    assert_eq!(result.engine_id, "whisper-large");
    assert_eq!(result.words.len(), 2);
    assert_eq!(result.words[0].word, "안녕");
    assert_eq!(result.confidence, None);
    assert_eq!(result.segments.len(), 1);
}

#[tokio::test]
async fn auth_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
        .expect(1)
        .mount(&server)
        .await;

    let recognizer =
        WhisperApiRecognizer::new("whisper-large", "whisper-1", &engine_config(&server.uri()))
            .unwrap();
    let err = recognizer
        .recognize(&tone(16000, 0.5, 200.0, 0.4), &RecognizeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RecognizeError::AuthFailed(_)));
}

#[tokio::test]
async fn transient_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(2) // initial attempt + 1 retry
        .mount(&server)
        .await;

    let recognizer =
        WhisperApiRecognizer::new("whisper-base", "whisper-1", &engine_config(&server.uri()))
            .unwrap();
    let err = recognizer
        .recognize(&tone(16000, 0.5, 200.0, 0.4), &RecognizeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RecognizeError::Transient(_)));
}

#[tokio::test]
async fn malformed_payload_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let recognizer =
        WhisperApiRecognizer::new("whisper-large", "whisper-1", &engine_config(&server.uri()))
            .unwrap();
    let err = recognizer
        .recognize(&tone(16000, 0.5, 200.0, 0.4), &RecognizeOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RecognizeError::Malformed(_)));
}
