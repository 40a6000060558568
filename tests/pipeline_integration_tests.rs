//! End-to-end pipeline tests with scripted recognizer engines.

mod common;

use common::{ScriptedRecognizer, ScriptedResponse, burst_train, tone};
use hantone::HanToneError;
use hantone::config::TestConfigBuilder;
use hantone::core::cache::ResultCache;
use hantone::core::pipeline::{CancelFlag, PipelineController, PipelineRequest};
use hantone::core::segment::is_valid_segmentation;
use hantone::services::audio::AudioBuffer;
use hantone::services::stt::{RecognizeError, Recognizer};
use std::sync::Arc;
use std::time::Duration;

fn cache() -> Arc<ResultCache> {
    Arc::new(ResultCache::new(Duration::from_secs(3600), 16, None))
}

fn controller(
    engines: Vec<Arc<dyn Recognizer>>,
    cache: Arc<ResultCache>,
    cache_enabled: bool,
) -> PipelineController {
    let mut builder = TestConfigBuilder::new();
    if !cache_enabled {
        builder = builder.without_cache();
    }
    PipelineController::new(builder.build_config(), engines, cache)
}

/// A clear utterance recognized with word timestamps passes validation on
/// the first attempt and yields a well-formed segmentation.
#[tokio::test]
async fn clean_utterance_passes_first_attempt() {
    let engine = ScriptedRecognizer::constant(
        "whisper-large",
        ScriptedResponse::with_words(
            "안녕하세요",
            0.95,
            &[("안녕", 0.10, 0.50), ("하세요", 0.55, 1.10)],
        ),
    );
    let pipeline = controller(vec![engine], cache(), false);
    let request = PipelineRequest {
        // 5 syllables, ~1.5 s matches the duration prior.
        audio: tone(16000, 1.5, 200.0, 0.4),
        reference_text: Some("안녕하세요".to_string()),
    };

    let result = pipeline.run(&request, &CancelFlag::new()).await.unwrap();

    assert_eq!(result.final_text, "안녕하세요");
    assert_eq!(result.reprocess_attempts, 0);
    assert_eq!(result.achieved_accuracy, Some(1.0));
    assert!(result.quality.overall >= 0.95);
    assert!(!result.has_quality_warning());

    assert_eq!(result.segments.len(), 5);
    assert!(is_valid_segmentation(&result.segments));
    let texts: Vec<&str> = result.segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["안", "녕", "하", "세", "요"]);

    // Stage bookkeeping and telemetry.
    assert!(result.stages_executed.contains(&"preprocess".to_string()));
    assert!(result.stages_executed.contains(&"transcribe".to_string()));
    assert!(result.stages_executed.contains(&"validate".to_string()));
    let trace = result.trace.expect("telemetry trace");
    assert_eq!(trace.root, "pipeline");
    assert!(trace.stages.len() >= 4);
}

/// A failed validation triggers one re-processing attempt; the corrected
/// second recognition is accepted (the adaptive-retry scenario).
#[tokio::test]
async fn reprocessing_recovers_a_misrecognition() {
    let engine = ScriptedRecognizer::new(
        "whisper-large",
        vec![
            Ok(ScriptedResponse::with_words(
                "내려나",
                0.9,
                &[("내려나", 0.05, 0.85)],
            )),
            Ok(ScriptedResponse::with_words(
                "내려가",
                0.95,
                &[("내려가", 0.05, 0.85)],
            )),
        ],
    );
    let engine_probe = Arc::clone(&engine);
    let pipeline = controller(vec![engine], cache(), false);
    let request = PipelineRequest {
        audio: tone(16000, 0.9, 180.0, 0.4),
        reference_text: Some("내려가".to_string()),
    };

    let result = pipeline.run(&request, &CancelFlag::new()).await.unwrap();

    assert_eq!(result.final_text, "내려가");
    assert_eq!(result.reprocess_attempts, 1);
    assert!(result.quality.overall >= 0.95);
    assert_eq!(engine_probe.call_count(), 2);
    // The applied strategy is recorded by name.
    assert!(
        result
            .stages_executed
            .iter()
            .any(|s| s == "whisper_large_precision" || s == "korean_consonant_boost"),
        "stages were {:?}",
        result.stages_executed
    );
    assert!(!result.has_quality_warning());
}

/// When every attempt stays below threshold the best attempt is returned
/// with a quality warning instead of an error.
#[tokio::test]
async fn exhausted_attempts_return_best_with_warning() {
    let engine = ScriptedRecognizer::constant(
        "whisper-large",
        ScriptedResponse::with_words("완전다른말", 0.6, &[("완전다른말", 0.0, 0.9)]),
    );
    let pipeline = controller(vec![engine], cache(), false);
    let request = PipelineRequest {
        audio: tone(16000, 0.9, 180.0, 0.4),
        reference_text: Some("내려가".to_string()),
    };

    let result = pipeline.run(&request, &CancelFlag::new()).await.unwrap();

    assert_eq!(result.final_text, "완전다른말");
    assert!(result.has_quality_warning());
    assert!(result.quality.overall < 0.95);
}

/// All-zero PCM is fatal and nothing is cached (the silence scenario).
#[tokio::test]
async fn silent_input_is_fatal_and_uncached() {
    let engine = ScriptedRecognizer::constant(
        "whisper-large",
        ScriptedResponse::plain("안녕", 0.9),
    );
    let shared_cache = cache();
    let pipeline = controller(vec![engine], Arc::clone(&shared_cache), true);
    let request = PipelineRequest {
        audio: AudioBuffer::mono(vec![0.0; 16000], 16000).unwrap(),
        reference_text: None,
    };

    let err = pipeline.run(&request, &CancelFlag::new()).await.unwrap_err();
    assert!(matches!(err, HanToneError::AllSilence));
    assert!(shared_cache.is_empty().await);
}

/// All engines failing is fatal and preserves per-engine error kinds.
#[tokio::test]
async fn all_engines_failed_is_fatal() {
    let engines: Vec<Arc<dyn Recognizer>> = vec![
        ScriptedRecognizer::failing("whisper-large", RecognizeError::Timeout { seconds: 60 }),
        ScriptedRecognizer::failing("google", RecognizeError::Unavailable("down".into())),
        ScriptedRecognizer::constant("azure", ScriptedResponse::plain("", 0.0)),
    ];
    let pipeline = controller(engines, cache(), false);
    let request = PipelineRequest {
        audio: tone(16000, 1.0, 200.0, 0.4),
        reference_text: None,
    };

    let err = pipeline.run(&request, &CancelFlag::new()).await.unwrap_err();
    match err {
        HanToneError::AllEnginesFailed { failures } => {
            assert_eq!(failures.len(), 3);
            let engines: Vec<&str> = failures.iter().map(|(id, _)| id.as_str()).collect();
            assert_eq!(engines, vec!["whisper-large", "google", "azure"]);
        }
        other => panic!("expected AllEnginesFailed, got {other}"),
    }
}

/// A recognizer without word timestamps routes segmentation through the
/// boundary detector (the no-timestamps scenario).
#[tokio::test]
async fn missing_word_timestamps_use_boundary_segmenter() {
    let engine = ScriptedRecognizer::constant(
        "whisper-large",
        ScriptedResponse::plain("반갑습니다", 0.9),
    );
    let pipeline = controller(vec![engine], cache(), false);
    let request = PipelineRequest {
        audio: burst_train(16000, 5, 0.25, 0.06),
        reference_text: Some("반갑습니다".to_string()),
    };

    let result = pipeline.run(&request, &CancelFlag::new()).await.unwrap();

    assert_eq!(result.segments.len(), 5);
    assert!(is_valid_segmentation(&result.segments));
    assert!(result.segments.iter().all(|s| s.confidence == 0.6));
    assert_eq!(result.final_text, "반갑습니다");
}

/// A target without Hangul produces no segments but the transcript is
/// still returned.
#[tokio::test]
async fn non_hangul_target_returns_empty_segments() {
    let engine = ScriptedRecognizer::constant(
        "whisper-large",
        ScriptedResponse::plain("hello world", 0.9),
    );
    let pipeline = controller(vec![engine], cache(), false);
    let request = PipelineRequest {
        audio: tone(16000, 1.0, 200.0, 0.4),
        reference_text: None,
    };

    let result = pipeline.run(&request, &CancelFlag::new()).await.unwrap();
    assert!(result.segments.is_empty());
    assert_eq!(result.final_text, "hello world");
}

/// Identical inputs and configuration give identical outputs.
#[tokio::test]
async fn pipeline_is_deterministic() {
    let make_pipeline = || {
        let engine = ScriptedRecognizer::constant(
            "whisper-large",
            ScriptedResponse::with_words(
                "안녕하세요",
                0.95,
                &[("안녕", 0.10, 0.50), ("하세요", 0.55, 1.10)],
            ),
        );
        controller(vec![engine as Arc<dyn Recognizer>], cache(), false)
    };
    let request = PipelineRequest {
        audio: tone(16000, 1.5, 200.0, 0.4),
        reference_text: Some("안녕하세요".to_string()),
    };

    let first = make_pipeline()
        .run(&request, &CancelFlag::new())
        .await
        .unwrap();
    let second = make_pipeline()
        .run(&request, &CancelFlag::new())
        .await
        .unwrap();

    assert_eq!(first.final_text, second.final_text);
    assert_eq!(first.quality.overall, second.quality.overall);
    assert_eq!(first.segments, second.segments);
}

/// Accepted results are cached; the second invocation is served from the
/// cache and marked as such.
#[tokio::test]
async fn accepted_results_are_cached() {
    let engine = ScriptedRecognizer::constant(
        "whisper-large",
        ScriptedResponse::with_words(
            "안녕하세요",
            0.95,
            &[("안녕", 0.10, 0.50), ("하세요", 0.55, 1.10)],
        ),
    );
    let engine_probe = Arc::clone(&engine);
    let pipeline = controller(vec![engine], cache(), true);
    let request = PipelineRequest {
        audio: tone(16000, 1.5, 200.0, 0.4),
        reference_text: Some("안녕하세요".to_string()),
    };

    let first = pipeline.run(&request, &CancelFlag::new()).await.unwrap();
    assert!(!first.stages_executed.contains(&"cache".to_string()));

    let second = pipeline.run(&request, &CancelFlag::new()).await.unwrap();
    assert_eq!(second.final_text, first.final_text);
    assert!(second.stages_executed.contains(&"cache".to_string()));
    // The engine ran only for the first invocation.
    assert_eq!(engine_probe.call_count(), 1);
}

/// Cancellation before work starts aborts with `CancelRequested`.
#[tokio::test]
async fn cancellation_propagates() {
    let engine = ScriptedRecognizer::constant(
        "whisper-large",
        ScriptedResponse::plain("안녕", 0.9),
    );
    let pipeline = controller(vec![engine], cache(), false);
    let request = PipelineRequest {
        audio: tone(16000, 1.0, 200.0, 0.4),
        reference_text: None,
    };

    let cancel = CancelFlag::new();
    cancel.cancel();
    let err = pipeline.run(&request, &cancel).await.unwrap_err();
    assert!(matches!(err, HanToneError::CancelRequested));
}
