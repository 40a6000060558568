//! Aligner + voice-start detection working together over synthetic audio.

mod common;

use common::silence_then_tone;
use hantone::core::segment::{SyllableAligner, is_valid_segmentation};
use hantone::services::audio::VoiceStartDetector;
use hantone::services::stt::WordAlignment;

fn word(text: &str, start: f64, end: f64) -> WordAlignment {
    WordAlignment {
        word: text.to_string(),
        start,
        end,
        confidence: None,
    }
}

/// The canonical clear-greeting case: leading silence detected and removed
/// from the timeline, syllables distributed per word.
#[test]
fn greeting_with_leading_silence() {
    let audio = silence_then_tone(16000, 0.15, 1.0);
    let words = vec![word("안녕", 0.10, 0.50), word("하세요", 0.55, 1.10)];

    let voice_start = VoiceStartDetector::detect(&audio, &words);
    let result = SyllableAligner::align("안녕하세요", &words, voice_start);

    assert_eq!(result.syllables.len(), 5);
    assert!(is_valid_segmentation(&result.syllables));
    assert!(result.count_mismatch.is_none());

    // Ends are monotone and the first syllable starts at (or near) zero
    // after the shift.
    assert!(result.syllables[0].start < 0.06);
    for pair in result.syllables.windows(2) {
        assert!(pair[0].end <= pair[1].start + 1e-9);
    }

    // Jamo decomposition is carried on every syllable.
    assert_eq!(result.syllables[0].initial, "ㅇ");
    assert_eq!(result.syllables[0].medial, "ㅏ");
    assert_eq!(result.syllables[0].coda, "ㄴ");
    assert_eq!(result.syllables[4].text, "요");
    assert_eq!(result.syllables[4].coda, "");
}

/// Mixed Hangul and Latin words: only Hangul contributes syllables.
#[test]
fn mixed_language_words() {
    let audio = silence_then_tone(16000, 0.0, 2.0);
    let words = vec![
        word("OK", 0.0, 0.3),
        word("그래요", 0.4, 1.2),
        word("yes", 1.3, 1.6),
    ];
    let voice_start = VoiceStartDetector::detect(&audio, &words);
    let result = SyllableAligner::align("그래요", &words, voice_start);

    assert_eq!(result.syllables.len(), 3);
    let texts: Vec<&str> = result.syllables.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(texts, vec!["그", "래", "요"]);
}

/// An overlong first word (recognizer swallowed the silence) shifts the
/// whole alignment forward of zero.
#[test]
fn overlong_first_word_is_compensated() {
    // 1.2 s of real silence before speech; the recognizer stretched the
    // first word across it.
    let audio = silence_then_tone(16000, 1.2, 1.0);
    let words = vec![word("안녕하세요", 0.0, 2.1)];

    let voice_start = VoiceStartDetector::detect(&audio, &words);
    // Coarse tier: 70% of 2.1 s = 1.47 s; fine tier: ~1.15 s. They disagree
    // by more than 100 ms, so the fine estimate wins.
    assert!(
        (voice_start - 1.15).abs() < 0.08,
        "voice start was {voice_start:.3}"
    );

    let result = SyllableAligner::align("안녕하세요", &words, voice_start);
    assert_eq!(result.syllables.len(), 5);
    assert_eq!(result.syllables[0].start, 0.0);
    assert!(is_valid_segmentation(&result.syllables));
}
