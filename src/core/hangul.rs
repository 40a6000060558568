//! Hangul syllable codec.
//!
//! Composes and decomposes precomposed Hangul syllables (`U+AC00..=U+D7A3`)
//! to and from their (choseong, jungseong, jongseong) jamo using the
//! arithmetic block layout, not Unicode normalization tables. The arithmetic
//! path is exact and allocation-free.

use crate::{Result, error::HanToneError};

/// First codepoint of the precomposed Hangul syllable block.
const SYLLABLE_BASE: u32 = 0xAC00;
/// Last codepoint of the precomposed Hangul syllable block.
const SYLLABLE_LAST: u32 = 0xD7A3;
/// Number of jungseong per choseong block (21 * 28).
const CHOSEONG_STRIDE: u32 = 588;
/// Number of jongseong slots per jungseong (including the empty slot).
const JUNGSEONG_STRIDE: u32 = 28;

/// The 19 initial consonants (choseong), in block order.
pub const CHOSEONG: [char; 19] = [
    'ㄱ', 'ㄲ', 'ㄴ', 'ㄷ', 'ㄸ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅃ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅉ', 'ㅊ',
    'ㅋ', 'ㅌ', 'ㅍ', 'ㅎ',
];

/// The 21 medial vowels (jungseong), in block order.
pub const JUNGSEONG: [char; 21] = [
    'ㅏ', 'ㅐ', 'ㅑ', 'ㅒ', 'ㅓ', 'ㅔ', 'ㅕ', 'ㅖ', 'ㅗ', 'ㅘ', 'ㅙ', 'ㅚ', 'ㅛ', 'ㅜ', 'ㅝ',
    'ㅞ', 'ㅟ', 'ㅠ', 'ㅡ', 'ㅢ', 'ㅣ',
];

/// The 27 final consonants (jongseong), in block order. Index 0 of the block
/// means "no final", so this table starts at block index 1.
pub const JONGSEONG: [char; 27] = [
    'ㄱ', 'ㄲ', 'ㄳ', 'ㄴ', 'ㄵ', 'ㄶ', 'ㄷ', 'ㄹ', 'ㄺ', 'ㄻ', 'ㄼ', 'ㄽ', 'ㄾ', 'ㄿ', 'ㅀ',
    'ㅁ', 'ㅂ', 'ㅄ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅊ', 'ㅋ', 'ㅌ', 'ㅍ', 'ㅎ',
];

/// Jamo decomposition of a single Hangul syllable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JamoTriple {
    /// Initial consonant (choseong)
    pub initial: char,
    /// Medial vowel (jungseong)
    pub medial: char,
    /// Optional final consonant (jongseong)
    pub last: Option<char>,
}

/// Returns `true` exactly for codepoints in `U+AC00..=U+D7A3`.
pub fn is_hangul_syllable(c: char) -> bool {
    (SYLLABLE_BASE..=SYLLABLE_LAST).contains(&(c as u32))
}

/// Decompose a precomposed syllable into its jamo.
///
/// # Errors
///
/// Returns [`HanToneError::NotHangul`] when `c` is outside the syllable
/// block.
pub fn decompose(c: char) -> Result<JamoTriple> {
    if !is_hangul_syllable(c) {
        return Err(HanToneError::NotHangul {
            codepoint: c as u32,
        });
    }
    let code = c as u32 - SYLLABLE_BASE;
    let initial_idx = (code / CHOSEONG_STRIDE) as usize;
    let medial_idx = ((code % CHOSEONG_STRIDE) / JUNGSEONG_STRIDE) as usize;
    let final_idx = (code % JUNGSEONG_STRIDE) as usize;

    Ok(JamoTriple {
        initial: CHOSEONG[initial_idx],
        medial: JUNGSEONG[medial_idx],
        last: if final_idx == 0 {
            None
        } else {
            Some(JONGSEONG[final_idx - 1])
        },
    })
}

/// Compose jamo back into a precomposed syllable.
///
/// Inverse of [`decompose`]: `compose(decompose(c)?) == Some(c)` for every
/// valid syllable. Returns `None` when any jamo is not in its table.
pub fn compose(jamo: JamoTriple) -> Option<char> {
    let initial_idx = CHOSEONG.iter().position(|&j| j == jamo.initial)? as u32;
    let medial_idx = JUNGSEONG.iter().position(|&j| j == jamo.medial)? as u32;
    let final_idx = match jamo.last {
        None => 0,
        Some(f) => JONGSEONG.iter().position(|&j| j == f)? as u32 + 1,
    };
    char::from_u32(
        SYLLABLE_BASE + initial_idx * CHOSEONG_STRIDE + medial_idx * JUNGSEONG_STRIDE + final_idx,
    )
}

/// Extract the Hangul syllables of `text`, dropping everything else
/// (whitespace, punctuation, Latin letters, lone jamo).
pub fn syllables(text: &str) -> Vec<char> {
    text.chars().filter(|&c| is_hangul_syllable(c)).collect()
}

/// Flatten `text` to its jamo sequence.
///
/// Each syllable contributes 2 or 3 jamo; non-Hangul characters are dropped.
pub fn jamo_sequence(text: &str) -> Vec<char> {
    let mut jamo = Vec::with_capacity(text.len());
    for c in text.chars() {
        if let Ok(triple) = decompose(c) {
            jamo.push(triple.initial);
            jamo.push(triple.medial);
            if let Some(last) = triple.last {
                jamo.push(last);
            }
        }
    }
    jamo
}

/// Returns `true` when `c` is a lone (compatibility or conjoining) jamo,
/// i.e. a consonant or vowel that never forms a complete syllable by itself.
///
/// Recognizers occasionally emit these for mumbled speech; the quality
/// validator penalizes them.
pub fn is_incomplete_jamo(c: char) -> bool {
    let cp = c as u32;
    (0x1100..=0x11FF).contains(&cp) // conjoining jamo
        || (0x3131..=0x318E).contains(&cp) // compatibility jamo
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompose_known_syllables() {
        // 안 = ㅇ + ㅏ + ㄴ
        let jamo = decompose('안').unwrap();
        assert_eq!(jamo.initial, 'ㅇ');
        assert_eq!(jamo.medial, 'ㅏ');
        assert_eq!(jamo.last, Some('ㄴ'));

        // 하 = ㅎ + ㅏ, no final
        let jamo = decompose('하').unwrap();
        assert_eq!(jamo.initial, 'ㅎ');
        assert_eq!(jamo.medial, 'ㅏ');
        assert_eq!(jamo.last, None);
    }

    #[test]
    fn decompose_rejects_non_hangul() {
        for c in ['a', 'ㅏ', '漢'] {
            // Lone jamo are not syllables either.
            match decompose(c) {
                Err(HanToneError::NotHangul { codepoint }) => assert_eq!(codepoint, c as u32),
                other => panic!("expected NotHangul for {c:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn compose_inverts_decompose_over_full_block() {
        // Every 97th syllable keeps the test fast while covering all three
        // index dimensions.
        for cp in (SYLLABLE_BASE..=SYLLABLE_LAST).step_by(97) {
            let c = char::from_u32(cp).unwrap();
            let jamo = decompose(c).unwrap();
            assert_eq!(compose(jamo), Some(c), "round trip failed for U+{cp:04X}");
        }
    }

    #[test]
    fn compose_first_and_last_block_entries() {
        assert_eq!(
            compose(JamoTriple {
                initial: 'ㄱ',
                medial: 'ㅏ',
                last: None
            }),
            Some('가')
        );
        assert_eq!(
            compose(JamoTriple {
                initial: 'ㅎ',
                medial: 'ㅣ',
                last: Some('ㅎ')
            }),
            Some('힣')
        );
    }

    #[test]
    fn syllables_drops_non_hangul() {
        assert_eq!(syllables("안녕 hello 하세요!"), vec!['안', '녕', '하', '세', '요']);
        assert!(syllables("abc 123").is_empty());
    }

    #[test]
    fn jamo_sequence_flattens_syllables() {
        // 안녕 = ㅇㅏㄴ + ㄴㅕㅇ
        assert_eq!(jamo_sequence("안녕"), vec!['ㅇ', 'ㅏ', 'ㄴ', 'ㄴ', 'ㅕ', 'ㅇ']);
        // Mixed input drops the Latin part.
        assert_eq!(jamo_sequence("a가"), vec!['ㄱ', 'ㅏ']);
    }

    #[test]
    fn incomplete_jamo_detection() {
        assert!(is_incomplete_jamo('ㅏ'));
        assert!(is_incomplete_jamo('ㄱ'));
        assert!(!is_incomplete_jamo('가'));
        assert!(!is_incomplete_jamo('a'));
    }
}
