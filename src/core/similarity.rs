//! Character-level text similarity used by the ensemble coordinator and the
//! quality validator.
//!
//! Two measures are provided: Levenshtein edit-distance accuracy (the quality
//! validator's formula) and longest-common-subsequence ratio on normalized
//! text (the ensemble consensus rule).

/// Levenshtein edit distance between two character sequences.
pub fn edit_distance(a: &[char], b: &[char]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Single-row DP; b indexes the row.
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, &ca) in a.iter().enumerate() {
        let mut prev = row[0];
        row[0] = i + 1;
        for (j, &cb) in b.iter().enumerate() {
            let cost = if ca == cb { prev } else { prev + 1 };
            prev = row[j + 1];
            row[j + 1] = cost.min(row[j] + 1).min(prev + 1);
        }
    }
    row[b.len()]
}

/// Edit-distance accuracy relative to a target sequence, clamped to `[0, 1]`:
/// `1 - distance / max(1, |target|)`.
pub fn edit_distance_accuracy(predicted: &[char], target: &[char]) -> f32 {
    if target.is_empty() {
        return if predicted.is_empty() { 1.0 } else { 0.0 };
    }
    let distance = edit_distance(predicted, target);
    (1.0 - distance as f32 / target.len() as f32).clamp(0.0, 1.0)
}

/// Length of the longest common subsequence of two character sequences.
pub fn lcs_length(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut row = vec![0usize; b.len() + 1];
    for &ca in a {
        let mut prev = 0;
        for (j, &cb) in b.iter().enumerate() {
            let current = row[j + 1];
            row[j + 1] = if ca == cb {
                prev + 1
            } else {
                row[j + 1].max(row[j])
            };
            prev = current;
        }
    }
    row[b.len()]
}

/// Strip whitespace and punctuation, keeping letters and digits only.
pub fn normalize_for_comparison(text: &str) -> Vec<char> {
    text.chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Consensus similarity: LCS ratio over normalized text, in `[0, 1]`.
///
/// Two empty texts are considered identical.
pub fn consensus_similarity(a: &str, b: &str) -> f32 {
    let na = normalize_for_comparison(a);
    let nb = normalize_for_comparison(b);
    if na.is_empty() && nb.is_empty() {
        return 1.0;
    }
    let max_len = na.len().max(nb.len());
    if max_len == 0 {
        return 1.0;
    }
    lcs_length(&na, &nb) as f32 / max_len as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test_case("", "", 0; "both empty")]
    #[test_case("abc", "", 3; "one empty")]
    #[test_case("올라가", "올라가", 0; "identical")]
    #[test_case("올라가", "올려가", 1; "one substitution")]
    #[test_case("내려가", "내려", 1; "one deletion")]
    fn edit_distance_cases(a: &str, b: &str, expected: usize) {
        assert_eq!(edit_distance(&chars(a), &chars(b)), expected);
    }

    #[test]
    fn accuracy_is_clamped() {
        // Prediction far longer than target would go negative unclamped.
        let acc = edit_distance_accuracy(&chars("가나다라마바"), &chars("가"));
        assert_eq!(acc, 0.0);
        assert_eq!(edit_distance_accuracy(&chars("가나"), &chars("가나")), 1.0);
    }

    #[test]
    fn lcs_basics() {
        assert_eq!(lcs_length(&chars("올라가"), &chars("올려가")), 2);
        assert_eq!(lcs_length(&chars("abc"), &chars("abc")), 3);
        assert_eq!(lcs_length(&chars("abc"), &chars("xyz")), 0);
    }

    #[test]
    fn consensus_similarity_ignores_spacing_and_punctuation() {
        assert!(consensus_similarity("안녕 하세요.", "안녕하세요") > 0.99);
        assert!(consensus_similarity("올라가", "올려가") > 0.6);
        assert!(consensus_similarity("올라가", "내려와") < 0.5);
    }

    #[test]
    fn consensus_similarity_empty_behaviour() {
        assert_eq!(consensus_similarity("", ""), 1.0);
        assert_eq!(consensus_similarity("...", "!!!"), 1.0); // both normalize to empty
        assert_eq!(consensus_similarity("가", ""), 0.0);
    }
}
