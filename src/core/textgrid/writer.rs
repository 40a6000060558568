//! TextGrid emission: UTF-16LE with BOM, fixed-point numbers, contiguous
//! tier coverage.

use super::{Interval, TIER_NAME};
use crate::core::segment::Syllable;
use log::debug;

/// Intervals closer together than this are considered adjacent; no gap
/// interval is inserted between them.
const GAP_EPSILON: f64 = 1e-6;

/// Serialize `syllables` to TextGrid bytes covering `[0, total_duration]`.
///
/// Gaps between consecutive syllables (and before the first / after the
/// last) become empty-text intervals so the tier is contiguous. Numbers use
/// six fractional digits; embedded quotes are doubled per the Praat
/// grammar. Output is UTF-16LE with a BOM.
pub fn write_textgrid(syllables: &[Syllable], total_duration: f64) -> Vec<u8> {
    let intervals = fill_gaps(syllables, total_duration);
    let content = render(&intervals, total_duration);
    debug!(
        "TextGrid: {} intervals over {:.3}s",
        intervals.len(),
        total_duration
    );
    encode_utf16le_bom(&content)
}

/// Build the contiguous interval list.
fn fill_gaps(syllables: &[Syllable], total_duration: f64) -> Vec<Interval> {
    let mut intervals = Vec::with_capacity(syllables.len() * 2 + 1);
    let mut cursor = 0.0f64;

    for syllable in syllables {
        let start = syllable.start.max(cursor).min(total_duration);
        let end = syllable.end.min(total_duration);
        if end <= start {
            continue;
        }
        if start - cursor > GAP_EPSILON {
            intervals.push(Interval {
                xmin: cursor,
                xmax: start,
                text: String::new(),
            });
        }
        intervals.push(Interval {
            xmin: start,
            xmax: end,
            text: syllable.text.clone(),
        });
        cursor = end;
    }
    if total_duration - cursor > GAP_EPSILON {
        intervals.push(Interval {
            xmin: cursor,
            xmax: total_duration,
            text: String::new(),
        });
    }
    if intervals.is_empty() {
        intervals.push(Interval {
            xmin: 0.0,
            xmax: total_duration.max(GAP_EPSILON),
            text: String::new(),
        });
    }
    intervals
}

fn render(intervals: &[Interval], total_duration: f64) -> String {
    let mut out = String::with_capacity(256 + intervals.len() * 96);
    out.push_str("File type = \"ooTextFile\"\n");
    out.push_str("Object class = \"TextGrid\"\n");
    out.push('\n');
    out.push_str(&format!("xmin = {}\n", number(0.0)));
    out.push_str(&format!("xmax = {}\n", number(total_duration)));
    out.push_str("tiers? <exists>\n");
    out.push_str("size = 1\n");
    out.push_str("item []:\n");
    out.push_str("    item [1]:\n");
    out.push_str("        class = \"IntervalTier\"\n");
    out.push_str(&format!("        name = \"{TIER_NAME}\"\n"));
    out.push_str(&format!("        xmin = {}\n", number(0.0)));
    out.push_str(&format!("        xmax = {}\n", number(total_duration)));
    out.push_str(&format!("        intervals: size = {}\n", intervals.len()));

    for (i, interval) in intervals.iter().enumerate() {
        out.push_str(&format!("        intervals [{}]:\n", i + 1));
        out.push_str(&format!("            xmin = {}\n", number(interval.xmin)));
        out.push_str(&format!("            xmax = {}\n", number(interval.xmax)));
        out.push_str(&format!(
            "            text = \"{}\"\n",
            quote(&interval.text)
        ));
    }
    out
}

/// Fixed-point with six fractional digits.
fn number(value: f64) -> String {
    format!("{value:.6}")
}

/// Double embedded quotes per the Praat string grammar.
fn quote(text: &str) -> String {
    text.replace('"', "\"\"")
}

/// UTF-16LE with a byte-order mark.
fn encode_utf16le_bom(content: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(2 + content.len() * 2);
    bytes.extend_from_slice(&[0xFF, 0xFE]);
    for unit in content.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}
