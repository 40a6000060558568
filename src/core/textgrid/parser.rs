//! TextGrid parsing: reads the grammar [`writer`](super::writer) emits, plus
//! proportional time rescaling for grids whose audio was trimmed.

use super::Interval;
use crate::core::segment::Syllable;
use crate::{Result, error::HanToneError};
use encoding_rs::UTF_16LE;
use log::debug;

/// A parsed TextGrid: total duration and the syllable-tier intervals.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTextGrid {
    pub xmax: f64,
    pub intervals: Vec<Interval>,
}

impl ParsedTextGrid {
    /// Convert labeled intervals to syllables, skipping gap intervals.
    /// Imported grids carry full confidence.
    pub fn to_syllables(&self) -> Vec<Syllable> {
        self.intervals
            .iter()
            .filter(|interval| !interval.text.trim().is_empty())
            .filter_map(|interval| {
                let c = interval.text.trim().chars().next()?;
                Some(Syllable::new(c, interval.xmin, interval.xmax, 1.0))
            })
            .collect()
    }

    /// Rescale every boundary by `time_ratio` and set the new total
    /// duration, keeping intervals proportional after silence trimming.
    pub fn rescale(&mut self, time_ratio: f64, new_duration: f64) {
        for interval in self.intervals.iter_mut() {
            interval.xmin *= time_ratio;
            interval.xmax *= time_ratio;
        }
        self.xmax = new_duration;
        if let Some(last) = self.intervals.last_mut() {
            last.xmax = last.xmax.min(new_duration);
        }
    }
}

/// Parse TextGrid bytes (UTF-16 with BOM, or UTF-8 as a fallback).
///
/// # Errors
///
/// Returns [`HanToneError::TextGrid`] when the header or an interval block
/// cannot be read.
pub fn parse_textgrid(bytes: &[u8]) -> Result<ParsedTextGrid> {
    let content = decode(bytes)?;
    let mut xmax: Option<f64> = None;
    let mut intervals = Vec::new();

    let mut current: Option<(Option<f64>, Option<f64>, Option<String>)> = None;
    for raw_line in content.lines() {
        let line = raw_line.trim();

        if line.starts_with("intervals [") {
            flush(&mut current, &mut intervals)?;
            current = Some((None, None, None));
            continue;
        }

        if let Some(value) = line.strip_prefix("xmax = ") {
            let parsed: f64 = value
                .trim()
                .parse()
                .map_err(|_| HanToneError::textgrid(format!("bad xmax: {value}")))?;
            match current.as_mut() {
                Some(interval) => interval.1 = Some(parsed),
                // The first file-level xmax wins; the tier repeats it.
                None => xmax = xmax.or(Some(parsed)),
            }
        } else if let Some(value) = line.strip_prefix("xmin = ") {
            let parsed: f64 = value
                .trim()
                .parse()
                .map_err(|_| HanToneError::textgrid(format!("bad xmin: {value}")))?;
            if let Some(interval) = current.as_mut() {
                interval.0 = Some(parsed);
            }
        } else if let Some(value) = line.strip_prefix("text = ") {
            if let Some(interval) = current.as_mut() {
                interval.2 = Some(unquote(value)?);
            }
        }
    }
    flush(&mut current, &mut intervals)?;

    let xmax = xmax.ok_or_else(|| HanToneError::textgrid("missing xmax"))?;
    debug!("Parsed TextGrid: {} intervals, xmax {xmax:.3}", intervals.len());
    Ok(ParsedTextGrid { xmax, intervals })
}

fn flush(
    current: &mut Option<(Option<f64>, Option<f64>, Option<String>)>,
    intervals: &mut Vec<Interval>,
) -> Result<()> {
    if let Some((xmin, xmax, text)) = current.take() {
        let (Some(xmin), Some(xmax), Some(text)) = (xmin, xmax, text) else {
            return Err(HanToneError::textgrid("incomplete interval block"));
        };
        intervals.push(Interval { xmin, xmax, text });
    }
    Ok(())
}

fn decode(bytes: &[u8]) -> Result<String> {
    if bytes.starts_with(&[0xFF, 0xFE]) || bytes.starts_with(&[0xFE, 0xFF]) {
        let (content, _, had_errors) = UTF_16LE.decode(bytes);
        if had_errors {
            return Err(HanToneError::textgrid("invalid UTF-16 content"));
        }
        Ok(content.into_owned())
    } else {
        String::from_utf8(bytes.to_vec())
            .map_err(|_| HanToneError::textgrid("content is neither UTF-16 nor UTF-8"))
    }
}

/// Strip the surrounding quotes and undo quote doubling.
fn unquote(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.len() < 2 || !trimmed.starts_with('"') || !trimmed.ends_with('"') {
        return Err(HanToneError::textgrid(format!("bad string literal: {value}")));
    }
    Ok(trimmed[1..trimmed.len() - 1].replace("\"\"", "\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::textgrid::writer::write_textgrid;

    fn sample_syllables() -> Vec<Syllable> {
        vec![
            Syllable::new('안', 0.1, 0.3, 0.8),
            Syllable::new('녕', 0.3, 0.55, 0.8),
        ]
    }

    #[test]
    fn parses_what_the_writer_emits() {
        let bytes = write_textgrid(&sample_syllables(), 1.0);
        let parsed = parse_textgrid(&bytes).unwrap();

        assert!((parsed.xmax - 1.0).abs() < 1e-9);
        // Leading gap + 2 syllables + trailing gap.
        assert_eq!(parsed.intervals.len(), 4);
        let syllables = parsed.to_syllables();
        assert_eq!(syllables.len(), 2);
        assert_eq!(syllables[0].text, "안");
        assert!((syllables[0].start - 0.1).abs() < 1e-6);
        assert!((syllables[1].end - 0.55).abs() < 1e-6);
        // Jamo fields are refilled on import.
        assert_eq!(syllables[1].coda, "ㅇ");
    }

    #[test]
    fn emit_parse_emit_is_byte_identical() {
        let first = write_textgrid(&sample_syllables(), 1.0);
        let parsed = parse_textgrid(&first).unwrap();
        let second = write_textgrid(&parsed.to_syllables(), parsed.xmax);
        assert_eq!(first, second);
    }

    #[test]
    fn quote_doubling_round_trips() {
        let mut syllable = Syllable::new('가', 0.0, 1.0, 1.0);
        syllable.text = "a\"b".to_string();
        let bytes = write_textgrid(&[syllable], 1.0);
        let parsed = parse_textgrid(&bytes).unwrap();
        let labeled: Vec<&Interval> = parsed
            .intervals
            .iter()
            .filter(|i| !i.text.is_empty())
            .collect();
        assert_eq!(labeled[0].text, "a\"b");
    }

    #[test]
    fn rescale_shrinks_boundaries_proportionally() {
        let bytes = write_textgrid(&sample_syllables(), 1.0);
        let mut parsed = parse_textgrid(&bytes).unwrap();
        parsed.rescale(0.5, 0.5);

        assert!((parsed.xmax - 0.5).abs() < 1e-9);
        let syllables = parsed.to_syllables();
        assert!((syllables[0].start - 0.05).abs() < 1e-6);
        assert!((syllables[1].end - 0.275).abs() < 1e-6);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_textgrid(b"not a textgrid").is_err());
        assert!(parse_textgrid(&[]).is_err());
    }

    #[test]
    fn accepts_utf8_fallback() {
        let utf8 = "File type = \"ooTextFile\"\nObject class = \"TextGrid\"\n\n\
                    xmin = 0.000000\nxmax = 2.000000\ntiers? <exists>\nsize = 1\n\
                    item []:\n    item [1]:\n        class = \"IntervalTier\"\n\
                    name = \"syllables\"\n        xmin = 0.000000\n        xmax = 2.000000\n\
                    intervals: size = 1\n        intervals [1]:\n\
                    xmin = 0.000000\n            xmax = 2.000000\n            text = \"가\"\n";
        let parsed = parse_textgrid(utf8.as_bytes()).unwrap();
        assert_eq!(parsed.to_syllables().len(), 1);
    }
}
