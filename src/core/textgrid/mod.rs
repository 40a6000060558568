//! Praat TextGrid serialization.
//!
//! Emits and parses the "ooTextFile" Object-class-TextGrid grammar with a
//! single `IntervalTier` named `syllables`, encoded as UTF-16LE with BOM the
//! way Praat writes its own files.

pub mod parser;
pub mod writer;

pub use parser::{ParsedTextGrid, parse_textgrid};
pub use writer::write_textgrid;

use serde::{Deserialize, Serialize};

/// Name of the single interval tier.
pub const TIER_NAME: &str = "syllables";

/// One labeled interval of the tier. Empty text marks a gap interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub xmin: f64,
    pub xmax: f64,
    pub text: String,
}
