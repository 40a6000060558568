//! HanTone library root.
//!
//! Korean speech analysis and pronunciation assessment: audio normalization
//! and enhancement, pitch/formant analysis, Korean-syllable segmentation,
//! ensemble speech recognition with adaptive re-processing, and Praat
//! TextGrid output.

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod commands;
pub mod config;
pub mod core;
pub mod error;
pub mod services;

pub use error::HanToneError;
/// Crate-wide result alias.
pub type Result<T> = error::HanToneResult<T>;
