//! Arguments for the `transcribe` subcommand.

use clap::Args;
use std::path::PathBuf;

/// Run ensemble speech recognition on a recording.
#[derive(Args, Debug)]
pub struct TranscribeArgs {
    /// Input WAV file
    pub input: PathBuf,

    /// Recognition language code
    #[arg(short, long)]
    pub language: Option<String>,

    /// Skip the audio enhancement stage
    #[arg(long)]
    pub raw: bool,
}
