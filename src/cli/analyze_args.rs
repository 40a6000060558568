//! Arguments for the `analyze` subcommand.

use clap::Args;
use std::path::PathBuf;

/// Run the full analysis pipeline on a recording.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Input WAV file
    pub input: PathBuf,

    /// Expected transcript for pronunciation assessment
    #[arg(short, long)]
    pub text: Option<String>,

    /// TextGrid output path (defaults to the input path with a .TextGrid
    /// extension)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write the full result as JSON to this path
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Run the primary engine only instead of the ensemble
    #[arg(long)]
    pub single_engine: bool,
}
