//! Command-line interface for the HanTone speech analysis tool.
//!
//! Built with `clap` in a subcommand pattern:
//! - `analyze` - full pipeline: segmentation, analysis, quality, TextGrid
//! - `transcribe` - ensemble speech recognition only
//! - `config` - configuration inspection
//! - `cache` - result cache management
//!
//! # Examples
//!
//! ```bash
//! # Assess a recording against its expected transcript
//! hantone analyze recording.wav --text "안녕하세요" --output recording.TextGrid
//!
//! # Transcription only, all engines
//! hantone transcribe recording.wav
//! ```

mod analyze_args;
mod cache_args;
mod config_args;
mod transcribe_args;
pub mod ui;

pub use analyze_args::AnalyzeArgs;
pub use cache_args::{CacheAction, CacheArgs};
pub use config_args::{ConfigAction, ConfigArgs};
pub use transcribe_args::TranscribeArgs;
pub use ui::{create_spinner, print_error, print_success, print_warning};

use crate::Result;
use crate::config::ProductionConfigService;
use clap::{Parser, Subcommand};
use std::sync::Arc;

/// Main CLI application structure.
#[derive(Parser, Debug)]
#[command(name = "hantone")]
#[command(about = "Korean speech analysis and pronunciation assessment")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Use an alternative configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full analysis pipeline on a WAV recording
    Analyze(AnalyzeArgs),

    /// Run ensemble speech recognition only
    Transcribe(TranscribeArgs),

    /// Inspect the configuration
    Config(ConfigArgs),

    /// Manage the result cache
    Cache(CacheArgs),
}

/// Parse arguments and dispatch to the matching command.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config_service: Arc<ProductionConfigService> = match &cli.config {
        Some(path) => Arc::new(ProductionConfigService::with_custom_file(path.clone())),
        None => Arc::new(ProductionConfigService::new()?),
    };

    match cli.command {
        Commands::Analyze(args) => {
            crate::commands::analyze_command::execute(args, config_service.as_ref()).await
        }
        Commands::Transcribe(args) => {
            crate::commands::transcribe_command::execute(args, config_service.as_ref()).await
        }
        Commands::Config(args) => {
            crate::commands::config_command::execute(args, config_service.as_ref())
        }
        Commands::Cache(args) => {
            crate::commands::cache_command::execute(args, config_service.as_ref()).await
        }
    }
}
