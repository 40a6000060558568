//! The `transcribe` command: ensemble recognition without the downstream
//! analysis stages.

use crate::cli::{TranscribeArgs, create_spinner, print_success, print_warning};
use crate::config::ConfigService;
use crate::core::ComponentFactory;
use crate::services::audio::load_wav;
use crate::services::stt::RecognizeOptions;
use crate::Result;
use std::time::Duration;

/// Execute `hantone transcribe`.
pub async fn execute(args: TranscribeArgs, config_service: &dyn ConfigService) -> Result<()> {
    let mut config = config_service.get_config()?;
    if let Some(language) = &args.language {
        config.stt.language = language.clone();
    }
    let factory = ComponentFactory::from_config(config);

    let raw_audio = load_wav(&args.input)?;
    let audio = if args.raw {
        factory.create_normalizer().normalize(&raw_audio)?.audio
    } else {
        let normalized = factory.create_normalizer().normalize(&raw_audio)?;
        factory.create_enhancer().enhance(&normalized.audio)?
    };

    let coordinator = factory.create_ensemble()?;
    let opts = RecognizeOptions {
        language: factory.config().stt.language.clone(),
        deadline: Duration::from_secs(factory.config().stt.timeout_seconds),
        ..RecognizeOptions::default()
    };

    let spinner = factory
        .config()
        .general
        .enable_progress_bar
        .then(|| create_spinner("Transcribing"));
    let result = coordinator.transcribe(&audio, &opts, false).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let result = result?;

    print_success(&format!(
        "{} (confidence {:.3}, {})",
        result.transcript.text, result.confidence, result.selected_engine
    ));
    for engine in &result.engines {
        match &engine.error {
            None => println!(
                "  {}: '{}' score {:.3} ({} ms)",
                engine.engine_id, engine.text, engine.score, engine.processing_time_ms
            ),
            Some(error) => print_warning(&format!("  {}: {}", engine.engine_id, error)),
        }
    }
    Ok(())
}
