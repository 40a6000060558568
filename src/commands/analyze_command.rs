//! The `analyze` command: full pipeline run, TextGrid output, and a
//! terminal report.

use crate::cli::{AnalyzeArgs, create_spinner, print_success, print_warning};
use crate::config::ConfigService;
use crate::core::ComponentFactory;
use crate::core::pipeline::{CancelFlag, PipelineRequest, PipelineResult};
use crate::core::textgrid::write_textgrid;
use crate::services::audio::load_wav;
use crate::Result;
use colored::*;
use log::info;
use tabled::{Table, Tabled};

/// Execute `hantone analyze`.
pub async fn execute(args: AnalyzeArgs, config_service: &dyn ConfigService) -> Result<()> {
    let mut config = config_service.get_config()?;
    if args.single_engine {
        config.stt.enable_multi_engine = false;
    }
    let factory = ComponentFactory::from_config(config);

    let audio = load_wav(&args.input)?;
    info!(
        "Loaded {}: {:.2}s at {} Hz",
        args.input.display(),
        audio.duration_seconds(),
        audio.sample_rate()
    );

    let pipeline = factory.create_pipeline()?;
    let request = PipelineRequest {
        audio,
        reference_text: args.text.clone(),
    };

    let spinner = factory
        .config()
        .general
        .enable_progress_bar
        .then(|| create_spinner("Analyzing"));
    let result = pipeline.run(&request, &CancelFlag::new()).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let result = result?;

    let textgrid_path = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_extension("TextGrid"));
    let duration = result
        .segments
        .last()
        .map(|s| s.end)
        .unwrap_or_default()
        .max(result.transcript.words.last().map(|w| w.end).unwrap_or(1.0));
    std::fs::write(&textgrid_path, write_textgrid(&result.segments, duration))?;
    print_success(&format!("TextGrid written to {}", textgrid_path.display()));

    if let Some(json_path) = &args.json {
        std::fs::write(json_path, serde_json::to_vec_pretty(&result)?)?;
        print_success(&format!("JSON result written to {}", json_path.display()));
    }

    print_report(&result, args.text.as_deref());
    Ok(())
}

#[derive(Tabled)]
struct EngineRow {
    #[tabled(rename = "Engine")]
    engine: String,
    #[tabled(rename = "Text")]
    text: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn print_report(result: &PipelineResult, reference: Option<&str>) {
    println!();
    println!("{}", "Recognition".bold());
    println!("  text:       {}", result.final_text);
    if let Some(reference) = reference {
        println!("  reference:  {reference}");
    }
    println!("  confidence: {:.3}", result.confidence);
    if let Some(accuracy) = result.achieved_accuracy {
        println!("  accuracy:   {accuracy:.3}");
    }

    if !result.engines.is_empty() {
        let rows: Vec<EngineRow> = result
            .engines
            .iter()
            .map(|e| EngineRow {
                engine: e.engine_id.clone(),
                text: e.text.clone(),
                score: format!("{:.3}", e.score),
                time: format!("{} ms", e.processing_time_ms),
                status: match &e.error {
                    None => "ok".to_string(),
                    Some(err) => err.kind().to_string(),
                },
            })
            .collect();
        println!("{}", Table::new(rows));
    }

    println!("{}", "Quality".bold());
    let q = &result.quality;
    println!(
        "  overall {:.3} | syllable {:.3} | phonetic {:.3} | duration {:.3} | korean {:.3}",
        q.overall, q.syllable_accuracy, q.phonetic_similarity, q.duration_alignment,
        q.korean_text_quality
    );

    println!("{}", "Segmentation".bold());
    for syllable in &result.segments {
        println!(
            "  {}  {:.3}s ~ {:.3}s  (conf {:.2})",
            syllable.text, syllable.start, syllable.end, syllable.confidence
        );
    }

    if let Some(stats) = &result.pitch.statistics {
        println!("{}", "Voice".bold());
        println!(
            "  F0 mean {:.1} Hz (range {:.1}-{:.1}) | jitter {:.2}% | shimmer {:.2}% | HNR {:.1} dB | {:?}",
            stats.mean,
            stats.min,
            stats.max,
            result.pitch.jitter_percent,
            result.pitch.shimmer_percent,
            result.pitch.hnr_db,
            result.pitch.gender
        );
    }

    println!(
        "  stages: {} | attempts: {} | {} ms",
        result.stages_executed.join(" → "),
        result.reprocess_attempts,
        result.total_duration_ms
    );
    for warning in &result.warnings {
        print_warning(&warning.to_string());
    }
}
