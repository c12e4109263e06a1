use anyhow::{Context, Result};
use clap::Parser;
use clipsmith::config::Config;
use clipsmith::media::EncodeSettings;
use clipsmith::pipeline::{print_summary, run_with_cancel, PipelineConfig, RunOutcome};
use clipsmith::segment::SegmentConfig;
use clipsmith::transcript::{JsonTranscriptSource, TranscriptSource, WhisperClient};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "clipsmith")]
#[command(version, about = "Turn long-form video into vertical highlight clips")]
#[command(long_about = "Finds speech-dense highlights in a long-form video via a word-level \
transcript and renders each as a 1080x1920 clip with a blurred background and centered foreground.")]
struct Cli {
    /// Input video file
    input: PathBuf,

    /// Output directory for rendered clips (wiped at the start of each run)
    #[arg(short, long, default_value = "clips")]
    out_dir: PathBuf,

    /// Precomputed word-level transcript (Whisper verbose JSON); skips the API
    #[arg(short, long)]
    transcript: Option<PathBuf>,

    /// Minimum clip duration in seconds
    #[arg(long)]
    min_duration: Option<f64>,

    /// Duration in seconds at which a highlight window is closed
    #[arg(long)]
    max_duration: Option<f64>,

    /// Maximum number of clips per run
    #[arg(long)]
    max_clips: Option<usize>,

    /// Number of clips composited in parallel
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Source language code (e.g., en, ja, es)
    #[arg(short, long, default_value = "en")]
    language: String,

    /// Disable progress bars
    #[arg(long)]
    no_progress: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(min) = cli.min_duration {
        config.min_duration = min;
    }
    if let Some(max) = cli.max_duration {
        config.max_duration = max;
    }
    if let Some(cap) = cli.max_clips {
        config.max_clips = cap;
    }
    if let Some(jobs) = cli.jobs {
        config.concurrency = jobs;
    }

    config
        .validate(cli.transcript.is_none())
        .context("Configuration validation failed")?;

    let out_dir = config
        .output_dir
        .clone()
        .filter(|_| cli.out_dir == PathBuf::from("clips"))
        .unwrap_or(cli.out_dir);

    let source: Box<dyn TranscriptSource> = match &cli.transcript {
        Some(path) => Box::new(JsonTranscriptSource::new(path.clone())),
        None => {
            let api_key = config
                .openai_api_key
                .clone()
                .context("OPENAI_API_KEY not set")?;
            Box::new(WhisperClient::new(api_key).with_language(cli.language.clone()))
        }
    };

    info!("Input:      {}", cli.input.display());
    info!("Output dir: {}", out_dir.display());
    info!("Transcript: {}", source.name());
    info!(
        "Durations:  {:.0}s - {:.0}s, up to {} clips",
        config.min_duration, config.max_duration, config.max_clips
    );

    let pipeline_config = PipelineConfig {
        segmenting: SegmentConfig {
            min_duration: config.min_duration,
            max_duration: config.max_duration,
            max_windows: config.max_clips,
        },
        encode: EncodeSettings::default(),
        concurrency: config.concurrency,
        show_progress: !cli.no_progress,
    };

    let cancelled = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancelled.clone();
    ctrlc::set_handler(move || {
        warn!("Interrupt received, stopping after the current clip");
        cancel_flag.store(true, Ordering::Relaxed);
    })
    .context("Failed to install Ctrl+C handler")?;

    let result = run_with_cancel(
        &cli.input,
        &out_dir,
        source.as_ref(),
        &pipeline_config,
        cancelled,
    )
    .await
    .context("Clip generation failed")?;

    print_summary(&result);

    if let RunOutcome::Completed { failed, .. } = result.outcome {
        if failed > 0 {
            warn!("{failed} window(s) failed to render; see log above");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["clipsmith", "video.mp4"]);
        assert_eq!(cli.out_dir, PathBuf::from("clips"));
        assert_eq!(cli.language, "en");
        assert!(cli.transcript.is_none());
        assert!(!cli.verbose);
    }
}
