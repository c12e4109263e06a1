use crate::error::{ClipsmithError, Result};
use crate::media::{check_ffmpeg, check_ffprobe, composite, extract_audio, probe_video, EncodeSettings};
use crate::segment::{segment, HighlightWindow, SegmentConfig};
use crate::transcript::TranscriptSource;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Configuration for one clip generation run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Highlight segmentation thresholds.
    pub segmenting: SegmentConfig,
    /// Encoder settings for the final clips.
    pub encode: EncodeSettings,
    /// Number of windows composited at once. 1 is the sequential
    /// reference behavior; higher values use a bounded worker set.
    pub concurrency: usize,
    /// Show progress bars.
    pub show_progress: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            segmenting: SegmentConfig::default(),
            encode: EncodeSettings::default(),
            concurrency: 1,
            show_progress: true,
        }
    }
}

/// How a run ended. All three are successful terminations; processing
/// errors surface as `Err` instead of being folded into an empty list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Source has no audio track, or transcription found no usable words.
    NoSpeech,
    /// Speech was found but no accumulation reached the minimum duration.
    NoHighlights,
    /// Windows were composited; `failed` counts per-window render failures.
    Completed {
        requested: usize,
        rendered: usize,
        failed: usize,
    },
}

/// One finished vertical clip plus the transcript text it covers.
#[derive(Debug, Clone)]
pub struct ClipAsset {
    pub path: PathBuf,
    pub transcript_text: String,
    pub window: HighlightWindow,
}

/// Timings and counts from one run.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub total_time: Duration,
    pub extraction_time: Duration,
    pub transcription_time: Duration,
    pub composition_time: Duration,
    pub source_duration: f64,
    pub words: usize,
    pub windows_found: usize,
    pub clips_rendered: usize,
    pub clips_failed: usize,
}

impl PipelineStats {
    fn empty(total_time: Duration, source_duration: f64) -> Self {
        Self {
            total_time,
            extraction_time: Duration::ZERO,
            transcription_time: Duration::ZERO,
            composition_time: Duration::ZERO,
            source_duration,
            words: 0,
            windows_found: 0,
            clips_rendered: 0,
            clips_failed: 0,
        }
    }
}

/// Result of one clip generation run.
#[derive(Debug)]
pub struct PipelineResult {
    pub outcome: RunOutcome,
    /// Successfully rendered clips in time order.
    pub clips: Vec<ClipAsset>,
    pub stats: PipelineStats,
}

/// The clip output directory, exclusively owned by one run.
///
/// Reset wipes anything a previous run left behind before the new run
/// writes into it; clip names are deterministic ordinals.
#[derive(Debug)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Wipe and recreate the directory at `root`.
    pub fn reset(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if root.exists() {
            debug!("Clearing previous run output in {}", root.display());
            fs::remove_dir_all(&root)?;
        }
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Collision-free output path for the window at `index` (0-based).
    pub fn clip_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("clip_{:03}.mp4", index + 1))
    }
}

/// Generate vertical highlight clips from a source video.
///
/// Resets the working directory, obtains a word-level transcript for the
/// source's audio, segments it into highlight windows and composites each
/// window into a 1080x1920 clip. Individual window failures are logged
/// and skipped; the remaining windows still render.
pub async fn run(
    input: &Path,
    work_dir: &Path,
    source: &dyn TranscriptSource,
    config: &PipelineConfig,
) -> Result<PipelineResult> {
    let cancelled = Arc::new(AtomicBool::new(false));
    run_with_cancel(input, work_dir, source, config, cancelled).await
}

/// Generate clips with cancellation support. The flag is checked between
/// stages and before each window's composition starts; a render already
/// in flight runs to completion.
pub async fn run_with_cancel(
    input: &Path,
    work_dir: &Path,
    source: &dyn TranscriptSource,
    config: &PipelineConfig,
    cancelled: Arc<AtomicBool>,
) -> Result<PipelineResult> {
    let start_time = Instant::now();

    config.segmenting.validate()?;
    if config.concurrency == 0 {
        return Err(ClipsmithError::Config(
            "concurrency must be at least 1".to_string(),
        ));
    }

    if !input.exists() {
        return Err(ClipsmithError::FileNotFound(input.display().to_string()));
    }

    check_ffmpeg().map_err(|_| {
        ClipsmithError::FfmpegUnavailable(
            "FFmpeg not found. Install it with: brew install ffmpeg (macOS) or apt install ffmpeg (Linux)".to_string(),
        )
    })?;
    check_ffprobe()?;

    let work = WorkDir::reset(work_dir)?;
    debug!("Clip output directory: {}", work.path().display());

    // ═══════════════════════════════════════════════════════════════════
    // Stage 1: Probe
    // ═══════════════════════════════════════════════════════════════════
    info!("Stage 1/4: Probing {}", input.display());
    let metadata = probe_video(input)?;

    if !metadata.has_audio {
        info!("Source has no audio track, nothing to transcribe");
        return Ok(PipelineResult {
            outcome: RunOutcome::NoSpeech,
            clips: Vec::new(),
            stats: PipelineStats::empty(start_time.elapsed(), metadata.duration),
        });
    }

    if cancelled.load(Ordering::Relaxed) {
        return Err(ClipsmithError::Cancelled);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Stage 2: Audio extraction + transcription
    // ═══════════════════════════════════════════════════════════════════
    info!("Stage 2/4: Transcribing with {}", source.name());

    let temp_dir = TempDir::new().map_err(|e| {
        ClipsmithError::Io(std::io::Error::other(format!(
            "Failed to create temp directory: {e}"
        )))
    })?;

    let spinner = progress_spinner(config.show_progress, "Extracting audio...");

    let extraction_start = Instant::now();
    let audio_path = temp_dir.path().join("audio.wav");
    extract_audio(input, &audio_path).await?;
    let extraction_time = extraction_start.elapsed();

    if let Some(pb) = &spinner {
        pb.set_message("Transcribing...");
    }

    let transcription_start = Instant::now();
    let transcript = source.transcribe(&audio_path).await?;
    let transcription_time = transcription_start.elapsed();

    if let Some(pb) = spinner {
        pb.finish_with_message(format!("✓ Transcribed {} words", transcript.words.len()));
    }

    info!(
        "Transcription complete: {} words in {:.2}s",
        transcript.words.len(),
        transcription_time.as_secs_f64()
    );

    if !transcript.has_usable_words() {
        info!("Transcript carries no usable timestamps, no clips produced");
        let mut stats = PipelineStats::empty(start_time.elapsed(), metadata.duration);
        stats.extraction_time = extraction_time;
        stats.transcription_time = transcription_time;
        stats.words = transcript.words.len();
        return Ok(PipelineResult {
            outcome: RunOutcome::NoSpeech,
            clips: Vec::new(),
            stats,
        });
    }

    if cancelled.load(Ordering::Relaxed) {
        return Err(ClipsmithError::Cancelled);
    }

    // ═══════════════════════════════════════════════════════════════════
    // Stage 3: Highlight segmentation
    // ═══════════════════════════════════════════════════════════════════
    info!("Stage 3/4: Segmenting highlights");
    let windows = segment(&transcript.words, &config.segmenting)?;

    if windows.is_empty() {
        info!("No accumulation reached the minimum duration, no clips produced");
        let mut stats = PipelineStats::empty(start_time.elapsed(), metadata.duration);
        stats.extraction_time = extraction_time;
        stats.transcription_time = transcription_time;
        stats.words = transcript.words.len();
        return Ok(PipelineResult {
            outcome: RunOutcome::NoHighlights,
            clips: Vec::new(),
            stats,
        });
    }

    info!("Found {} highlight windows", windows.len());

    // ═══════════════════════════════════════════════════════════════════
    // Stage 4: Composition
    // ═══════════════════════════════════════════════════════════════════
    info!(
        "Stage 4/4: Compositing {} clips (concurrency: {})",
        windows.len(),
        config.concurrency
    );
    let composition_start = Instant::now();

    let progress_bar = if config.show_progress {
        let pb = ProgressBar::new(windows.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} clips ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let semaphore = Arc::new(Semaphore::new(config.concurrency));
    let mut futures = FuturesUnordered::new();

    for (index, window) in windows.iter().cloned().enumerate() {
        let sem = semaphore.clone();
        let cancel = cancelled.clone();
        let pb = progress_bar.clone();
        let source_path = input.to_path_buf();
        let output_path = work.clip_path(index);
        let encode = config.encode.clone();

        futures.push(async move {
            let _permit = sem.acquire().await.expect("Semaphore closed");

            if cancel.load(Ordering::Relaxed) {
                return (index, window, Err(ClipsmithError::Cancelled));
            }

            debug!("Compositing window {} [{:.2}, {:.2})", index, window.start, window.end);
            let result = composite(&source_path, &window, &output_path, &encode).await;

            if let Some(pb) = pb {
                pb.inc(1);
            }

            (index, window, result)
        });
    }

    let mut completed: Vec<(usize, HighlightWindow, Result<PathBuf>)> = Vec::new();
    while let Some(done) = futures.next().await {
        completed.push(done);
    }
    completed.sort_by_key(|(index, _, _)| *index);

    if let Some(pb) = progress_bar {
        pb.finish_and_clear();
    }

    if cancelled.load(Ordering::Relaxed) {
        return Err(ClipsmithError::Cancelled);
    }

    let composition_time = composition_start.elapsed();

    let requested = completed.len();
    let mut clips = Vec::new();
    let mut failed = 0usize;

    for (index, window, result) in completed {
        match result {
            Ok(path) => {
                clips.push(ClipAsset {
                    path,
                    transcript_text: window.text.clone(),
                    window,
                });
            }
            Err(e) => {
                warn!("Window {} [{:.2}, {:.2}) failed: {}", index, window.start, window.end, e);
                failed += 1;
            }
        }
    }

    info!(
        "Composition complete: {}/{} clips in {:.2}s",
        clips.len(),
        requested,
        composition_time.as_secs_f64()
    );

    let stats = PipelineStats {
        total_time: start_time.elapsed(),
        extraction_time,
        transcription_time,
        composition_time,
        source_duration: metadata.duration,
        words: transcript.words.len(),
        windows_found: requested,
        clips_rendered: clips.len(),
        clips_failed: failed,
    };

    Ok(PipelineResult {
        outcome: RunOutcome::Completed {
            requested,
            rendered: clips.len(),
            failed,
        },
        clips,
        stats,
    })
}

fn progress_spinner(show: bool, message: &str) -> Option<ProgressBar> {
    if !show {
        return None;
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

/// Print a summary of the run results.
pub fn print_summary(result: &PipelineResult) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                    Clip Generation Complete                    ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    match &result.outcome {
        RunOutcome::NoSpeech => {
            println!("  No speech detected; no clips produced.");
        }
        RunOutcome::NoHighlights => {
            println!("  No highlight reached the minimum duration; no clips produced.");
        }
        RunOutcome::Completed {
            requested,
            rendered,
            failed,
        } => {
            println!("  Clips:      {rendered}/{requested} rendered ({failed} failed)");
            for clip in &result.clips {
                println!(
                    "    {}  [{:.1}s - {:.1}s]",
                    clip.path.display(),
                    clip.window.start,
                    clip.window.end
                );
            }
        }
    }
    println!();
    println!("  Timing:");
    println!(
        "    Extract:     {:.2}s",
        result.stats.extraction_time.as_secs_f64()
    );
    println!(
        "    Transcribe:  {:.2}s ({} words)",
        result.stats.transcription_time.as_secs_f64(),
        result.stats.words
    );
    println!(
        "    Composite:   {:.2}s",
        result.stats.composition_time.as_secs_f64()
    );
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}
