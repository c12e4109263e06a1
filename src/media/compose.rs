use std::path::{Path, PathBuf};

use tempfile::Builder;
use tokio::process::Command;
use tracing::{debug, info};

use crate::error::{ClipsmithError, Result};
use crate::media::geometry::{plan, FrameGeometry};
use crate::media::probe::{get_video_dimensions, get_video_duration};
use crate::segment::HighlightWindow;

/// Slack allowed when checking a window against the container duration;
/// ffprobe and word timestamps disagree at this scale routinely.
const DURATION_TOLERANCE: f64 = 0.1;

/// H.264/AAC encoder knobs for the final clip.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    pub preset: String,
    pub crf: u32,
    pub audio_bitrate: String,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            preset: "veryfast".to_string(),
            crf: 23,
            audio_bitrate: "192k".to_string(),
        }
    }
}

/// Round to the nearest even integer, as libx264 yuv420p requires,
/// never below 2.
fn even(value: f64) -> i64 {
    (((value / 2.0).round() as i64) * 2).max(2)
}

/// Build the single-pass filter graph that stacks the width-fit source
/// over a blurred cover-scaled copy of itself on the vertical canvas.
///
/// Video only; audio is mapped straight from the extracted sub-range so
/// the background layer can never contribute a second track.
pub fn build_filter_graph(geometry: &FrameGeometry) -> String {
    let crop_w = geometry.background_crop.width.round() as i64;
    let crop_h = geometry.background_crop.height.round() as i64;
    let bg_w = even(geometry.background.width).max(crop_w);
    let bg_h = even(geometry.background.height).max(crop_h);
    let fg_w = even(geometry.foreground.width);
    let fg_h = even(geometry.foreground.height);

    format!(
        "[0:v]split=2[bg][fg];\
         [bg]scale={bg_w}:{bg_h},crop={crop_w}:{crop_h},gblur=sigma={sigma}[bgb];\
         [fg]scale={fg_w}:{fg_h}[fgs];\
         [bgb][fgs]overlay=(W-w)/2:(H-h)/2[vout]",
        sigma = geometry.blur_sigma,
    )
}

fn validate_window(window: &HighlightWindow) -> Result<()> {
    if !window.start.is_finite() || !window.end.is_finite() || window.start < 0.0 {
        return Err(ClipsmithError::Composition(format!(
            "invalid time range [{}, {})",
            window.start, window.end
        )));
    }
    if window.end <= window.start {
        return Err(ClipsmithError::Composition(format!(
            "window end {} is not after start {}",
            window.end, window.start
        )));
    }
    Ok(())
}

async fn run_ffmpeg(cmd: &mut Command, context: &str) -> Result<()> {
    let output = cmd
        .output()
        .await
        .map_err(|e| ClipsmithError::Composition(format!("Failed to run FFmpeg: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join(" | ");
        return Err(ClipsmithError::Composition(format!("{context}: {tail}")));
    }

    Ok(())
}

/// Render one highlight window as a finished vertical clip at `output`.
///
/// Extracts `[start, end)` with its audio to a scoped temporary file,
/// plans geometry from the extract's native resolution, composites the
/// layers in a single ffmpeg pass and re-attaches the extract's audio.
/// The intermediate extract is removed on every exit path.
pub async fn composite(
    source: &Path,
    window: &HighlightWindow,
    output: &Path,
    encode: &EncodeSettings,
) -> Result<PathBuf> {
    validate_window(window)?;

    if !source.exists() {
        return Err(ClipsmithError::FileNotFound(source.display().to_string()));
    }

    // Probes run on the blocking pool so a slow container scan cannot
    // stall other windows rendering on this task.
    let probe_source = source.to_path_buf();
    let source_duration = tokio::task::spawn_blocking(move || get_video_duration(&probe_source))
        .await
        .map_err(|e| ClipsmithError::Composition(format!("Probe task failed: {e}")))??;
    if window.end > source_duration + DURATION_TOLERANCE {
        return Err(ClipsmithError::Composition(format!(
            "window [{:.2}, {:.2}) exceeds source duration {:.2}s",
            window.start, window.end, source_duration
        )));
    }

    info!(
        "Compositing [{:.2}, {:.2}) -> {}",
        window.start,
        window.end,
        output.display()
    );

    // NamedTempFile deletes the extract on drop, success or failure.
    let cut = Builder::new()
        .prefix("clipsmith-cut-")
        .suffix(".mp4")
        .tempfile()
        .map_err(|e| ClipsmithError::Composition(format!("Failed to create temp file: {e}")))?;

    let start = format!("{:.3}", window.start);
    let duration = format!("{:.3}", window.duration());

    debug!("Extracting sub-range: start={start}, duration={duration}");

    run_ffmpeg(
        Command::new("ffmpeg")
            .args(["-y", "-ss", &start, "-t", &duration, "-i"])
            .arg(source)
            .args([
                "-map", "0:v:0", "-map", "0:a:0", "-c:v", "libx264", "-preset", "veryfast",
                "-crf", "18", "-c:a", "aac",
            ])
            .arg(cut.path()),
        "sub-range extraction failed",
    )
    .await?;

    let probe_cut = cut.path().to_path_buf();
    let (width, height) = tokio::task::spawn_blocking(move || get_video_dimensions(&probe_cut))
        .await
        .map_err(|e| ClipsmithError::Composition(format!("Probe task failed: {e}")))??;
    let geometry = plan(width, height)?;
    let filter = build_filter_graph(&geometry);

    debug!("Filter graph: {filter}");

    run_ffmpeg(
        Command::new("ffmpeg")
            .args(["-y", "-i"])
            .arg(cut.path())
            .args(["-filter_complex", &filter, "-map", "[vout]", "-map", "0:a:0"])
            .args(["-c:v", "libx264", "-preset", &encode.preset])
            .args(["-crf", &encode.crf.to_string()])
            .args(["-pix_fmt", "yuv420p", "-c:a", "aac", "-b:a", &encode.audio_bitrate])
            .args(["-movflags", "+faststart"])
            .arg(output),
        "vertical composition failed",
    )
    .await?;

    if !output.exists() {
        return Err(ClipsmithError::Composition(
            "Output file was not created".to_string(),
        ));
    }

    info!("Wrote clip {}", output.display());
    Ok(output.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: f64, end: f64) -> HighlightWindow {
        HighlightWindow {
            start,
            end,
            text: String::new(),
        }
    }

    #[test]
    fn test_even_rounding() {
        assert_eq!(even(607.5), 608);
        assert_eq!(even(1080.0), 1080);
        assert_eq!(even(3413.333), 3414);
        assert_eq!(even(1.0), 2);
    }

    #[test]
    fn test_filter_graph_for_full_hd() {
        let geometry = plan(1920, 1080).unwrap();
        let filter = build_filter_graph(&geometry);
        assert!(filter.contains("split=2"));
        assert!(filter.contains("scale=3414:1920"));
        assert!(filter.contains("crop=1080:1920"));
        assert!(filter.contains("gblur=sigma=20"));
        assert!(filter.contains("scale=1080:608"));
        assert!(filter.contains("overlay=(W-w)/2:(H-h)/2"));
        // The graph must stay video-only.
        assert!(!filter.contains("amix"));
        assert!(!filter.contains("[0:a]"));
    }

    #[test]
    fn test_invalid_windows_rejected() {
        assert!(validate_window(&window(2.0, 17.0)).is_ok());
        assert!(validate_window(&window(17.0, 2.0)).is_err());
        assert!(validate_window(&window(5.0, 5.0)).is_err());
        assert!(validate_window(&window(-1.0, 10.0)).is_err());
        assert!(validate_window(&window(0.0, f64::NAN)).is_err());
    }

    #[tokio::test]
    async fn test_composite_rejects_corrupt_window_before_io() {
        // start > end fails validation before any ffmpeg invocation,
        // so this test runs without the binary installed.
        let result = composite(
            Path::new("/nonexistent/source.mp4"),
            &window(30.0, 10.0),
            Path::new("/tmp/never-written.mp4"),
            &EncodeSettings::default(),
        )
        .await;
        assert!(matches!(result, Err(ClipsmithError::Composition(_))));
    }

    #[test]
    fn test_encode_settings_default() {
        let encode = EncodeSettings::default();
        assert_eq!(encode.preset, "veryfast");
        assert_eq!(encode.crf, 23);
        assert_eq!(encode.audio_bitrate, "192k");
    }
}
