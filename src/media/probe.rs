use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{ClipsmithError, Result};

/// Stream-level facts about a source video.
#[derive(Debug, Clone)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    /// Container duration in seconds.
    pub duration: f64,
    pub has_audio: bool,
}

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|e| {
        ClipsmithError::FfmpegUnavailable(format!(
            "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(ClipsmithError::FfmpegUnavailable(
            "FFmpeg check failed".to_string(),
        ));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe").arg("-version").output().map_err(|e| {
        ClipsmithError::FfmpegUnavailable(format!(
            "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
        ))
    })?;

    if !output.status.success() {
        return Err(ClipsmithError::FfmpegUnavailable(
            "FFprobe check failed".to_string(),
        ));
    }

    debug!("FFprobe is available");
    Ok(())
}

fn run_ffprobe(args: &[&str], input: &Path) -> Result<String> {
    let output = Command::new("ffprobe")
        .args(args)
        .arg(input)
        .output()
        .map_err(|e| ClipsmithError::Probe(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClipsmithError::Probe(format!("FFprobe failed: {stderr}")));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Get container duration in seconds using FFprobe.
pub fn get_video_duration(input: &Path) -> Result<f64> {
    let stdout = run_ffprobe(
        &[
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ],
        input,
    )?;

    stdout.parse().map_err(|e| {
        ClipsmithError::Probe(format!("Failed to parse duration '{stdout}': {e}"))
    })
}

/// Get resolution of the first video stream.
pub fn get_video_dimensions(input: &Path) -> Result<(u32, u32)> {
    let stdout = run_ffprobe(
        &[
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=s=x:p=0",
        ],
        input,
    )?;

    let mut parts = stdout.split('x');
    let width: u32 = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(|| ClipsmithError::Probe(format!("Failed to parse width from '{stdout}'")))?;
    let height: u32 = parts
        .next()
        .and_then(|p| p.trim().parse().ok())
        .ok_or_else(|| ClipsmithError::Probe(format!("Failed to parse height from '{stdout}'")))?;

    Ok((width, height))
}

/// True when the file carries at least one audio stream.
pub fn has_audio_stream(input: &Path) -> Result<bool> {
    let stdout = run_ffprobe(
        &[
            "-v",
            "error",
            "-select_streams",
            "a",
            "-show_entries",
            "stream=index",
            "-of",
            "csv=p=0",
        ],
        input,
    )?;

    Ok(!stdout.is_empty())
}

/// Probe resolution, duration and audio presence in one pass.
pub fn probe_video(input: &Path) -> Result<VideoMetadata> {
    if !input.exists() {
        return Err(ClipsmithError::FileNotFound(input.display().to_string()));
    }

    let (width, height) = get_video_dimensions(input)?;
    let duration = get_video_duration(input)?;
    let has_audio = has_audio_stream(input)?;

    debug!(
        "Probed {}: {}x{}, {:.2}s, audio={}",
        input.display(),
        width,
        height,
        duration,
        has_audio
    );

    Ok(VideoMetadata {
        width,
        height,
        duration,
        has_audio,
    })
}

/// Extract the audio track and convert to WAV format.
///
/// The output is mono 16-bit PCM at 16kHz, which is optimal for speech
/// recognition.
pub async fn extract_audio(input: &Path, output: &Path) -> Result<()> {
    check_ffmpeg()?;

    if !input.exists() {
        return Err(ClipsmithError::FileNotFound(input.display().to_string()));
    }

    info!("Extracting audio from {}", input.display());

    let status = Command::new("ffmpeg")
        .args(["-y", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "pcm_s16le", "-ar", "16000", "-ac", "1"])
        .arg(output)
        .status()
        .map_err(|e| ClipsmithError::AudioExtraction(format!("Failed to run FFmpeg: {e}")))?;

    if !status.success() {
        return Err(ClipsmithError::AudioExtraction(
            "FFmpeg audio extraction failed".to_string(),
        ));
    }

    if !output.exists() {
        return Err(ClipsmithError::AudioExtraction(
            "Output file was not created".to_string(),
        ));
    }

    info!("Audio extracted to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ffmpeg_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_check_ffmpeg() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available or broken");
            return;
        }
        assert!(check_ffmpeg().is_ok());
    }

    #[test]
    fn test_probe_missing_file() {
        let result = probe_video(Path::new("/nonexistent/video.mp4"));
        assert!(matches!(result, Err(ClipsmithError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_extract_audio_file_not_found() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let result =
            extract_audio(Path::new("/nonexistent/file.mp4"), Path::new("/tmp/out.wav")).await;
        match result {
            Err(ClipsmithError::FileNotFound(path)) => {
                assert!(path.contains("nonexistent"));
            }
            other => panic!("Expected FileNotFound error, got: {other:?}"),
        }
    }
}
