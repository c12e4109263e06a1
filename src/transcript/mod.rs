pub mod json;
pub mod whisper;

pub use json::JsonTranscriptSource;
pub use whisper::WhisperClient;

use crate::error::{ClipsmithError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A single transcribed word with its position in the source audio.
///
/// Timestamps are seconds from the start of the source. Either may be
/// missing; the segmenter decides what an incomplete word is good for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub text: String,
    pub start: Option<f64>,
    pub end: Option<f64>,
}

impl Word {
    pub fn new(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self {
            text: text.into(),
            start: Some(start),
            end: Some(end),
        }
    }
}

/// An ordered word-level transcript of one audio track.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub words: Vec<Word>,
    pub language: Option<String>,
}

impl Transcript {
    /// True when no word carries both timestamps, i.e. nothing the
    /// segmenter could anchor a window on.
    pub fn has_usable_words(&self) -> bool {
        self.words
            .iter()
            .any(|w| w.start.is_some() && w.end.is_some())
    }
}

/// Produces a word-level transcript for an audio file.
///
/// Transcription itself is an external concern; implementations wrap an
/// API or a precomputed file.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript>;
    fn name(&self) -> &'static str;
}

/// Reject malformed word records before segmentation.
///
/// Negative timestamps, a word ending before it starts, or `start` values
/// that go backwards are caller bugs and must not be silently coerced.
pub fn validate_words(words: &[Word]) -> Result<()> {
    let mut last_start: Option<f64> = None;

    for (i, word) in words.iter().enumerate() {
        if let Some(start) = word.start {
            if !start.is_finite() || start < 0.0 {
                return Err(ClipsmithError::InvalidTranscript(format!(
                    "word {i} ({:?}) has invalid start {start}",
                    word.text
                )));
            }
            if let Some(prev) = last_start {
                if start < prev {
                    return Err(ClipsmithError::InvalidTranscript(format!(
                        "word {i} ({:?}) starts at {start} before previous word at {prev}",
                        word.text
                    )));
                }
            }
            last_start = Some(start);
        }

        if let Some(end) = word.end {
            if !end.is_finite() || end < 0.0 {
                return Err(ClipsmithError::InvalidTranscript(format!(
                    "word {i} ({:?}) has invalid end {end}",
                    word.text
                )));
            }
            if let Some(start) = word.start {
                if end < start {
                    return Err(ClipsmithError::InvalidTranscript(format!(
                        "word {i} ({:?}) ends at {end} before its start {start}",
                        word.text
                    )));
                }
            }
        }
    }

    Ok(())
}
