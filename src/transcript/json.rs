use crate::error::{ClipsmithError, Result};
use crate::transcript::{Transcript, TranscriptSource, Word};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Offline transcript source backed by a Whisper-style verbose JSON file.
///
/// Accepts word timestamps either at the top level (`words`) or nested
/// per segment (`segments[].words`), the two shapes Whisper tooling
/// commonly writes.
pub struct JsonTranscriptSource {
    path: PathBuf,
}

impl JsonTranscriptSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn parse(&self, raw: &str) -> Result<Transcript> {
        let parsed: RawTranscript = serde_json::from_str(raw)?;

        let words: Vec<Word> = if let Some(words) = parsed.words {
            words.into_iter().map(Word::from).collect()
        } else if let Some(segments) = parsed.segments {
            segments
                .into_iter()
                .flat_map(|s| s.words.unwrap_or_default())
                .map(Word::from)
                .collect()
        } else {
            return Err(ClipsmithError::InvalidTranscript(format!(
                "{} has neither 'words' nor 'segments[].words'",
                self.path.display()
            )));
        };

        Ok(Transcript {
            words,
            language: parsed.language,
        })
    }
}

#[async_trait]
impl TranscriptSource for JsonTranscriptSource {
    /// The audio path is ignored; the words were produced ahead of time.
    async fn transcribe(&self, _audio: &Path) -> Result<Transcript> {
        if !self.path.exists() {
            return Err(ClipsmithError::FileNotFound(self.path.display().to_string()));
        }

        info!("Loading transcript from {}", self.path.display());
        let raw = fs::read_to_string(&self.path).await?;
        let transcript = self.parse(&raw)?;
        debug!("Loaded {} words", transcript.words.len());
        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "JSON file"
    }
}

#[derive(Debug, Deserialize)]
struct RawTranscript {
    #[serde(default)]
    words: Option<Vec<RawWord>>,
    #[serde(default)]
    segments: Option<Vec<RawSegment>>,
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSegment {
    #[serde(default)]
    words: Option<Vec<RawWord>>,
}

#[derive(Debug, Deserialize)]
struct RawWord {
    #[serde(alias = "text")]
    word: String,
    #[serde(default)]
    start: Option<f64>,
    #[serde(default)]
    end: Option<f64>,
}

impl From<RawWord> for Word {
    fn from(raw: RawWord) -> Self {
        Word {
            text: raw.word.trim().to_string(),
            start: raw.start,
            end: raw.end,
        }
    }
}
