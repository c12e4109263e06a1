use crate::error::{ClipsmithError, Result};
use crate::transcript::{Transcript, TranscriptSource, Word};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::{debug, warn};

/// OpenAI Whisper API endpoint.
const WHISPER_API_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Maximum file size for Whisper API (25 MB).
const MAX_FILE_SIZE: usize = 25 * 1024 * 1024;

/// Maximum retries for API calls.
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const BASE_DELAY_MS: u64 = 1000;

/// OpenAI Whisper API client requesting word-level timestamps.
pub struct WhisperClient {
    client: reqwest::Client,
    api_key: String,
    api_url: String,
    language: Option<String>,
}

impl WhisperClient {
    /// Create a new Whisper client with the given API key.
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            api_url: WHISPER_API_URL.to_string(),
            language: None,
        }
    }

    /// Set the source language (ISO 639-1 code).
    pub fn with_language(mut self, language: String) -> Self {
        self.language = Some(language);
        self
    }

    /// Override the API endpoint (tests point this at a mock server).
    pub fn with_api_url(mut self, url: String) -> Self {
        self.api_url = url;
        self
    }

    /// Build the multipart form for the API request.
    async fn build_form(&self, audio_path: &Path) -> Result<Form> {
        let file_bytes = fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let mime_type = match audio_path.extension().and_then(|e| e.to_str()) {
            Some("wav") => "audio/wav",
            Some("mp3") => "audio/mpeg",
            Some("m4a") => "audio/mp4",
            Some("flac") => "audio/flac",
            Some("ogg") => "audio/ogg",
            Some("webm") => "audio/webm",
            _ => "application/octet-stream",
        };

        let file_part = Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("model", "whisper-1")
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word");

        if let Some(ref lang) = self.language {
            form = form.text("language", lang.clone());
        }

        Ok(form)
    }

    /// Make the API request (form is consumed, so no retries at this level).
    async fn call_api(&self, form: Form) -> Result<WhisperResponse> {
        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        debug!("Whisper API response status: {}", status);

        if status.is_success() {
            let body = response.text().await?;
            let parsed: WhisperResponse = serde_json::from_str(&body)?;
            return Ok(parsed);
        }

        let error_body = response.text().await.unwrap_or_default();

        if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
            return Err(ClipsmithError::Api(format!(
                "Whisper API error ({status}): {} ({})",
                api_error.error.message, api_error.error.r#type
            )));
        }

        Err(ClipsmithError::Api(format!(
            "Whisper API error ({status}): {error_body}"
        )))
    }

    /// Transcribe with retry logic - rebuilds form on each attempt.
    async fn transcribe_with_retry(&self, audio_path: &Path) -> Result<WhisperResponse> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = BASE_DELAY_MS * 2u64.pow(attempt - 1);
                debug!("Retry attempt {} after {}ms delay", attempt, delay);
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }

            let form = self.build_form(audio_path).await?;

            match self.call_api(form).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    // Don't retry on client errors
                    let error_str = e.to_string();
                    if error_str.contains("API error (4") {
                        return Err(e);
                    }
                    warn!("Attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ClipsmithError::Api("Unknown error".to_string())))
    }

    /// Convert a Whisper API response to our word-level transcript.
    ///
    /// Falls back to one coarse word per segment when the API returns no
    /// word timestamps; the segmenter handles either granularity.
    fn parse_response(&self, response: WhisperResponse) -> Transcript {
        let words: Vec<Word> = if let Some(api_words) = response.words {
            api_words
                .into_iter()
                .map(|w| Word {
                    text: w.word.trim().to_string(),
                    start: w.start,
                    end: w.end,
                })
                .collect()
        } else if let Some(segments) = response.segments {
            segments
                .into_iter()
                .map(|s| Word {
                    text: s.text.trim().to_string(),
                    start: Some(s.start),
                    end: Some(s.end),
                })
                .collect()
        } else {
            Vec::new()
        };

        Transcript {
            words,
            language: Some(response.language),
        }
    }
}

#[async_trait]
impl TranscriptSource for WhisperClient {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        debug!("Transcribing {:?} with Whisper", audio);

        // Check file size
        let metadata = fs::metadata(audio).await?;
        if metadata.len() as usize > MAX_FILE_SIZE {
            return Err(ClipsmithError::Transcription(format!(
                "File too large for Whisper API: {} bytes (max {} bytes)",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        let response = self.transcribe_with_retry(audio).await?;
        let transcript = self.parse_response(response);

        debug!("Whisper returned {} words", transcript.words.len());

        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "OpenAI Whisper"
    }
}

// API response types

#[derive(Debug, Deserialize)]
struct WhisperResponse {
    #[allow(dead_code)]
    text: String,
    #[serde(default)]
    words: Option<Vec<WhisperWord>>,
    #[serde(default)]
    segments: Option<Vec<WhisperSegment>>,
    language: String,
}

#[derive(Debug, Deserialize)]
struct WhisperWord {
    word: String,
    #[serde(default)]
    start: Option<f64>,
    #[serde(default)]
    end: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct WhisperSegment {
    start: f64,
    end: f64,
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    r#type: String,
    #[allow(dead_code)]
    code: Option<String>,
}
