use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClipsmithError {
    #[error("FFmpeg unavailable: {0}")]
    FfmpegUnavailable(String),

    #[error("Probe failed: {0}")]
    Probe(String),

    #[error("Audio extraction failed: {0}")]
    AudioExtraction(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Invalid transcript: {0}")]
    InvalidTranscript(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Clip composition failed: {0}")]
    Composition(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClipsmithError>;
