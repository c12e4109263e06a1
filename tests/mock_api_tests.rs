//! Mock API tests for the Whisper transcript source
//!
//! A wiremock server stands in for the OpenAI endpoint so parsing and
//! error paths are exercised without real credentials.

use clipsmith::transcript::{TranscriptSource, WhisperClient};
use std::path::{Path, PathBuf};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn write_fake_wav(dir: &Path) -> PathBuf {
    // The client only reads bytes for the multipart body; content is
    // never decoded locally.
    let audio = dir.join("audio.wav");
    std::fs::write(&audio, b"RIFF0000WAVEfmt ").unwrap();
    audio
}

mod whisper_tests {
    use super::*;

    #[tokio::test]
    async fn test_word_level_response_parsed() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{
                    "text": "hello world",
                    "language": "en",
                    "duration": 1.2,
                    "words": [
                        {"word": " hello", "start": 0.0, "end": 0.5},
                        {"word": " world", "start": 0.5, "end": 1.2}
                    ]
                }"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = write_fake_wav(dir.path());

        let client = WhisperClient::new("test-key".to_string())
            .with_api_url(format!("{}/v1/audio/transcriptions", server.uri()));

        let transcript = client.transcribe(&audio).await.unwrap();
        assert_eq!(transcript.words.len(), 2);
        assert_eq!(transcript.words[0].text, "hello");
        assert_eq!(transcript.words[1].start, Some(0.5));
        assert_eq!(transcript.language.as_deref(), Some("en"));
        assert!(transcript.has_usable_words());
    }

    #[tokio::test]
    async fn test_client_error_not_retried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/audio/transcriptions"))
            .respond_with(ResponseTemplate::new(401).set_body_raw(
                r#"{"error": {"message": "Invalid API key", "type": "invalid_request_error", "code": null}}"#,
                "application/json",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = write_fake_wav(dir.path());

        let client = WhisperClient::new("bad-key".to_string())
            .with_api_url(format!("{}/v1/audio/transcriptions", server.uri()));

        let result = client.transcribe(&audio).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid API key"));
    }

    #[tokio::test]
    async fn test_missing_audio_file_fails_before_request() {
        let client = WhisperClient::new("test-key".to_string());
        let result = client
            .transcribe(Path::new("/nonexistent/audio.wav"))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_client_name() {
        let client = WhisperClient::new("test-key".to_string());
        assert_eq!(client.name(), "OpenAI Whisper");
    }
}
