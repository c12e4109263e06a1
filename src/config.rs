use crate::error::{ClipsmithError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::segment::{DEFAULT_MAX_DURATION, DEFAULT_MAX_WINDOWS, DEFAULT_MIN_DURATION};

fn default_min_duration() -> f64 {
    DEFAULT_MIN_DURATION
}

fn default_max_duration() -> f64 {
    DEFAULT_MAX_DURATION
}

fn default_max_clips() -> usize {
    DEFAULT_MAX_WINDOWS
}

fn default_concurrency() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub openai_api_key: Option<String>,
    #[serde(default = "default_min_duration")]
    pub min_duration: f64,
    #[serde(default = "default_max_duration")]
    pub max_duration: f64,
    #[serde(default = "default_max_clips")]
    pub max_clips: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            min_duration: DEFAULT_MIN_DURATION,
            max_duration: DEFAULT_MAX_DURATION,
            max_clips: DEFAULT_MAX_WINDOWS,
            concurrency: 1,
            output_dir: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                if let Ok(file_config) = toml::from_str::<Config>(&contents) {
                    config = file_config;
                }
            }
        }

        // Override with environment variables
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.openai_api_key = Some(key);
        }
        if let Ok(min) = std::env::var("CLIPSMITH_MIN_DURATION") {
            if let Ok(v) = min.parse() {
                config.min_duration = v;
            }
        }
        if let Ok(max) = std::env::var("CLIPSMITH_MAX_DURATION") {
            if let Ok(v) = max.parse() {
                config.max_duration = v;
            }
        }
        if let Ok(cap) = std::env::var("CLIPSMITH_MAX_CLIPS") {
            if let Ok(v) = cap.parse() {
                config.max_clips = v;
            }
        }
        if let Ok(concurrency) = std::env::var("CLIPSMITH_CONCURRENCY") {
            if let Ok(v) = concurrency.parse() {
                config.concurrency = v;
            }
        }

        Ok(config)
    }

    /// Check the fields a run will actually use. `needs_api_key` is false
    /// when a precomputed transcript file supplies the words.
    pub fn validate(&self, needs_api_key: bool) -> Result<()> {
        if needs_api_key && self.openai_api_key.is_none() {
            return Err(ClipsmithError::Config(
                "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-... \
                 or pass --transcript with a precomputed word-level JSON"
                    .to_string(),
            ));
        }

        if self.min_duration <= 0.0 {
            return Err(ClipsmithError::Config(
                "min_duration must be positive".to_string(),
            ));
        }

        if self.max_duration < self.min_duration {
            return Err(ClipsmithError::Config(
                "max_duration must be >= min_duration".to_string(),
            ));
        }

        if self.max_clips == 0 {
            return Err(ClipsmithError::Config(
                "max_clips must be greater than 0".to_string(),
            ));
        }

        if self.concurrency == 0 {
            return Err(ClipsmithError::Config(
                "Concurrency must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("clipsmith").join("config.toml"))
    }
}
