pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod segment;
pub mod transcript;

pub use config::Config;
pub use error::{ClipsmithError, Result};
pub use pipeline::{
    print_summary, run, ClipAsset, PipelineConfig, PipelineResult, RunOutcome, WorkDir,
};
pub use segment::{HighlightWindow, SegmentConfig};
