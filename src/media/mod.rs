pub mod compose;
pub mod geometry;
pub mod probe;

pub use compose::{build_filter_graph, composite, EncodeSettings};
pub use geometry::{plan, plan_for_canvas, FrameGeometry, ScaledSize, TARGET_HEIGHT, TARGET_WIDTH};
pub use probe::{
    check_ffmpeg, check_ffprobe, extract_audio, get_video_duration, probe_video, VideoMetadata,
};
