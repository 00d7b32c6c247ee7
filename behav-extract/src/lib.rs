//! Behav Extract Library
//!
//! This library exports recorded behavior epochs from synchronized videos:
//! padded clips for state intervals and still frames for events.

pub mod artifact;
pub mod border;
pub mod extractor;
pub mod progress_tracker;
pub mod source;
pub mod video_reader;
pub mod worker;

#[cfg(test)]
mod testing;

pub use artifact::{ArtifactSink, ClipWriter, FileSink};
pub use extractor::{
    select_all, CancellationToken, EpochExtractor, EpochSelection, EpochWarning, ExtractionReport,
    Selection,
};
pub use progress_tracker::{ChannelProgress, NoProgress, ProgressEvent, ProgressSink, ProgressTracker};
pub use source::{DecodedFrame, VideoSource};
pub use video_reader::VideoReader;
pub use worker::{spawn_extraction, ExtractionHandle, ExtractionJob};

/// Context added before and after a state interval when exporting a clip
pub const PADDING_MS: u64 = 1000;

/// Frame rate of exported clips
pub const OUTPUT_FPS: u32 = 10;

/// Result type for behav-extract operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for behav-extract operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Behav core error: {0}")]
    Core(#[from] behav_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(#[from] ffmpeg_next::Error),

    #[error("Could not open video source(s): {}", paths.join(", "))]
    SourceOpen { paths: Vec<String> },

    #[error("Video source {0} cannot be opened")]
    SourceNotOpen(usize),

    #[error("Invalid video file")]
    InvalidVideo,

    #[error("No video stream found")]
    NoVideoStream,

    #[error("Failed to read a frame from source {source_index} at {at_ms} ms")]
    FrameRead { source_index: usize, at_ms: u64 },

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("{reason} (incomplete clip left at {})", path.display())]
    IncompleteClip {
        path: std::path::PathBuf,
        reason: String,
    },

    #[error("Extraction worker failed: {0}")]
    Worker(String),
}

/// Extraction configuration
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Context added on both sides of a state interval, in milliseconds
    pub padding_ms: u64,
    /// Frame rate written into exported clips
    pub output_fps: u32,
    /// Border color for frames inside the behavior window
    pub highlight_color: [u8; 3],
    /// Border thickness in pixels
    pub border_thickness: u32,
    /// File extension of exported clips
    pub clip_extension: String,
    /// File extension of exported still frames
    pub still_extension: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            padding_ms: PADDING_MS,
            output_fps: OUTPUT_FPS,
            highlight_color: [255, 0, 0],
            border_thickness: 2,
            clip_extension: "avi".to_string(),
            still_extension: "jpg".to_string(),
        }
    }
}

impl ExtractorConfig {
    /// Set the context padding
    #[must_use]
    pub fn with_padding_ms(mut self, padding_ms: u64) -> Self {
        self.padding_ms = padding_ms;
        self
    }

    /// Set the clip frame rate (at least 1)
    #[must_use]
    pub fn with_output_fps(mut self, fps: u32) -> Self {
        self.output_fps = fps.max(1);
        self
    }

    /// Set the border color
    #[must_use]
    pub fn with_highlight_color(mut self, color: [u8; 3]) -> Self {
        self.highlight_color = color;
        self
    }
}
