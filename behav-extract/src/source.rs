//! Video source capability used by the extractor

use crate::Result;
use image::RgbImage;

/// A decoded frame with its presentation time
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub image: RgbImage,
    /// Presentation time in milliseconds from the start of the stream
    pub timestamp_ms: f64,
}

/// A seekable, sequentially decodable video.
///
/// Sources passed to one extractor share the same wall-clock timeline.
/// Seeking is stateful, so a source must not be shared between concurrent
/// extractions.
pub trait VideoSource {
    /// Returns false if the underlying stream is unusable
    fn is_open(&self) -> bool;

    /// Total duration, or `None` if the metadata does not allow computing it
    fn duration_ms(&self) -> Option<f64>;

    /// Positions the stream so the next frame read is at or after `ms`
    fn seek(&mut self, ms: u64) -> Result<()>;

    /// Decodes the next frame, or `None` at end of stream
    fn read_next_frame(&mut self) -> Result<Option<DecodedFrame>>;

    fn width(&self) -> u32;

    fn height(&self) -> u32;
}
