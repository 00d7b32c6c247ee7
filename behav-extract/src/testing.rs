//! Synthetic sources and in-memory sinks for pipeline tests

use std::cell::RefCell;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{Rgb, RgbImage};

use crate::{ArtifactSink, ClipWriter, DecodedFrame, Error, Result, VideoSource};

pub(crate) const FRAME_SIZE: u32 = 8;

/// Constant-rate source whose frames carry their own frame number.
///
/// Frame `n` is filled with `[n & 0xff, n >> 8, 0]`, so the timestamp of any
/// written frame can be recovered with [`frame_timestamp`].
pub(crate) struct MockSource {
    fps: f64,
    length_ms: f64,
    reported_duration: Option<f64>,
    open: bool,
    unreadable: Option<RangeInclusive<u64>>,
    failing_reads: Option<RangeInclusive<u64>>,
    next_index: u64,
}

impl MockSource {
    pub(crate) fn new(fps: f64, length_ms: f64) -> Self {
        Self {
            fps,
            length_ms,
            reported_duration: None,
            open: true,
            unreadable: None,
            failing_reads: None,
            next_index: 0,
        }
    }

    /// Reports a duration, which need not match the real length
    pub(crate) fn with_duration(mut self, duration_ms: f64) -> Self {
        self.reported_duration = Some(duration_ms);
        self
    }

    /// Makes every seek into `range` fail
    pub(crate) fn with_unreadable(mut self, range: RangeInclusive<u64>) -> Self {
        self.unreadable = Some(range);
        self
    }

    /// Makes decoding fail for every frame whose timestamp falls in `range`
    pub(crate) fn with_failing_reads(mut self, range: RangeInclusive<u64>) -> Self {
        self.failing_reads = Some(range);
        self
    }

    pub(crate) fn closed(mut self) -> Self {
        self.open = false;
        self
    }
}

impl VideoSource for MockSource {
    fn is_open(&self) -> bool {
        self.open
    }

    fn duration_ms(&self) -> Option<f64> {
        self.reported_duration
    }

    fn seek(&mut self, ms: u64) -> Result<()> {
        if self.unreadable.as_ref().is_some_and(|r| r.contains(&ms)) {
            return Err(Error::InvalidVideo);
        }
        self.next_index = (ms as f64 * self.fps / 1000.0).ceil() as u64;
        Ok(())
    }

    fn read_next_frame(&mut self) -> Result<Option<DecodedFrame>> {
        let timestamp_ms = self.next_index as f64 * 1000.0 / self.fps;
        if timestamp_ms >= self.length_ms {
            return Ok(None);
        }
        if self
            .failing_reads
            .as_ref()
            .is_some_and(|r| r.contains(&(timestamp_ms as u64)))
        {
            return Err(Error::FrameRead {
                source_index: 0,
                at_ms: timestamp_ms as u64,
            });
        }

        let n = self.next_index;
        self.next_index += 1;
        let image = RgbImage::from_pixel(
            FRAME_SIZE,
            FRAME_SIZE,
            Rgb([(n & 0xff) as u8, (n >> 8) as u8, 0]),
        );
        Ok(Some(DecodedFrame {
            image,
            timestamp_ms,
        }))
    }

    fn width(&self) -> u32 {
        FRAME_SIZE
    }

    fn height(&self) -> u32 {
        FRAME_SIZE
    }
}

/// Recovers the timestamp a [`MockSource`] frame was decoded at
pub(crate) fn frame_timestamp(frame: &RgbImage, fps: f64) -> f64 {
    let center = frame[(FRAME_SIZE / 2, FRAME_SIZE / 2)];
    let n = u64::from(center[0]) | (u64::from(center[1]) << 8);
    n as f64 * 1000.0 / fps
}

#[derive(Debug, Clone)]
pub(crate) struct MemoryClip {
    pub(crate) path: PathBuf,
    pub(crate) fps: u32,
    pub(crate) frames: Vec<RgbImage>,
    pub(crate) finished: bool,
}

/// Keeps every artifact in memory; clones share the same storage
#[derive(Debug, Clone, Default)]
pub(crate) struct MemorySink {
    pub(crate) clips: Rc<RefCell<Vec<MemoryClip>>>,
    pub(crate) stills: Rc<RefCell<Vec<(PathBuf, RgbImage)>>>,
    /// Makes `discard` fail and keeps the incomplete clip
    pub(crate) refuse_discard: bool,
}

struct MemoryClipWriter {
    clips: Rc<RefCell<Vec<MemoryClip>>>,
    index: usize,
}

impl ClipWriter for MemoryClipWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        self.clips.borrow_mut()[self.index].frames.push(frame.clone());
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        self.clips.borrow_mut()[self.index].finished = true;
        Ok(())
    }
}

impl ArtifactSink for MemorySink {
    fn open_clip(
        &mut self,
        path: &Path,
        _width: u32,
        _height: u32,
        fps: u32,
    ) -> Result<Box<dyn ClipWriter>> {
        let mut clips = self.clips.borrow_mut();
        clips.push(MemoryClip {
            path: path.to_path_buf(),
            fps,
            frames: Vec::new(),
            finished: false,
        });
        Ok(Box::new(MemoryClipWriter {
            clips: Rc::clone(&self.clips),
            index: clips.len() - 1,
        }))
    }

    fn write_still(&mut self, path: &Path, frame: &RgbImage) -> Result<()> {
        self.stills
            .borrow_mut()
            .push((path.to_path_buf(), frame.clone()));
        Ok(())
    }

    fn discard(&mut self, path: &Path) -> Result<()> {
        if self.refuse_discard {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only output",
            )));
        }
        self.clips.borrow_mut().retain(|clip| clip.path != path);
        Ok(())
    }
}
