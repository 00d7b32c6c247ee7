//! Seekable video reading using FFmpeg

use crate::{DecodedFrame, Error, Result, VideoSource};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use std::sync::OnceLock;

static FFMPEG_INIT: OnceLock<std::result::Result<(), ffmpeg::Error>> = OnceLock::new();

/// Initialize FFmpeg once per process
pub(crate) fn init_ffmpeg() -> Result<()> {
    FFMPEG_INIT.get_or_init(ffmpeg::init).clone().map_err(Error::from)
}

/// Video reader that decodes frames one at a time from any position
pub struct VideoReader {
    path: String,
    input: ffmpeg::format::context::Input,
    video_stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: Option<ffmpeg::software::scaling::Context>,
    time_base: f64,
    start_pts: i64,
    /// Frames before this time are dropped after a seek
    skip_before_ms: f64,
    last_timestamp_ms: Option<f64>,
    eof: bool,
}

impl VideoReader {
    /// Opens a video file
    pub fn open(path: &str) -> Result<Self> {
        init_ffmpeg()?;

        let input = ffmpeg::format::input(&path)?;

        // Find the video stream
        let video_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or(Error::NoVideoStream)?;

        let video_stream_index = video_stream.index();
        let time_base = f64::from(video_stream.time_base());
        // AV_NOPTS_VALUE is i64::MIN
        let start_pts = video_stream.start_time().max(0);

        // Create decoder
        let context = ffmpeg::codec::context::Context::from_parameters(video_stream.parameters())?;
        let decoder = context.decoder().video()?;

        Ok(Self {
            path: path.to_string(),
            input,
            video_stream_index,
            decoder,
            scaler: None,
            time_base,
            start_pts,
            skip_before_ms: 0.0,
            last_timestamp_ms: None,
            eof: false,
        })
    }

    /// Path this reader was opened from
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Average frame rate, if the container reports one
    pub fn frame_rate(&self) -> Option<f64> {
        let rate = self.input.stream(self.video_stream_index)?.avg_frame_rate();
        if rate.numerator() > 0 && rate.denominator() > 0 {
            Some(f64::from(rate))
        } else {
            None
        }
    }

    /// Number of frames declared by the container, if known
    pub fn frame_count(&self) -> Option<u64> {
        let frames = self.input.stream(self.video_stream_index)?.frames();
        u64::try_from(frames).ok().filter(|&n| n > 0)
    }

    /// Reads the next packet belonging to the video stream
    fn next_packet(&mut self) -> Option<ffmpeg::Packet> {
        let index = self.video_stream_index;
        self.input
            .packets()
            .find_map(|(stream, packet)| (stream.index() == index).then_some(packet))
    }

    fn timestamp_ms(&self, frame: &ffmpeg::frame::Video) -> f64 {
        match frame.timestamp().or_else(|| frame.pts()) {
            Some(ts) => (ts - self.start_pts) as f64 * self.time_base * 1000.0,
            None => {
                let step = self.frame_rate().map_or(0.0, |fps| 1000.0 / fps);
                self.last_timestamp_ms.map_or(0.0, |last| last + step)
            }
        }
    }

    /// Converts a decoded frame to a packed RGB image
    fn to_rgb(&mut self, decoded: &ffmpeg::frame::Video) -> Result<RgbImage> {
        if self.scaler.is_none() {
            self.scaler = Some(ffmpeg::software::scaling::Context::get(
                decoded.format(),
                decoded.width(),
                decoded.height(),
                ffmpeg::format::Pixel::RGB24,
                decoded.width(),
                decoded.height(),
                ffmpeg::software::scaling::Flags::BILINEAR,
            )?);
        }
        let Some(scaler) = self.scaler.as_mut() else {
            return Err(Error::InvalidVideo);
        };

        let mut rgb_frame = ffmpeg::frame::Video::empty();
        scaler.run(decoded, &mut rgb_frame)?;

        // Rows may be padded, copy them without the stride padding
        let width = rgb_frame.width();
        let height = rgb_frame.height();
        let stride = rgb_frame.stride(0);
        let row_bytes = width as usize * 3;
        let src = rgb_frame.data(0);

        let mut data = Vec::with_capacity(row_bytes * height as usize);
        for y in 0..height as usize {
            let offset = y * stride;
            data.extend_from_slice(&src[offset..offset + row_bytes]);
        }

        RgbImage::from_raw(width, height, data).ok_or(Error::InvalidVideo)
    }
}

impl VideoSource for VideoReader {
    fn is_open(&self) -> bool {
        self.decoder.width() > 0 && self.decoder.height() > 0
    }

    fn duration_ms(&self) -> Option<f64> {
        let fps = self.frame_rate()?;
        let frames = self.frame_count()?;
        Some(frames as f64 / fps * 1000.0)
    }

    fn seek(&mut self, ms: u64) -> Result<()> {
        // Container-level seeks are expressed in AV_TIME_BASE (microseconds)
        let ts = i64::try_from(ms).unwrap_or(i64::MAX).saturating_mul(1000);
        self.input.seek(ts, ..ts)?;
        self.decoder.flush();

        self.skip_before_ms = ms as f64;
        self.last_timestamp_ms = None;
        self.eof = false;
        Ok(())
    }

    fn read_next_frame(&mut self) -> Result<Option<DecodedFrame>> {
        loop {
            let mut decoded = ffmpeg::frame::Video::empty();
            if self.decoder.receive_frame(&mut decoded).is_ok() {
                let timestamp_ms = self.timestamp_ms(&decoded);
                self.last_timestamp_ms = Some(timestamp_ms);
                if timestamp_ms < self.skip_before_ms {
                    continue;
                }

                let image = self.to_rgb(&decoded)?;
                return Ok(Some(DecodedFrame {
                    image,
                    timestamp_ms,
                }));
            }

            if self.eof {
                return Ok(None);
            }

            match self.next_packet() {
                Some(packet) => self.decoder.send_packet(&packet)?,
                None => {
                    // Flush decoder
                    self.decoder.send_eof()?;
                    self.eof = true;
                }
            }
        }
    }

    fn width(&self) -> u32 {
        self.decoder.width()
    }

    fn height(&self) -> u32 {
        self.decoder.height()
    }
}
