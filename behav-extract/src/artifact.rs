//! Output artifacts: encoded clips and still frames
//!
//! Clips are encoded with FFmpeg's MPEG-4 Part 2 encoder into whatever
//! container the file extension selects (AVI by default):
//!   1. RGB pixels → ffmpeg `frame::Video` (RGB24)
//!   2. swscale RGB24 → YUV420P
//!   3. MPEG-4 encoder → packets muxed into the output file
//!
//! Stills are written through the `image` crate.

use crate::video_reader::init_ffmpeg;
use crate::{Error, Result};
use ffmpeg_next as ffmpeg;
use image::RgbImage;
use std::fs;
use std::io;
use std::path::Path;

/// Sequential writer for one output clip
pub trait ClipWriter {
    /// Appends a frame; all frames must share the size the clip was opened with
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flushes pending data and finalizes the file
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Destination for extracted epochs
pub trait ArtifactSink {
    /// Creates a clip at `path`
    fn open_clip(
        &mut self,
        path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Box<dyn ClipWriter>>;

    /// Writes a single frame as an image at `path`
    fn write_still(&mut self, path: &Path, frame: &RgbImage) -> Result<()>;

    /// Removes a clip that could not be completed; a missing file is not an error
    fn discard(&mut self, path: &Path) -> Result<()>;
}

/// Writes clips with FFmpeg and stills with the `image` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSink;

impl ArtifactSink for FileSink {
    fn open_clip(
        &mut self,
        path: &Path,
        width: u32,
        height: u32,
        fps: u32,
    ) -> Result<Box<dyn ClipWriter>> {
        Ok(Box::new(FfmpegClipWriter::create(path, width, height, fps)?))
    }

    fn write_still(&mut self, path: &Path, frame: &RgbImage) -> Result<()> {
        frame.save(path)?;
        Ok(())
    }

    fn discard(&mut self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Clip writer backed by an FFmpeg muxer and MPEG-4 encoder
pub struct FfmpegClipWriter {
    output: ffmpeg::format::context::Output,
    encoder: ffmpeg::encoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    stream_index: usize,
    encoder_time_base: ffmpeg::Rational,
    stream_time_base: ffmpeg::Rational,
    width: u32,
    height: u32,
    frame_index: i64,
}

impl FfmpegClipWriter {
    /// Creates the output file and writes the container header
    pub fn create(path: &Path, width: u32, height: u32, fps: u32) -> Result<Self> {
        init_ffmpeg()?;

        if width == 0 || height == 0 {
            return Err(Error::Encode(format!(
                "Cannot encode a {width}×{height} clip"
            )));
        }

        let mut output = ffmpeg::format::output(&path)?;
        let global_header = output
            .format()
            .flags()
            .contains(ffmpeg::format::flag::Flags::GLOBAL_HEADER);

        let codec = ffmpeg::encoder::find(ffmpeg::codec::Id::MPEG4)
            .ok_or_else(|| Error::Encode("MPEG-4 encoder not available".into()))?;

        // YUV420P requires even dimensions; round up if needed.
        let enc_width = (width + 1) & !1;
        let enc_height = (height + 1) & !1;
        let fps = i32::try_from(fps.max(1)).unwrap_or(i32::MAX);
        let encoder_time_base = ffmpeg::Rational(1, fps);

        let mut stream = output.add_stream(codec)?;
        let stream_index = stream.index();

        let context = ffmpeg::codec::context::Context::from_parameters(
            ffmpeg::codec::Parameters::new(),
        )?;
        let mut video = context.encoder().video()?;

        video.set_width(enc_width);
        video.set_height(enc_height);
        video.set_format(ffmpeg::format::Pixel::YUV420P);
        video.set_time_base(encoder_time_base);
        video.set_frame_rate(Some(ffmpeg::Rational(fps, 1)));
        video.set_bit_rate(4_000_000);
        video.set_gop(fps as u32);
        video.set_max_b_frames(0);
        if global_header {
            video.set_flags(ffmpeg::codec::Flags::GLOBAL_HEADER);
        }

        let encoder = video.open_as(codec).map_err(|e| {
            Error::Encode(format!(
                "FFmpeg encoder open failed ({enc_width}×{enc_height} @ {fps} fps): {e}"
            ))
        })?;
        stream.set_parameters(&encoder);

        output.write_header()?;
        let stream_time_base = output
            .stream(stream_index)
            .map(|s| s.time_base())
            .ok_or_else(|| Error::Encode("Output stream disappeared".into()))?;

        // swscale: RGB24 → YUV420P
        let scaler = ffmpeg::software::scaling::Context::get(
            ffmpeg::format::Pixel::RGB24,
            width,
            height,
            ffmpeg::format::Pixel::YUV420P,
            enc_width,
            enc_height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )?;

        Ok(Self {
            output,
            encoder,
            scaler,
            stream_index,
            encoder_time_base,
            stream_time_base,
            width,
            height,
            frame_index: 0,
        })
    }

    /// Moves every packet the encoder has ready into the muxer
    fn drain(&mut self) -> Result<()> {
        let mut packet = ffmpeg::Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(self.stream_index);
            packet.rescale_ts(self.encoder_time_base, self.stream_time_base);
            packet.write_interleaved(&mut self.output)?;
        }
        Ok(())
    }
}

impl ClipWriter for FfmpegClipWriter {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(Error::Encode(format!(
                "Frame is {}×{}, clip expects {}×{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let mut rgb_frame =
            ffmpeg::frame::Video::new(ffmpeg::format::Pixel::RGB24, self.width, self.height);

        // Copy RGB pixels into the frame (respecting stride)
        {
            let stride = rgb_frame.stride(0);
            let dst = rgb_frame.data_mut(0);
            let src = frame.as_raw();
            let row_bytes = self.width as usize * 3;
            for y in 0..self.height as usize {
                let src_off = y * row_bytes;
                let dst_off = y * stride;
                dst[dst_off..dst_off + row_bytes]
                    .copy_from_slice(&src[src_off..src_off + row_bytes]);
            }
        }

        let mut yuv_frame = ffmpeg::frame::Video::empty();
        self.scaler.run(&rgb_frame, &mut yuv_frame)?;
        yuv_frame.set_pts(Some(self.frame_index));
        self.frame_index += 1;

        self.encoder.send_frame(&yuv_frame)?;
        self.drain()
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        self.encoder.send_eof()?;
        self.drain()?;
        self.output.write_trailer()?;
        Ok(())
    }
}
